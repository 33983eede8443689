//! Orchestrator behavior with scripted services.

use std::sync::Arc;
use std::time::Duration;

use adaptive_breaker::config::SimulationConfig;
use adaptive_breaker::controller::{ADAPTIVE_SOURCE, STATIC_SOURCE};
use adaptive_breaker::lifecycle::Shutdown;
use adaptive_breaker::observability::{EventKind, EventRecorder};
use adaptive_breaker::simulation::{CallOutcome, Simulation};

mod common;
use common::{events_from, routes, Script};

fn config(max_ticks: Option<u64>) -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.agent.seed = Some(42);
    config.simulation.max_ticks = max_ticks;
    config
}

#[tokio::test]
async fn test_failing_services_record_one_failure_per_controller() {
    let (routes, _, _) = routes(Script::AlwaysFail, Script::AlwaysFail);
    let recorder = Arc::new(EventRecorder::default());
    let sim = Simulation::from_config(&config(None), routes, None, recorder.clone());

    let report = sim.run_tick(1).await;
    assert!(matches!(report.static_outcome, CallOutcome::Failed(_)));
    assert!(matches!(report.adaptive_outcome, CallOutcome::Failed(_)));

    let is_failure = |k: &EventKind| matches!(k, EventKind::Failure { .. });
    assert_eq!(events_from(&recorder, STATIC_SOURCE, is_failure).len(), 1);
    assert_eq!(events_from(&recorder, ADAPTIVE_SOURCE, is_failure).len(), 1);
}

#[tokio::test]
async fn test_static_controller_only_uses_primary() {
    let (routes, primary, backup) = routes(Script::AlwaysSucceed, Script::AlwaysSucceed);
    let recorder = Arc::new(EventRecorder::default());
    let mut cfg = config(None);
    cfg.agent.exploration_rate = 0.0;
    let sim = Simulation::from_config(&cfg, routes, None, recorder.clone());

    for tick in 1..=10 {
        sim.run_tick(tick).await;
    }

    // Adaptive calls land on either path; static ones only on primary
    assert_eq!(primary.calls() + backup.calls(), 20);
    assert!(primary.calls() >= 10);
    assert_eq!(recorder.summary(STATIC_SOURCE).successes, 10);
}

#[tokio::test(start_paused = true)]
async fn test_run_keeps_cadence_until_shutdown() {
    let (routes, _, _) = routes(Script::AlwaysSucceed, Script::AlwaysSucceed);
    let mut cfg = config(None);
    cfg.simulation.tick_interval_ms = 250;
    let sim = Simulation::from_config(&cfg, routes, None, Arc::new(EventRecorder::default()));

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let stopper = async {
        // Ticks start at 0, 250, 500, 750, 1000
        tokio::time::sleep(Duration::from_millis(1100)).await;
        shutdown.trigger();
    };

    let (summary, ()) = tokio::join!(sim.run(rx), stopper);
    assert_eq!(summary.ticks, 5);
    assert_eq!(summary.static_tally.successes, 5);
}

#[tokio::test]
async fn test_run_respects_tick_limit() {
    let (routes, _, _) = routes(Script::AlwaysFail, Script::AlwaysSucceed);
    let mut cfg = config(Some(12));
    cfg.simulation.tick_interval_ms = 1;
    let sim = Simulation::from_config(&cfg, routes, None, Arc::new(EventRecorder::default()));

    let summary = sim.run(Shutdown::new().subscribe()).await;
    assert_eq!(summary.ticks, 12);
    // 3 downstream failures, then rejections for the rest of the 10s break
    assert_eq!(summary.static_tally.failures, 12);
    assert_eq!(summary.static_tally.rejected, 9);
}
