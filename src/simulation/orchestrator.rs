//! Side-by-side driver for the static and adaptive controllers.
//!
//! # Responsibilities
//! - Issue one call per controller per tick, concurrently
//! - Keep a fixed cadence until shutdown or the tick limit
//! - Tally outcomes for the end-of-run summary
//!
//! # Design Decisions
//! - Shutdown is checked between ticks; a tick in progress always completes
//! - The driver owns no breaker state; it only reads the controllers

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::config::SimulationConfig;
use crate::controller::{AdaptiveController, CallResult, StaticController};
use crate::downstream::{Downstream, ServiceRoutes, ServicePath};
use crate::learning::{Action, QTable};
use crate::observability::MetricsSink;
use crate::resilience::{BreakerState, FailureKind};

/// Outcome of a single call, without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CallOutcome {
    Success,
    Failed(FailureKind),
}

impl CallOutcome {
    fn of<T>(result: &CallResult<T>) -> Self {
        match result {
            Ok(_) => CallOutcome::Success,
            Err(e) => CallOutcome::Failed(e.kind()),
        }
    }

    pub fn is_success(self) -> bool {
        self == CallOutcome::Success
    }
}

/// What happened on one tick.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub static_outcome: CallOutcome,
    pub static_state: BreakerState,
    pub adaptive_outcome: CallOutcome,
    pub adaptive_state: BreakerState,
    pub active_path: ServicePath,
    pub active_policy: Action,
}

/// Per-controller tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub successes: u64,
    pub failures: u64,
    pub rejected: u64,
}

impl Tally {
    fn add(&mut self, outcome: CallOutcome) {
        match outcome {
            CallOutcome::Success => self.successes += 1,
            CallOutcome::Failed(kind) => {
                self.failures += 1;
                if kind == FailureKind::Rejected {
                    self.rejected += 1;
                }
            }
        }
    }
}

/// Totals for a whole run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub static_tally: Tally,
    pub adaptive_tally: Tally,
}

/// Both controllers plus the loop settings.
pub struct Simulation<S> {
    static_controller: Arc<StaticController<S>>,
    adaptive: Arc<AdaptiveController<S>>,
    tick_interval: Duration,
    max_ticks: Option<u64>,
}

impl<S: Downstream> Simulation<S> {
    pub fn new(
        static_controller: StaticController<S>,
        adaptive: AdaptiveController<S>,
        tick_interval: Duration,
        max_ticks: Option<u64>,
    ) -> Self {
        Self {
            static_controller: Arc::new(static_controller),
            adaptive: Arc::new(adaptive),
            tick_interval,
            max_ticks,
        }
    }

    /// Wire both controllers to `routes` the way `config` describes.
    ///
    /// The static controller only ever sees the primary.
    pub fn from_config(
        config: &SimulationConfig,
        routes: ServiceRoutes<S>,
        table: Option<QTable>,
        sink: Arc<dyn MetricsSink>,
    ) -> Self {
        let call_timeout = Duration::from_millis(config.simulation.call_timeout_ms);
        let static_controller = StaticController::new(
            routes.primary().clone(),
            &config.static_breaker,
            sink.clone(),
            call_timeout,
        );
        let adaptive = AdaptiveController::from_config(routes, &config.agent, table, sink, call_timeout);

        Self::new(
            static_controller,
            adaptive,
            Duration::from_millis(config.simulation.tick_interval_ms),
            config.simulation.max_ticks,
        )
    }

    pub fn static_controller(&self) -> &Arc<StaticController<S>> {
        &self.static_controller
    }

    pub fn adaptive(&self) -> &Arc<AdaptiveController<S>> {
        &self.adaptive
    }

    /// One call through each controller, concurrently.
    pub async fn run_tick(&self, tick: u64) -> TickReport {
        let (static_result, adaptive_result) =
            tokio::join!(self.static_controller.execute(), self.adaptive.execute());

        let view = self.adaptive.view();
        TickReport {
            tick,
            static_outcome: CallOutcome::of(&static_result),
            static_state: self.static_controller.state(),
            adaptive_outcome: CallOutcome::of(&adaptive_result),
            adaptive_state: view.breaker_state,
            active_path: view.active_path,
            active_policy: view.active_policy,
        }
    }

    /// Tick until shutdown or `max_ticks`.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> RunSummary {
        let mut summary = RunSummary::default();

        tracing::info!(
            tick_interval_ms = self.tick_interval.as_millis() as u64,
            max_ticks = ?self.max_ticks,
            "Simulation started"
        );

        loop {
            match shutdown.try_recv() {
                Err(TryRecvError::Empty) => {}
                _ => {
                    tracing::info!("Simulation received shutdown signal");
                    break;
                }
            }
            if self.max_ticks.is_some_and(|max| summary.ticks >= max) {
                tracing::info!(ticks = summary.ticks, "Tick limit reached");
                break;
            }

            summary.ticks += 1;
            let report = self.run_tick(summary.ticks).await;
            summary.static_tally.add(report.static_outcome);
            summary.adaptive_tally.add(report.adaptive_outcome);

            tracing::debug!(
                tick = report.tick,
                static_ok = report.static_outcome.is_success(),
                static_state = %report.static_state,
                adaptive_ok = report.adaptive_outcome.is_success(),
                adaptive_state = %report.adaptive_state,
                path = %report.active_path,
                policy = %report.active_policy,
                "Tick complete"
            );

            tokio::select! {
                _ = tokio::time::sleep(self.tick_interval) => {}
                _ = shutdown.recv() => {
                    tracing::info!("Simulation received shutdown signal");
                    break;
                }
            }
        }

        tracing::info!(
            ticks = summary.ticks,
            static_successes = summary.static_tally.successes,
            adaptive_successes = summary.adaptive_tally.successes,
            "Simulation stopped"
        );
        summary
    }
}
