//! Adaptive circuit breaker simulator.
//!
//! # Architecture Overview
//!
//! ```text
//!            ┌──────────────────────────────────────────────────────────┐
//!            │                       SIMULATION                          │
//!            │                                                           │
//!   tick ────┼─▶ StaticController ──▶ breaker (3 / 10s) ──▶ primary      │
//!            │                                                           │
//!   tick ────┼─▶ AdaptiveController                                      │
//!            │     observe ─▶ agent.choose ─▶ policy breaker ─▶ primary  │
//!            │        ▲                                      └─▶ backup  │
//!            │        └──── windows + reward ◀── outcome, latency        │
//!            │                                                           │
//!            │  ┌─────────────────────────────────────────────────────┐ │
//!            │  │            Cross-Cutting Concerns                    │ │
//!            │  │  config · observability · lifecycle · persistence    │ │
//!            │  └─────────────────────────────────────────────────────┘ │
//!            └──────────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tracing::Instrument;

use adaptive_breaker::config::{load_config, validate_config, SimulationConfig};
use adaptive_breaker::controller::{ADAPTIVE_SOURCE, STATIC_SOURCE};
use adaptive_breaker::downstream::{ServiceRoutes, SimulatedService};
use adaptive_breaker::learning::persistence::{load_table, save_table};
use adaptive_breaker::lifecycle::{signals, Shutdown};
use adaptive_breaker::observability::{logging, metrics, EventRecorder};
use adaptive_breaker::simulation::{run_scenario, Scenario, Simulation};

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "adaptive-breaker", version, about = "Static vs Q-learning circuit breaker simulation")]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scripted primary degradation; the run ends when it finishes.
    #[arg(short, long, value_enum)]
    scenario: Option<Scenario>,

    /// Stop after this many ticks.
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Initial primary failure rate (0.0 - 1.0).
    #[arg(long)]
    primary_failure_rate: Option<f64>,

    /// Start in exploit mode instead of training mode.
    #[arg(long)]
    exploit: bool,

    /// Write the learned table here at exit (defaults to the configured table path).
    #[arg(long)]
    save_table: Option<PathBuf>,

    /// Start from a previously saved table.
    #[arg(long)]
    load_table: Option<PathBuf>,
}

impl Cli {
    fn apply_overrides(&self, config: &mut SimulationConfig) {
        if let Some(ticks) = self.ticks {
            config.simulation.max_ticks = Some(ticks);
        }
        if let Some(rate) = self.primary_failure_rate {
            config.primary.failure_rate = rate;
        }
        if let Some(path) = &self.load_table {
            config.simulation.table_path = Some(path.display().to_string());
        }
        if self.exploit {
            config.agent.exploration_rate = config.agent.exploit_exploration;
        }
    }

    /// Where the learned table goes at exit, if anywhere.
    fn table_output(&self, config: &SimulationConfig) -> Option<PathBuf> {
        self.save_table
            .clone()
            .or_else(|| config.simulation.table_path.as_ref().map(PathBuf::from))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => SimulationConfig::default(),
    };
    cli.apply_overrides(&mut config);
    if let Err(errors) = validate_config(&config) {
        for e in &errors {
            eprintln!("invalid configuration: {e}");
        }
        return Err(format!("{} configuration error(s)", errors.len()).into());
    }

    logging::init_logging(&config.observability);

    let run_id = uuid::Uuid::new_v4();
    simulate(cli, config)
        .instrument(tracing::info_span!("run", run_id = %run_id))
        .await
}

async fn simulate(cli: Cli, config: SimulationConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("adaptive-breaker v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        static_threshold = config.static_breaker.failure_threshold,
        static_break_secs = config.static_breaker.break_duration_secs,
        learning_rate = config.agent.learning_rate,
        discount_factor = config.agent.discount_factor,
        primary_failure_rate = config.primary.failure_rate,
        backup_failure_rate = config.backup.failure_rate,
        tick_interval_ms = config.simulation.tick_interval_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let table = match &config.simulation.table_path {
        Some(path) => Some(load_table(Path::new(path))?),
        None => None,
    };

    let primary = Arc::new(SimulatedService::new("Primary", &config.primary));
    let backup = Arc::new(SimulatedService::new("Backup", &config.backup));
    let routes = ServiceRoutes::new(primary.clone(), backup);

    let recorder = Arc::new(EventRecorder::new(config.observability.event_capacity));
    let simulation = Simulation::from_config(&config, routes, table, recorder.clone());

    let shutdown = Shutdown::new();
    tokio::spawn(signals::wait_for_signal(shutdown.clone()));

    let run = simulation.run(shutdown.subscribe());
    let summary = match cli.scenario {
        Some(scenario) => {
            let ticking = async {
                let summary = run.await;
                shutdown.trigger();
                summary
            };
            let (summary, ()) = tokio::join!(ticking, run_scenario(scenario, &primary, &shutdown));
            summary
        }
        None => run.await,
    };

    let view = simulation.adaptive().view();
    if let Some(path) = cli.table_output(&config) {
        save_table(&path, &view.table)?;
    }

    let static_totals = recorder.summary(STATIC_SOURCE);
    let adaptive_totals = recorder.summary(ADAPTIVE_SOURCE);
    tracing::info!(
        ticks = summary.ticks,
        static_successes = summary.static_tally.successes,
        static_failures = summary.static_tally.failures,
        static_rejected = summary.static_tally.rejected,
        static_state_changes = static_totals.state_changes,
        adaptive_successes = summary.adaptive_tally.successes,
        adaptive_failures = summary.adaptive_tally.failures,
        adaptive_rejected = summary.adaptive_tally.rejected,
        adaptive_state_changes = adaptive_totals.state_changes,
        active_path = %view.active_path,
        active_policy = %view.active_policy,
        breaker_state = %view.breaker_state,
        "Run summary"
    );

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("adaptive-breaker").chain(args.iter().copied()))
    }

    #[test]
    fn test_configured_exploration_rate_is_kept() {
        let mut config = SimulationConfig::default();
        config.agent.exploration_rate = 0.12;
        cli(&[]).apply_overrides(&mut config);
        assert_eq!(config.agent.exploration_rate, 0.12);
    }

    #[test]
    fn test_exploit_flag_uses_exploit_rate() {
        let mut config = SimulationConfig::default();
        config.agent.exploration_rate = 0.12;
        cli(&["--exploit"]).apply_overrides(&mut config);
        assert_eq!(config.agent.exploration_rate, config.agent.exploit_exploration);
    }

    #[test]
    fn test_table_is_saved_to_configured_path() {
        let mut config = SimulationConfig::default();
        assert_eq!(cli(&[]).table_output(&config), None);

        config.simulation.table_path = Some("learned.json".to_string());
        assert_eq!(cli(&[]).table_output(&config), Some(PathBuf::from("learned.json")));

        let explicit = cli(&["--save-table", "out.json"]);
        assert_eq!(explicit.table_output(&config), Some(PathBuf::from("out.json")));
    }

    #[test]
    fn test_load_table_flag_is_also_the_save_target() {
        let mut config = SimulationConfig::default();
        let args = cli(&["--load-table", "warm.json"]);
        args.apply_overrides(&mut config);
        assert_eq!(args.table_output(&config), Some(PathBuf::from("warm.json")));
    }
}
