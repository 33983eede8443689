//! Scripted failure-rate schedules for the primary service.

use std::fmt;
use std::time::Duration;

use clap::ValueEnum;
use serde::Serialize;

use crate::downstream::SimulatedService;
use crate::lifecycle::Shutdown;

/// A named degradation pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Healthy, then progressively worse.
    GradualDegradation,
    /// Healthy, near-total outage, recovery.
    SuddenOutage,
    /// Flapping between healthy and failing.
    IntermittentFailure,
}

/// One phase of a scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioStep {
    pub narrative: &'static str,
    pub failure_rate: f64,
    pub hold: Duration,
}

const fn step(narrative: &'static str, failure_rate: f64, hold_ms: u64) -> ScenarioStep {
    ScenarioStep {
        narrative,
        failure_rate,
        hold: Duration::from_millis(hold_ms),
    }
}

impl Scenario {
    pub fn steps(self) -> Vec<ScenarioStep> {
        match self {
            Scenario::GradualDegradation => vec![
                step("Starting healthy (10% failure)", 0.1, 11_000),
                step("Service degrading, failure rate at 40%", 0.4, 11_000),
                step("Severe degradation, failure rate at 70%", 0.7, 15_000),
                step("Critical failure (90%), backup path should take over", 0.9, 18_000),
            ],
            Scenario::SuddenOutage => vec![
                step("Starting healthy (10% failure)", 0.1, 11_000),
                step("Sudden outage, primary at 95% failure", 0.95, 18_000),
                step("Service recovered, failure rate back to 10%", 0.1, 18_000),
            ],
            Scenario::IntermittentFailure => vec![
                step("Flapping service, starting at 10% failure", 0.1, 11_000),
                step("Brief failure spike (70%)", 0.7, 11_000),
                step("Service recovers quickly (10%)", 0.1, 11_000),
                step("Longer failure spike (80%)", 0.8, 15_000),
                step("Service stabilizes again (10%)", 0.1, 13_000),
            ],
        }
    }

    pub fn total_duration(self) -> Duration {
        self.steps().iter().map(|s| s.hold).sum()
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scenario::GradualDegradation => "gradual-degradation",
            Scenario::SuddenOutage => "sudden-outage",
            Scenario::IntermittentFailure => "intermittent-failure",
        };
        f.write_str(name)
    }
}

/// Drive `primary` through the scenario, then trigger shutdown.
///
/// Returns early, without triggering, if shutdown arrives first.
pub async fn run_scenario(scenario: Scenario, primary: &SimulatedService, shutdown: &Shutdown) {
    let mut rx = shutdown.subscribe();
    tracing::info!(scenario = %scenario, "Scenario started");

    for (i, step) in scenario.steps().into_iter().enumerate() {
        tracing::info!(step = i + 1, failure_rate = step.failure_rate, "{}", step.narrative);
        primary.set_failure_rate(step.failure_rate);

        tokio::select! {
            _ = tokio::time::sleep(step.hold) => {}
            _ = rx.recv() => {
                tracing::info!(scenario = %scenario, "Scenario interrupted");
                return;
            }
        }
    }

    tracing::info!(scenario = %scenario, "Scenario finished");
    shutdown.trigger();
}
