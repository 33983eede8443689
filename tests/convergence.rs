//! Statistical check that the agent learns to route around a failing primary.

use std::collections::HashMap;
use std::sync::Arc;

use adaptive_breaker::controller::{AdaptiveController, AdaptiveOptions};
use adaptive_breaker::learning::state::decode;
use adaptive_breaker::learning::{Action, Agent, QTable};
use adaptive_breaker::observability::EventRecorder;
use adaptive_breaker::resilience::BreakerState;

mod common;
use common::{routes, Script};

const CYCLES: usize = 5000;

fn backup_margin(table: &QTable, state: usize) -> f64 {
    table.get(state, Action::UseBackup) - table.get(state, Action::UsePrimary)
}

#[tokio::test]
async fn test_prefers_backup_when_primary_is_failing() {
    // Primary succeeds once in 20 calls (~95% failure), backup always succeeds
    let (routes, primary, backup) = routes(Script::SucceedEvery(20), Script::AlwaysSucceed);
    let recorder = Arc::new(EventRecorder::new(16));
    // Fully exploratory so every action keeps being tried; myopic so each
    // Q-value tracks the expected reward of its own call
    let agent = Agent::with_seed(0.1, 0.0, 1.0, 2024);
    let ctl = AdaptiveController::new(routes, agent, recorder, AdaptiveOptions::default());
    let before = QTable::from_snapshot(ctl.q_table()).unwrap();

    let mut visits: HashMap<usize, usize> = HashMap::new();
    for _ in 0..CYCLES {
        let _ = ctl.execute().await;
        *visits.entry(ctl.last_state_index()).or_default() += 1;
    }

    // Most visited state with a closed breaker and the primary bucket >= 0.75
    let (hot_state, count) = visits
        .iter()
        .filter(|&(&state, _)| matches!(decode(state), Some((BreakerState::Closed, 3, _, _))))
        .max_by_key(|&(_, &count)| count)
        .map(|(&state, &count)| (state, count))
        .expect("no closed high-failure state visited");
    assert!(count >= 50, "hot state visited only {count} times");

    let after = QTable::from_snapshot(ctl.q_table()).unwrap();
    let margin_before = backup_margin(&before, hot_state);
    let margin_after = backup_margin(&after, hot_state);

    assert!(primary.calls() > 0 && backup.calls() > 0);
    // Initial noise keeps the margin below 0.1
    assert!(margin_before.abs() < 0.1);
    assert!(
        margin_after > margin_before + 5.0,
        "UseBackup margin did not grow in state {hot_state}: before {margin_before:.3}, after {margin_after:.3}"
    );
}
