//! Reinforcement-learning circuit breaker.
//!
//! Every request runs one observe → choose → apply → execute → reward →
//! record → learn cycle. The whole cycle holds the controller lock, so the
//! state used for `prev` is exactly the state the update is credited to.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::AgentConfig;
use crate::downstream::{Downstream, ServiceRoutes};
use crate::learning::{Action, Agent, Observation, PathWindows, QTable, QTableSnapshot, ServicePath};
use crate::observability::{metrics, MetricsSink};
use crate::resilience::timeouts::with_deadline;
use crate::resilience::{BreakerState, CallError, CallResult, PolicySet, PolicySlot};

/// Metrics source for the adaptive controller.
pub const ADAPTIVE_SOURCE: &str = "RL_CB";

pub const REWARD_SUCCESS: f64 = 10.0;
pub const REWARD_REJECTED: f64 = 20.0;
pub const REWARD_FAILURE: f64 = -10.0;

/// Reward credited to the action that produced `result`.
pub fn reward_for<T>(result: &CallResult<T>) -> f64 {
    match result {
        Ok(_) => REWARD_SUCCESS,
        Err(CallError::Rejected { .. }) => REWARD_REJECTED,
        Err(_) => REWARD_FAILURE,
    }
}

/// Tunables that are not part of the agent itself.
#[derive(Debug, Clone)]
pub struct AdaptiveOptions {
    pub call_timeout: Duration,
    pub training_exploration: f64,
    pub exploit_exploration: f64,
}

impl AdaptiveOptions {
    pub fn from_config(agent: &AgentConfig, call_timeout: Duration) -> Self {
        Self {
            call_timeout,
            training_exploration: agent.training_exploration,
            exploit_exploration: agent.exploit_exploration,
        }
    }
}

impl Default for AdaptiveOptions {
    fn default() -> Self {
        Self::from_config(&AgentConfig::default(), Duration::from_secs(2))
    }
}

/// Read-only picture of the controller after the latest cycle.
#[derive(Debug, Clone)]
pub struct AdaptiveView {
    pub breaker_state: BreakerState,
    pub active_path: ServicePath,
    pub active_policy: Action,
    pub last_state_index: usize,
    pub exploration_rate: f64,
    pub table: QTable,
}

/// State mutated by a cycle.
struct Cycle {
    agent: Agent,
    policies: PolicySet,
    active_slot: PolicySlot,
    active_policy: Action,
    active_path: ServicePath,
    windows: PathWindows,
    last_state_index: usize,
    /// Slot whose half-open trial was admitted by a cycle that has not finished.
    pending_trial: Option<PolicySlot>,
}

impl Cycle {
    fn observe(&self) -> usize {
        Observation {
            breaker: self.policies.get(self.active_slot).state(),
            primary_failure_rate: self.windows.primary_failure_rate(),
            backup_failure_rate: self.windows.backup_failure_rate(),
            latency: self.windows.last_latency(),
        }
        .state_index()
    }

    fn apply(&mut self, action: Action, sink: &dyn MetricsSink) {
        if let Some(path) = action.path() {
            if path != self.active_path {
                self.active_path = path;
                tracing::info!(path = %path, "Switched service path");
                sink.record_state_change(ADAPTIVE_SOURCE, &format!("Switched to {path}"));
                metrics::record_active_path(path);
            }
        } else if let Some(slot) = PolicySlot::for_action(action) {
            if slot != self.active_slot {
                self.active_slot = slot;
                self.active_policy = action;
                tracing::info!(policy = %action, "Breaker policy changed");
                sink.record_state_change(ADAPTIVE_SOURCE, &format!("Policy changed: {action}"));
            }
        }
    }

    fn view(&self) -> AdaptiveView {
        AdaptiveView {
            breaker_state: self.policies.get(self.active_slot).state(),
            active_path: self.active_path,
            active_policy: self.active_policy,
            last_state_index: self.last_state_index,
            exploration_rate: self.agent.exploration_rate(),
            table: self.agent.table().clone(),
        }
    }
}

/// Circuit breaker whose policy and target path are chosen by a Q-learning agent.
pub struct AdaptiveController<S> {
    routes: ServiceRoutes<S>,
    sink: Arc<dyn MetricsSink>,
    options: AdaptiveOptions,
    cycle: Mutex<Cycle>,
    view: ArcSwap<AdaptiveView>,
}

impl<S: Downstream> AdaptiveController<S> {
    /// Starts on the primary path under the KeepClosed policy.
    pub fn new(
        routes: ServiceRoutes<S>,
        agent: Agent,
        sink: Arc<dyn MetricsSink>,
        options: AdaptiveOptions,
    ) -> Self {
        let mut cycle = Cycle {
            agent,
            policies: PolicySet::new(ADAPTIVE_SOURCE, sink.clone()),
            active_slot: PolicySlot::KEEP_CLOSED,
            active_policy: Action::KeepClosed,
            active_path: ServicePath::Primary,
            windows: PathWindows::new(),
            last_state_index: 0,
            pending_trial: None,
        };
        cycle.last_state_index = cycle.observe();
        let view = ArcSwap::from_pointee(cycle.view());

        Self {
            routes,
            sink,
            options,
            cycle: Mutex::new(cycle),
            view,
        }
    }

    /// Build the agent from config, optionally starting from a saved table.
    pub fn from_config(
        routes: ServiceRoutes<S>,
        config: &AgentConfig,
        table: Option<QTable>,
        sink: Arc<dyn MetricsSink>,
        call_timeout: Duration,
    ) -> Self {
        let agent = match config.seed {
            Some(seed) => Agent::with_seed(
                config.learning_rate,
                config.discount_factor,
                config.exploration_rate,
                seed,
            ),
            None => Agent::new(config.learning_rate, config.discount_factor, config.exploration_rate),
        };
        let agent = match table {
            Some(table) => agent.with_table(table),
            None => agent,
        };
        Self::new(routes, agent, sink, AdaptiveOptions::from_config(config, call_timeout))
    }

    /// Run one full learning cycle around a single downstream call.
    ///
    /// A cycle dropped mid-call is not learned from; its half-open trial, if
    /// any, is released by the next cycle.
    pub async fn execute(&self) -> CallResult<String> {
        let mut guard = self.cycle.lock().await;
        let cycle = &mut *guard;

        if let Some(slot) = cycle.pending_trial.take() {
            cycle.policies.get_mut(slot).release_trial();
        }

        let prev = cycle.observe();
        cycle.last_state_index = prev;

        let action = cycle.agent.choose_action(prev);
        tracing::debug!(action = %action, state_index = prev, "Action chosen");
        cycle.apply(action, self.sink.as_ref());

        let path = cycle.active_path;
        let slot = cycle.active_slot;
        let service = self.routes.get(path).clone();

        let start = Instant::now();
        let admitted = cycle.policies.get_mut(slot).try_acquire();
        let result = match admitted {
            Ok(()) => {
                if cycle.policies.get(slot).state() == BreakerState::HalfOpen {
                    cycle.pending_trial = Some(slot);
                }
                let outcome = with_deadline(self.options.call_timeout, service.call()).await;
                cycle.pending_trial = None;
                let breaker = cycle.policies.get_mut(slot);
                match outcome {
                    Ok(_) => breaker.record_success(),
                    Err(_) => breaker.record_failure(),
                }
                outcome
            }
            Err(rejected) => Err(rejected),
        };
        let elapsed = start.elapsed();

        let reward = reward_for(&result);
        cycle.windows.record(path, result.is_ok(), elapsed);

        let next = cycle.observe();
        let q = cycle.agent.update(prev, action, reward, next);
        metrics::record_q_update();
        tracing::debug!(
            state_index = prev,
            next_state_index = next,
            action = %action,
            reward,
            q_value = q,
            "Q-value updated"
        );

        match &result {
            Ok(_) => self.sink.record_success(ADAPTIVE_SOURCE, elapsed),
            Err(e) => self.sink.record_failure(ADAPTIVE_SOURCE, elapsed, e.kind()),
        }

        self.view.store(Arc::new(cycle.view()));
        result
    }

    /// Override epsilon directly (clamped to `[0, 1]`).
    pub async fn set_exploration_rate(&self, rate: f64) {
        let mut cycle = self.cycle.lock().await;
        cycle.agent.set_exploration_rate(rate);
        tracing::info!(exploration_rate = cycle.agent.exploration_rate(), "Exploration rate set");
        self.view.store(Arc::new(cycle.view()));
    }

    /// Switch between the training and exploit exploration rates.
    pub async fn set_training_mode(&self, training: bool) {
        let rate = if training {
            self.options.training_exploration
        } else {
            self.options.exploit_exploration
        };
        let mut cycle = self.cycle.lock().await;
        cycle.agent.set_exploration_rate(rate);
        tracing::info!(training, exploration_rate = rate, "Learning mode changed");
        self.view.store(Arc::new(cycle.view()));
    }

    /// Snapshot published by the latest completed cycle.
    pub fn view(&self) -> Arc<AdaptiveView> {
        self.view.load_full()
    }

    pub fn state(&self) -> BreakerState {
        self.view.load().breaker_state
    }

    pub fn active_path(&self) -> ServicePath {
        self.view.load().active_path
    }

    pub fn active_policy(&self) -> Action {
        self.view.load().active_policy
    }

    /// State index observed at the start of the latest cycle.
    pub fn last_state_index(&self) -> usize {
        self.view.load().last_state_index
    }

    pub fn exploration_rate(&self) -> f64 {
        self.view.load().exploration_rate
    }

    pub fn q_table(&self) -> QTableSnapshot {
        self.view.load().table.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downstream::DownstreamError;
    use crate::observability::EventRecorder;
    use crate::resilience::FailureKind;

    struct Fixed(bool);

    impl Downstream for Fixed {
        async fn call(&self) -> Result<String, DownstreamError> {
            if self.0 {
                Ok("ok".to_string())
            } else {
                Err(DownstreamError::new("fixed", "down"))
            }
        }
    }

    fn controller(primary_ok: bool, backup_ok: bool) -> (AdaptiveController<Fixed>, Arc<EventRecorder>) {
        let recorder = Arc::new(EventRecorder::default());
        let routes = ServiceRoutes::new(Arc::new(Fixed(primary_ok)), Arc::new(Fixed(backup_ok)));
        let agent = Agent::with_seed(0.1, 0.9, 0.0, 11).with_table(QTable::zeroed());
        let ctl = AdaptiveController::new(routes, agent, recorder.clone(), AdaptiveOptions::default());
        (ctl, recorder)
    }

    #[test]
    fn test_rewards() {
        assert_eq!(reward_for(&Ok::<_, CallError>(())), 10.0);
        let rejected: CallResult<()> = Err(CallError::Rejected {
            breaker: "x".into(),
            state: BreakerState::Open,
        });
        assert_eq!(reward_for(&rejected), 20.0);
        let timeout: CallResult<()> = Err(CallError::Timeout(Duration::from_secs(1)));
        assert_eq!(reward_for(&timeout), -10.0);
    }

    #[tokio::test]
    async fn test_initial_view() {
        let (ctl, _) = controller(true, true);
        assert_eq!(ctl.state(), BreakerState::Closed);
        assert_eq!(ctl.active_path(), ServicePath::Primary);
        assert_eq!(ctl.active_policy(), Action::KeepClosed);
        assert_eq!(ctl.last_state_index(), 0);
    }

    #[tokio::test]
    async fn test_success_updates_greedy_action() {
        // Zeroed table at epsilon 0 always picks KeepClosed
        let (ctl, recorder) = controller(true, true);
        assert_eq!(ctl.execute().await.unwrap(), "ok");

        let table = QTable::from_snapshot(ctl.q_table()).unwrap();
        // 0 + 0.1 * (10 + 0.9 * 0 - 0)
        assert!((table.get(0, Action::KeepClosed) - 1.0).abs() < 1e-9);
        assert_eq!(recorder.summary(ADAPTIVE_SOURCE).successes, 1);
    }

    #[tokio::test]
    async fn test_failure_is_learned_before_it_is_returned() {
        let (ctl, recorder) = controller(false, true);
        let err = ctl.execute().await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Downstream);

        let table = QTable::from_snapshot(ctl.q_table()).unwrap();
        assert!((table.get(0, Action::KeepClosed) + 1.0).abs() < 1e-9);
        // Primary window now holds one failure out of one
        assert_eq!(recorder.summary(ADAPTIVE_SOURCE).failures, 1);
    }

    #[tokio::test]
    async fn test_training_mode_switches_epsilon() {
        let (ctl, _) = controller(true, true);
        ctl.set_training_mode(true).await;
        assert_eq!(ctl.exploration_rate(), 0.3);
        ctl.set_training_mode(false).await;
        assert_eq!(ctl.exploration_rate(), 0.05);
        ctl.set_exploration_rate(4.0).await;
        assert_eq!(ctl.exploration_rate(), 1.0);
    }
}
