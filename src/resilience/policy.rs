//! Breaker policies the agent chooses between.
//!
//! | Action       | Threshold | Break    | Slot |
//! |--------------|-----------|----------|------|
//! | KeepClosed   | 100       | 1 hour   | 0    |
//! | OpenFor5s    | 2         | 5 s      | 1    |
//! | OpenFor10s   | 2         | 10 s     | 2    |
//! | OpenFor20s   | 2         | 20 s     | 3    |
//! | TryHalfOpen  | (alias of OpenFor5s) | | 1 |

use std::sync::Arc;
use std::time::Duration;

use crate::learning::Action;
use crate::observability::MetricsSink;
use crate::resilience::circuit_breaker::CircuitBreaker;

/// High enough that the breaker stays closed in practice.
const KEEP_CLOSED_THRESHOLD: u32 = 100;
const KEEP_CLOSED_BREAK: Duration = Duration::from_secs(3600);
const POLICY_THRESHOLD: u32 = 2;

/// Index of a distinct breaker inside a [`PolicySet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PolicySlot(usize);

impl PolicySlot {
    pub const KEEP_CLOSED: PolicySlot = PolicySlot(0);

    /// Slot selected by a policy action; `None` for path-select actions.
    pub fn for_action(action: Action) -> Option<Self> {
        match action {
            Action::KeepClosed => Some(PolicySlot(0)),
            Action::OpenFor5s | Action::TryHalfOpen => Some(PolicySlot(1)),
            Action::OpenFor10s => Some(PolicySlot(2)),
            Action::OpenFor20s => Some(PolicySlot(3)),
            Action::UsePrimary | Action::UseBackup => None,
        }
    }
}

/// The four distinct breakers behind the five policy actions.
#[derive(Debug)]
pub struct PolicySet {
    breakers: [CircuitBreaker; 4],
}

impl PolicySet {
    pub fn new(source: &'static str, sink: Arc<dyn MetricsSink>) -> Self {
        let standard = |name: &str, break_duration: Duration| {
            CircuitBreaker::new(name, source, POLICY_THRESHOLD, break_duration, sink.clone())
        };

        Self {
            breakers: [
                CircuitBreaker::new("KeepClosed", source, KEEP_CLOSED_THRESHOLD, KEEP_CLOSED_BREAK, sink.clone()),
                standard("OpenFor5s", Duration::from_secs(5)),
                standard("OpenFor10s", Duration::from_secs(10)),
                standard("OpenFor20s", Duration::from_secs(20)),
            ],
        }
    }

    pub fn get(&self, slot: PolicySlot) -> &CircuitBreaker {
        &self.breakers[slot.0]
    }

    pub fn get_mut(&mut self, slot: PolicySlot) -> &mut CircuitBreaker {
        &mut self.breakers[slot.0]
    }

    /// Breaker a policy action refers to.
    pub fn for_action(&self, action: Action) -> Option<&CircuitBreaker> {
        PolicySlot::for_action(action).map(|slot| self.get(slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::EventRecorder;
    use crate::resilience::BreakerState;

    fn policies() -> PolicySet {
        PolicySet::new("RL_CB", Arc::new(EventRecorder::default()))
    }

    #[test]
    fn test_policy_parameters() {
        let set = policies();
        let keep = set.for_action(Action::KeepClosed).unwrap();
        assert_eq!(keep.failure_threshold(), 100);
        assert_eq!(keep.break_duration(), Duration::from_secs(3600));

        for (action, secs) in [(Action::OpenFor5s, 5), (Action::OpenFor10s, 10), (Action::OpenFor20s, 20)] {
            let cb = set.for_action(action).unwrap();
            assert_eq!(cb.failure_threshold(), 2);
            assert_eq!(cb.break_duration(), Duration::from_secs(secs));
        }

        assert!(set.for_action(Action::UseBackup).is_none());
    }

    #[test]
    fn test_try_half_open_aliases_five_second_breaker() {
        let mut set = policies();
        let slot = PolicySlot::for_action(Action::OpenFor5s).unwrap();
        assert_eq!(PolicySlot::for_action(Action::TryHalfOpen), Some(slot));

        set.get_mut(slot).record_failure();
        set.get_mut(slot).record_failure();

        // Same instance: opening one opens the other
        assert_eq!(set.for_action(Action::TryHalfOpen).unwrap().state(), BreakerState::Open);
        assert_eq!(set.for_action(Action::OpenFor10s).unwrap().state(), BreakerState::Closed);
    }
}
