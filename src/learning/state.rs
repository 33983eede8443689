//! Discrete observation space.
//!
//! An observation is flattened with a mixed-radix encoding, radices
//! (breaker=3, primary bucket=4, backup bucket=4, latency=2):
//!
//! ```text
//! index = breaker + primary_bucket * 3 + backup_bucket * 12 + latency * 48
//! ```
//!
//! The layout is shared with persisted tables and must not change.

use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::resilience::circuit_breaker::BreakerState;

pub const NUM_BREAKER_STATES: usize = 3;
pub const NUM_FAILURE_BUCKETS: usize = 4;
pub const NUM_LATENCY_CATEGORIES: usize = 2;

/// Size of the flattened state space (96).
pub const NUM_STATES: usize =
    NUM_BREAKER_STATES * NUM_FAILURE_BUCKETS * NUM_FAILURE_BUCKETS * NUM_LATENCY_CATEGORIES;

/// Calls slower than this are `Slow`.
pub const SLOW_CALL_THRESHOLD: Duration = Duration::from_millis(250);

/// Latency bucket of a single call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LatencyCategory {
    #[default]
    Fast = 0,
    Slow = 1,
}

impl LatencyCategory {
    pub fn from_elapsed(elapsed: Duration) -> Self {
        if elapsed > SLOW_CALL_THRESHOLD {
            LatencyCategory::Slow
        } else {
            LatencyCategory::Fast
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Failure-rate bucket: `[0,.25)`, `[.25,.5)`, `[.5,.75)`, `[.75,1]`.
pub fn bucketize(rate: f64) -> usize {
    if rate < 0.25 {
        0
    } else if rate < 0.50 {
        1
    } else if rate < 0.75 {
        2
    } else {
        3
    }
}

/// Flatten raw features into a Q-table row index.
pub fn encode(
    breaker: BreakerState,
    primary_failure_rate: f64,
    backup_failure_rate: f64,
    latency: LatencyCategory,
) -> usize {
    breaker.index()
        + bucketize(primary_failure_rate) * NUM_BREAKER_STATES
        + bucketize(backup_failure_rate) * NUM_BREAKER_STATES * NUM_FAILURE_BUCKETS
        + latency.index() * NUM_BREAKER_STATES * NUM_FAILURE_BUCKETS * NUM_FAILURE_BUCKETS
}

/// Inverse of [`encode`] on bucket level: `(breaker, primary bucket, backup bucket, latency)`.
///
/// Returns `None` when `index` is outside the state space.
pub fn decode(index: usize) -> Option<(BreakerState, usize, usize, LatencyCategory)> {
    if index >= NUM_STATES {
        return None;
    }
    let breaker = BreakerState::from_index(index % NUM_BREAKER_STATES)?;
    let rest = index / NUM_BREAKER_STATES;
    let primary = rest % NUM_FAILURE_BUCKETS;
    let rest = rest / NUM_FAILURE_BUCKETS;
    let backup = rest % NUM_FAILURE_BUCKETS;
    let latency = if rest / NUM_FAILURE_BUCKETS == 0 {
        LatencyCategory::Fast
    } else {
        LatencyCategory::Slow
    };
    Some((breaker, primary, backup, latency))
}

/// What the agent sees before and after each call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub breaker: BreakerState,
    pub primary_failure_rate: f64,
    pub backup_failure_rate: f64,
    pub latency: LatencyCategory,
}

impl Observation {
    pub fn state_index(&self) -> usize {
        encode(
            self.breaker,
            self.primary_failure_rate,
            self.backup_failure_rate,
            self.latency,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_worked_examples() {
        assert_eq!(encode(BreakerState::Closed, 0.1, 0.1, LatencyCategory::Fast), 0);
        assert_eq!(encode(BreakerState::Open, 0.4, 0.1, LatencyCategory::Fast), 4);
        assert_eq!(encode(BreakerState::HalfOpen, 0.9, 0.6, LatencyCategory::Slow), 83);
    }

    #[test]
    fn test_bucket_edges() {
        assert_eq!(bucketize(0.0), 0);
        assert_eq!(bucketize(0.2499), 0);
        assert_eq!(bucketize(0.25), 1);
        assert_eq!(bucketize(0.5), 2);
        assert_eq!(bucketize(0.75), 3);
        assert_eq!(bucketize(1.0), 3);
    }

    #[test]
    fn test_encoding_is_a_bijection() {
        // Representative rate per bucket
        let rates = [0.1, 0.3, 0.6, 0.9];
        let mut seen = HashSet::new();

        for breaker in BreakerState::ALL {
            for (pb, &p) in rates.iter().enumerate() {
                for (bb, &b) in rates.iter().enumerate() {
                    for latency in [LatencyCategory::Fast, LatencyCategory::Slow] {
                        let idx = encode(breaker, p, b, latency);
                        assert!(idx < NUM_STATES);
                        assert!(seen.insert(idx), "collision at {}", idx);
                        assert_eq!(decode(idx), Some((breaker, pb, bb, latency)));
                    }
                }
            }
        }
        assert_eq!(seen.len(), NUM_STATES);
        assert_eq!(decode(NUM_STATES), None);
    }

    #[test]
    fn test_latency_threshold() {
        assert_eq!(LatencyCategory::from_elapsed(Duration::from_millis(250)), LatencyCategory::Fast);
        assert_eq!(LatencyCategory::from_elapsed(Duration::from_millis(251)), LatencyCategory::Slow);
    }
}
