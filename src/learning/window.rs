//! Rolling per-path outcome history.

use std::collections::VecDeque;
use std::time::Duration;

use crate::learning::action::ServicePath;
use crate::learning::state::LatencyCategory;

/// Outcomes kept per path.
pub const WINDOW_SIZE: usize = 10;

/// Fixed-capacity FIFO of call outcomes (`true` = success).
#[derive(Debug, Clone)]
pub struct OutcomeWindow {
    outcomes: VecDeque<bool>,
    capacity: usize,
}

impl OutcomeWindow {
    /// Create a window with the standard capacity.
    pub fn new() -> Self {
        Self::with_capacity(WINDOW_SIZE)
    }

    /// Create a window holding at most `capacity` outcomes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            outcomes: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Append an outcome, evicting the oldest when full.
    pub fn record(&mut self, success: bool) {
        if self.outcomes.len() == self.capacity {
            self.outcomes.pop_front();
        }
        self.outcomes.push_back(success);
    }

    /// Share of failures in the window; 0.0 when nothing was recorded.
    pub fn failure_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        let failures = self.outcomes.iter().filter(|ok| !**ok).count();
        failures as f64 / self.outcomes.len() as f64
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

impl Default for OutcomeWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// The two independent windows plus the latency of the most recent call.
#[derive(Debug, Clone, Default)]
pub struct PathWindows {
    primary: OutcomeWindow,
    backup: OutcomeWindow,
    last_latency: LatencyCategory,
}

impl PathWindows {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an outcome against `path` and remember the call's latency bucket.
    pub fn record(&mut self, path: ServicePath, success: bool, elapsed: Duration) {
        match path {
            ServicePath::Primary => self.primary.record(success),
            ServicePath::Backup => self.backup.record(success),
        }
        self.last_latency = LatencyCategory::from_elapsed(elapsed);
    }

    pub fn primary_failure_rate(&self) -> f64 {
        self.primary.failure_rate()
    }

    pub fn backup_failure_rate(&self) -> f64 {
        self.backup.failure_rate()
    }

    pub fn last_latency(&self) -> LatencyCategory {
        self.last_latency
    }
}
