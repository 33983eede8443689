//! Circuit breaker for downstream protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: downstream assumed down, calls are rejected without being made
//! - Half-Open: a single trial call tests whether the downstream recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= threshold
//! Open → Half-Open: first call attempt after the break duration
//! Half-Open → Closed: trial call succeeds (failure counter reset)
//! Half-Open → Open: trial call fails (break timer restarted)
//! ```
//!
//! # Design Decisions
//! - One breaker per policy, owned by its controller (no interior locking)
//! - Fail fast in Open state
//! - Single trial in Half-Open; concurrent attempts are rejected
//! - Every transition is reported to the metrics sink
//! - Time comes from `tokio::time`, so paused test clocks drive recovery
//! - An abandoned trial is released without counting as an outcome

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::observability::MetricsSink;
use crate::resilience::types::CallError;

/// Breaker state, with the ordinals used by the state encoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BreakerState {
    #[default]
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl BreakerState {
    pub const ALL: [BreakerState; 3] = [BreakerState::Closed, BreakerState::Open, BreakerState::HalfOpen];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    /// Label reported to the metrics sink.
    pub fn label(self) -> &'static str {
        match self {
            BreakerState::Closed => "Closed",
            BreakerState::Open => "Open",
            BreakerState::HalfOpen => "Half-Open",
        }
    }
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Consecutive-failure circuit breaker with timed recovery.
pub struct CircuitBreaker {
    /// Policy name used in logs.
    name: String,
    /// Metrics source the transitions are reported under.
    source: &'static str,
    failure_threshold: u32,
    break_duration: Duration,
    state: BreakerState,
    consecutive_failures: u32,
    /// When the breaker last opened.
    opened_at: Option<Instant>,
    /// A half-open trial call has been admitted and not yet recorded.
    trial_in_flight: bool,
    sink: Arc<dyn MetricsSink>,
}

impl CircuitBreaker {
    pub fn new(
        name: impl Into<String>,
        source: &'static str,
        failure_threshold: u32,
        break_duration: Duration,
        sink: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            failure_threshold: failure_threshold.max(1),
            break_duration,
            state: BreakerState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            trial_in_flight: false,
            sink,
        }
    }

    /// Current state. Does not advance Open to Half-Open; only a call attempt does.
    pub fn state(&self) -> BreakerState {
        self.state
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    pub fn break_duration(&self) -> Duration {
        self.break_duration
    }

    /// Ask to make a call now.
    pub fn try_acquire(&mut self) -> Result<(), CallError> {
        self.try_acquire_at(Instant::now())
    }

    /// Ask to make a call at `now`.
    ///
    /// On `Ok` the caller must report the outcome with `record_success` or
    /// `record_failure`.
    pub fn try_acquire_at(&mut self, now: Instant) -> Result<(), CallError> {
        match self.state {
            BreakerState::Closed => Ok(()),
            BreakerState::Open => {
                let elapsed = self
                    .opened_at
                    .map(|opened| now.saturating_duration_since(opened))
                    .unwrap_or(self.break_duration);

                if elapsed >= self.break_duration {
                    self.transition_to(BreakerState::HalfOpen, now);
                    self.trial_in_flight = true;
                    Ok(())
                } else {
                    tracing::debug!(
                        breaker = %self.name,
                        remaining_ms = (self.break_duration - elapsed).as_millis() as u64,
                        "Circuit open, rejecting call"
                    );
                    Err(self.rejection())
                }
            }
            BreakerState::HalfOpen => {
                if self.trial_in_flight {
                    tracing::debug!(breaker = %self.name, "Trial call in flight, rejecting call");
                    Err(self.rejection())
                } else {
                    self.trial_in_flight = true;
                    Ok(())
                }
            }
        }
    }

    pub fn record_success(&mut self) {
        self.record_success_at(Instant::now());
    }

    pub fn record_success_at(&mut self, now: Instant) {
        match self.state {
            BreakerState::Closed => {
                self.consecutive_failures = 0;
            }
            BreakerState::HalfOpen => {
                self.trial_in_flight = false;
                self.transition_to(BreakerState::Closed, now);
            }
            BreakerState::Open => {
                tracing::trace!(breaker = %self.name, "Success recorded in open state (ignored)");
            }
        }
    }

    pub fn record_failure(&mut self) {
        self.record_failure_at(Instant::now());
    }

    pub fn record_failure_at(&mut self, now: Instant) {
        match self.state {
            BreakerState::Closed => {
                self.consecutive_failures += 1;
                tracing::debug!(
                    breaker = %self.name,
                    failures = self.consecutive_failures,
                    threshold = self.failure_threshold,
                    "Failure in closed state"
                );
                if self.consecutive_failures >= self.failure_threshold {
                    self.transition_to(BreakerState::Open, now);
                }
            }
            BreakerState::HalfOpen => {
                self.trial_in_flight = false;
                tracing::warn!(breaker = %self.name, "Trial call failed, reopening circuit");
                self.transition_to(BreakerState::Open, now);
            }
            BreakerState::Open => {
                tracing::trace!(breaker = %self.name, "Failure recorded in open state (ignored)");
            }
        }
    }

    /// Give back a half-open trial whose call never completed.
    ///
    /// The state stays Half-Open and the next attempt becomes the trial.
    pub fn release_trial(&mut self) {
        if self.state == BreakerState::HalfOpen && self.trial_in_flight {
            self.trial_in_flight = false;
            tracing::debug!(breaker = %self.name, "Trial call abandoned");
        }
    }

    fn rejection(&self) -> CallError {
        CallError::Rejected {
            breaker: self.name.clone(),
            state: self.state,
        }
    }

    fn transition_to(&mut self, new_state: BreakerState, now: Instant) {
        if self.state == new_state {
            return;
        }
        self.state = new_state;

        match new_state {
            BreakerState::Closed => {
                self.consecutive_failures = 0;
                self.opened_at = None;
                tracing::info!(breaker = %self.name, source = self.source, "Circuit closed");
            }
            BreakerState::Open => {
                self.opened_at = Some(now);
                tracing::warn!(
                    breaker = %self.name,
                    source = self.source,
                    failures = self.consecutive_failures,
                    break_ms = self.break_duration.as_millis() as u64,
                    "Circuit opened"
                );
            }
            BreakerState::HalfOpen => {
                tracing::info!(breaker = %self.name, source = self.source, "Circuit half-open, next call is a trial");
            }
        }

        self.sink.record_state_change(self.source, new_state.label());
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("consecutive_failures", &self.consecutive_failures)
            .field("failure_threshold", &self.failure_threshold)
            .field("break_duration", &self.break_duration)
            .finish_non_exhaustive()
    }
}
