//! In-process event recorder.
//!
//! Receives every success, failure and state change from both controllers,
//! keeps a bounded event log and per-source counters, and forwards each event
//! to the `metrics` facade.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::observability::metrics;
use crate::resilience::FailureKind;

/// Default number of events kept.
pub const DEFAULT_EVENT_CAPACITY: usize = 200;

/// Receiver of call and breaker events.
///
/// Fire-and-forget: implementations must not fail or block for long.
pub trait MetricsSink: Send + Sync {
    fn record_success(&self, source: &str, duration: Duration);
    fn record_failure(&self, source: &str, duration: Duration, kind: FailureKind);
    fn record_state_change(&self, source: &str, new_state: &str);
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    Success,
    Failure { kind: &'static str },
    StateChange { new_state: String },
}

/// A single recorded event.
#[derive(Debug, Clone, Serialize)]
pub struct MetricEvent {
    pub timestamp: SystemTime,
    pub source: String,
    pub kind: EventKind,
    pub duration: Option<Duration>,
}

/// Per-source totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub successes: u64,
    /// All failures, rejections included.
    pub failures: u64,
    /// Failures that never reached the downstream service.
    pub rejected: u64,
    pub state_changes: u64,
}

#[derive(Debug, Default)]
struct RecorderInner {
    events: VecDeque<MetricEvent>,
    summaries: HashMap<String, SourceSummary>,
}

/// Bounded, thread-safe event log.
#[derive(Debug)]
pub struct EventRecorder {
    inner: Mutex<RecorderInner>,
    capacity: usize,
}

impl EventRecorder {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(RecorderInner::default()),
            capacity: capacity.max(1),
        }
    }

    /// Copy of the retained events, oldest first.
    pub fn events(&self) -> Vec<MetricEvent> {
        self.lock().events.iter().cloned().collect()
    }

    /// Totals for `source`; counters are not bounded by the event capacity.
    pub fn summary(&self, source: &str) -> SourceSummary {
        self.lock().summaries.get(source).copied().unwrap_or_default()
    }

    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.events.clear();
        inner.summaries.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecorderInner> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn push(&self, source: &str, kind: EventKind, duration: Option<Duration>) {
        let mut inner = self.lock();
        let summary = inner.summaries.entry(source.to_string()).or_default();
        match &kind {
            EventKind::Success => summary.successes += 1,
            EventKind::Failure { kind } => {
                summary.failures += 1;
                if *kind == FailureKind::Rejected.as_str() {
                    summary.rejected += 1;
                }
            }
            EventKind::StateChange { .. } => summary.state_changes += 1,
        }

        if inner.events.len() == self.capacity {
            inner.events.pop_front();
        }
        inner.events.push_back(MetricEvent {
            timestamp: SystemTime::now(),
            source: source.to_string(),
            kind,
            duration,
        });
    }
}

impl Default for EventRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl MetricsSink for EventRecorder {
    fn record_success(&self, source: &str, duration: Duration) {
        metrics::record_call(source, "success", duration);
        self.push(source, EventKind::Success, Some(duration));
    }

    fn record_failure(&self, source: &str, duration: Duration, kind: FailureKind) {
        metrics::record_call(source, kind.as_str(), duration);
        self.push(source, EventKind::Failure { kind: kind.as_str() }, Some(duration));
    }

    fn record_state_change(&self, source: &str, new_state: &str) {
        metrics::record_state_change(source, new_state);
        self.push(
            source,
            EventKind::StateChange {
                new_state: new_state.to_string(),
            },
            None,
        );
    }
}
