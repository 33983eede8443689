//! Fixed-policy circuit breaker used as the comparison baseline.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::config::StaticBreakerConfig;
use crate::downstream::Downstream;
use crate::observability::MetricsSink;
use crate::resilience::timeouts::with_deadline;
use crate::resilience::{BreakerState, CallResult, CircuitBreaker, FailureKind};

/// Metrics source for the static controller.
pub const STATIC_SOURCE: &str = "StaticCB";

/// Primary path only, one breaker, no learning.
pub struct StaticController<S> {
    service: Arc<S>,
    breaker: Mutex<CircuitBreaker>,
    sink: Arc<dyn MetricsSink>,
    call_timeout: Duration,
}

impl<S: Downstream> StaticController<S> {
    pub fn new(
        service: Arc<S>,
        config: &StaticBreakerConfig,
        sink: Arc<dyn MetricsSink>,
        call_timeout: Duration,
    ) -> Self {
        let breaker = CircuitBreaker::new(
            "static",
            STATIC_SOURCE,
            config.failure_threshold,
            Duration::from_secs(config.break_duration_secs),
            sink.clone(),
        );
        Self {
            service,
            breaker: Mutex::new(breaker),
            sink,
            call_timeout,
        }
    }

    /// Call the primary service through the breaker.
    ///
    /// The breaker lock is never held across the call; the half-open trial
    /// flag keeps concurrent calls from doubling up on a trial. If this
    /// future is dropped during a trial call, the trial is released.
    pub async fn execute(&self) -> CallResult<String> {
        let start = Instant::now();

        let (admitted, is_trial) = {
            let mut breaker = self.breaker();
            let admitted = breaker.try_acquire();
            (admitted, breaker.state() == BreakerState::HalfOpen)
        };
        if let Err(rejected) = admitted {
            self.sink
                .record_failure(STATIC_SOURCE, start.elapsed(), FailureKind::Rejected);
            return Err(rejected);
        }

        let mut trial = TrialGuard {
            breaker: &self.breaker,
            armed: is_trial,
        };
        let result = with_deadline(self.call_timeout, self.service.call()).await;
        trial.armed = false;
        let elapsed = start.elapsed();

        match &result {
            Ok(_) => {
                self.breaker().record_success();
                self.sink.record_success(STATIC_SOURCE, elapsed);
            }
            Err(e) => {
                self.breaker().record_failure();
                self.sink.record_failure(STATIC_SOURCE, elapsed, e.kind());
            }
        }
        result
    }

    pub fn state(&self) -> BreakerState {
        self.breaker().state()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.breaker().consecutive_failures()
    }

    fn breaker(&self) -> MutexGuard<'_, CircuitBreaker> {
        self.breaker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases an admitted half-open trial when the call is abandoned.
struct TrialGuard<'a> {
    breaker: &'a Mutex<CircuitBreaker>,
    armed: bool,
}

impl Drop for TrialGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.breaker
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .release_trial();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downstream::DownstreamError;
    use crate::observability::EventRecorder;
    use crate::resilience::CallError;

    struct Down;

    impl Downstream for Down {
        async fn call(&self) -> Result<String, DownstreamError> {
            Err(DownstreamError::new("primary", "down"))
        }
    }

    #[tokio::test]
    async fn test_opens_after_three_failures_then_rejects() {
        let recorder = Arc::new(EventRecorder::default());
        let ctl = StaticController::new(
            Arc::new(Down),
            &StaticBreakerConfig::default(),
            recorder.clone(),
            Duration::from_secs(1),
        );

        for _ in 0..3 {
            assert!(matches!(ctl.execute().await, Err(CallError::Downstream(_))));
        }
        assert_eq!(ctl.state(), BreakerState::Open);

        assert!(matches!(ctl.execute().await, Err(CallError::Rejected { .. })));

        let summary = recorder.summary(STATIC_SOURCE);
        assert_eq!(summary.failures, 4);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.state_changes, 1);
    }
}
