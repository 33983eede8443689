//! Simulated downstream services.
//!
//! Each call sleeps for a random latency and then fails with the configured
//! probability. The failure rate can be changed while calls are running.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::config::ServiceProfile;
use crate::downstream::{Downstream, DownstreamError};

/// A latency/failure generator standing in for a real dependency.
#[derive(Debug)]
pub struct SimulatedService {
    name: String,
    min_latency_ms: u64,
    max_latency_ms: u64,
    /// `f64` bits.
    failure_rate: AtomicU64,
}

impl SimulatedService {
    pub fn new(name: impl Into<String>, profile: &ServiceProfile) -> Self {
        Self {
            name: name.into(),
            min_latency_ms: profile.min_latency_ms,
            max_latency_ms: profile.max_latency_ms.max(profile.min_latency_ms),
            failure_rate: AtomicU64::new(profile.failure_rate.clamp(0.0, 1.0).to_bits()),
        }
    }

    pub fn failure_rate(&self) -> f64 {
        f64::from_bits(self.failure_rate.load(Ordering::Relaxed))
    }

    /// Change the failure probability for subsequent calls.
    pub fn set_failure_rate(&self, rate: f64) {
        let rate = rate.clamp(0.0, 1.0);
        self.failure_rate.store(rate.to_bits(), Ordering::Relaxed);
        tracing::info!(service = %self.name, failure_rate = rate, "Failure rate changed");
    }

    fn sample_latency(&self) -> Duration {
        let ms = if self.max_latency_ms > self.min_latency_ms {
            fastrand::u64(self.min_latency_ms..self.max_latency_ms)
        } else {
            self.min_latency_ms
        };
        Duration::from_millis(ms)
    }
}

impl Downstream for SimulatedService {
    async fn call(&self) -> Result<String, DownstreamError> {
        tokio::time::sleep(self.sample_latency()).await;

        let rate = self.failure_rate();
        if fastrand::f64() < rate {
            return Err(DownstreamError::new(
                self.name.clone(),
                format!("simulated failure (rate {:.0}%)", rate * 100.0),
            ));
        }
        Ok(format!("Success from {}", self.name))
    }
}
