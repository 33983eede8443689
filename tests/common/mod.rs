//! Shared utilities for integration tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use adaptive_breaker::downstream::{Downstream, DownstreamError, ServiceRoutes};
use adaptive_breaker::observability::{EventKind, EventRecorder, MetricEvent};

/// How a scripted service answers.
#[derive(Debug, Clone, Copy)]
#[allow(dead_code)]
pub enum Script {
    AlwaysSucceed,
    AlwaysFail,
    /// Succeeds on every `n`th call, fails otherwise.
    SucceedEvery(u64),
    /// Fails the first `n` calls, then succeeds.
    FailFirst(u64),
}

/// A downstream that follows a script and counts calls.
///
/// Zero latency unless built with `with_latency`.
#[derive(Debug)]
pub struct ScriptedService {
    name: &'static str,
    script: Script,
    latency: Duration,
    calls: AtomicU64,
}

#[allow(dead_code)]
impl ScriptedService {
    pub fn new(name: &'static str, script: Script) -> Arc<Self> {
        Self::with_latency(name, script, Duration::ZERO)
    }

    pub fn with_latency(name: &'static str, script: Script, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            name,
            script,
            latency,
            calls: AtomicU64::new(0),
        })
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Downstream for ScriptedService {
    async fn call(&self) -> Result<String, DownstreamError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let ok = match self.script {
            Script::AlwaysSucceed => true,
            Script::AlwaysFail => false,
            Script::SucceedEvery(every) => n % every == 0,
            Script::FailFirst(count) => n > count,
        };
        if ok {
            Ok(format!("{} ok", self.name))
        } else {
            Err(DownstreamError::new(self.name, "scripted failure"))
        }
    }
}

/// Primary/backup pair plus handles to both for call counting.
#[allow(dead_code)]
pub fn routes(
    primary: Script,
    backup: Script,
) -> (ServiceRoutes<ScriptedService>, Arc<ScriptedService>, Arc<ScriptedService>) {
    let primary = ScriptedService::new("primary", primary);
    let backup = ScriptedService::new("backup", backup);
    (ServiceRoutes::new(primary.clone(), backup.clone()), primary, backup)
}

/// Events from `source` matching `pred`.
#[allow(dead_code)]
pub fn events_from(
    recorder: &EventRecorder,
    source: &str,
    pred: impl Fn(&EventKind) -> bool,
) -> Vec<MetricEvent> {
    recorder
        .events()
        .into_iter()
        .filter(|e| e.source == source && pred(&e.kind))
        .collect()
}
