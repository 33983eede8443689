//! Downstream service abstraction.
//!
//! # Responsibilities
//! - Define the single operation a downstream dependency offers
//! - Hold the primary/backup pair and select one by [`ServicePath`]
//!
//! # Design Decisions
//! - Exactly two paths; selection is a match on the tag, never type inspection
//! - Latency is opaque to callers; they only time the call

pub mod simulated;

use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

pub use crate::learning::ServicePath;
pub use simulated::SimulatedService;

/// Failure reported by a downstream service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{service} failed: {message}")]
pub struct DownstreamError {
    pub service: String,
    pub message: String,
}

impl DownstreamError {
    pub fn new(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            message: message.into(),
        }
    }
}

/// A dependency that performs one unit of work per call.
pub trait Downstream: Send + Sync + 'static {
    fn call(&self) -> impl Future<Output = Result<String, DownstreamError>> + Send;
}

/// The primary and backup instances.
#[derive(Debug)]
pub struct ServiceRoutes<S> {
    primary: Arc<S>,
    backup: Arc<S>,
}

impl<S> Clone for ServiceRoutes<S> {
    fn clone(&self) -> Self {
        Self {
            primary: self.primary.clone(),
            backup: self.backup.clone(),
        }
    }
}

impl<S: Downstream> ServiceRoutes<S> {
    pub fn new(primary: Arc<S>, backup: Arc<S>) -> Self {
        Self { primary, backup }
    }

    pub fn get(&self, path: ServicePath) -> &Arc<S> {
        match path {
            ServicePath::Primary => &self.primary,
            ServicePath::Backup => &self.backup,
        }
    }

    pub fn primary(&self) -> &Arc<S> {
        &self.primary
    }

    pub fn backup(&self) -> &Arc<S> {
        &self.backup
    }
}
