//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap downstream calls with a deadline
//! - Cancel the call future cleanly on expiry
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from downstream failures but count as
//!   failures for the breaker and the learning loop

use std::future::Future;
use std::time::Duration;

use crate::downstream::DownstreamError;
use crate::resilience::types::{CallError, CallResult};

/// Run `call` with a deadline.
pub async fn with_deadline<F, T>(deadline: Duration, call: F) -> CallResult<T>
where
    F: Future<Output = Result<T, DownstreamError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(CallError::Downstream(e)),
        Err(_) => {
            tracing::warn!(deadline_ms = deadline.as_millis() as u64, "Downstream call timed out");
            Err(CallError::Timeout(deadline))
        }
    }
}
