//! Call outcomes and error definitions shared by both controllers.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::downstream::DownstreamError;
use crate::resilience::circuit_breaker::BreakerState;

/// Why a protected call did not succeed.
#[derive(Debug, Clone, Error)]
pub enum CallError {
    /// The breaker refused the call; the downstream service was never invoked.
    #[error("circuit '{breaker}' is {state}: call rejected")]
    Rejected { breaker: String, state: BreakerState },

    /// The downstream service was invoked and reported failure.
    #[error("downstream failure: {0}")]
    Downstream(#[from] DownstreamError),

    /// The downstream service did not answer within the call deadline.
    #[error("downstream call timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

/// Failure classification reported to the metrics sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Rejected,
    Downstream,
    Timeout,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Rejected => "rejected",
            FailureKind::Downstream => "downstream",
            FailureKind::Timeout => "timeout",
        }
    }
}

impl CallError {
    pub fn kind(&self) -> FailureKind {
        match self {
            CallError::Rejected { .. } => FailureKind::Rejected,
            CallError::Downstream(_) => FailureKind::Downstream,
            CallError::Timeout(_) => FailureKind::Timeout,
        }
    }

    /// True when the call never reached the downstream service.
    pub fn is_rejection(&self) -> bool {
        matches!(self, CallError::Rejected { .. })
    }
}

/// Result type for protected calls.
pub type CallResult<T> = Result<T, CallError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CallError::Rejected {
            breaker: "StaticCB".into(),
            state: BreakerState::Open,
        };
        assert_eq!(err.to_string(), "circuit 'StaticCB' is Open: call rejected");
        assert!(err.is_rejection());

        let err = CallError::Timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "downstream call timed out after 1500ms");
        assert_eq!(err.kind(), FailureKind::Timeout);

        let err = CallError::from(DownstreamError::new("primary", "boom"));
        assert!(err.to_string().contains("boom"));
        assert!(!err.is_rejection());
    }

    #[test]
    fn test_failure_kind_serializes_as_label() {
        for kind in [FailureKind::Rejected, FailureKind::Downstream, FailureKind::Timeout] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }
}
