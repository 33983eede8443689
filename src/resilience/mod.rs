//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to downstream:
//!     → circuit_breaker.rs (admit, or reject while open)
//!     → timeouts.rs (enforce the call deadline)
//!     → circuit_breaker.rs (record outcome, maybe transition)
//!
//! Adaptive side:
//!     policy.rs holds one breaker per policy action; the agent picks the active one
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every downstream call has a deadline
//! - Rejections never reach the downstream service and are reported as such
//! - Breakers are plain values owned by their controller

pub mod circuit_breaker;
pub mod policy;
pub mod timeouts;
pub mod types;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use policy::{PolicySet, PolicySlot};
pub use types::{CallError, CallResult, FailureKind};
