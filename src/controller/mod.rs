//! Request controllers.
//!
//! # Data Flow
//! ```text
//! tick
//!     → baseline.rs  (primary only, fixed breaker)
//!     → adaptive.rs  (observe → choose → apply → execute → reward → record → learn)
//!         → resilience (policy breakers, call deadline)
//!         → learning   (windows, state encoder, agent)
//! ```
//!
//! # Design Decisions
//! - Both controllers report through the same `MetricsSink` under different sources
//! - Errors are returned only after they have been recorded and learned from

pub mod adaptive;
pub mod baseline;

pub use adaptive::{AdaptiveController, AdaptiveOptions, AdaptiveView, ADAPTIVE_SOURCE};
pub use baseline::{StaticController, STATIC_SOURCE};
pub use crate::resilience::{CallError, CallResult};
