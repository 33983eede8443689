//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → simulation loop exits after the current tick
//!             → scenario driver stops
//!             → main saves the table and logs the summary
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: finish tick, persist, report
//! - A scenario that runs to completion triggers the same shutdown path

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
