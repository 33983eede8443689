//! Learning subsystem.
//!
//! # Data Flow
//! ```text
//! Call outcome + latency
//!     → window.rs (per-path failure rates, latest latency bucket)
//!     → state.rs (breaker state + rates + latency → state index)
//!     → agent.rs (epsilon-greedy action, Bellman update)
//!
//! Optional:
//!     agent.rs table → persistence.rs (JSON on disk)
//! ```
//!
//! # Design Decisions
//! - State space is tiny (96 x 7), so the table is dense
//! - Encoding is fixed; persisted tables depend on it
//! - Only the update rule writes to the table

pub mod action;
pub mod agent;
pub mod persistence;
pub mod state;
pub mod window;

pub use action::{Action, InvalidAction, ServicePath, NUM_ACTIONS};
pub use agent::{Agent, QTable, QTableSnapshot, TableError};
pub use state::{LatencyCategory, Observation, NUM_STATES};
pub use window::{OutcomeWindow, PathWindows};
