//! Simulation subsystem.
//!
//! # Data Flow
//! ```text
//! main
//!     → orchestrator.rs (tick loop: static + adaptive, concurrently)
//!     → scenario.rs (optional: changes primary failure rate over time, then shuts down)
//!     → RunSummary (logged at exit)
//! ```

pub mod orchestrator;
pub mod scenario;

pub use orchestrator::{CallOutcome, RunSummary, Simulation, Tally, TickReport};
pub use scenario::{run_scenario, Scenario, ScenarioStep};
