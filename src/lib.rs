//! Adaptive circuit breaker library.
//!
//! A Q-learning agent chooses, per request, which breaker policy guards the
//! call and whether it goes to the primary or the backup service. A static
//! breaker runs next to it for comparison.

pub mod config;
pub mod controller;
pub mod downstream;
pub mod learning;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod simulation;

pub use config::schema::SimulationConfig;
pub use controller::{AdaptiveController, StaticController};
pub use lifecycle::Shutdown;
pub use simulation::Simulation;
