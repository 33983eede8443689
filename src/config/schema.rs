//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a simulation run.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Fixed-policy baseline breaker.
    pub static_breaker: StaticBreakerConfig,

    /// Q-learning hyperparameters.
    pub agent: AgentConfig,

    /// Primary (fast, unreliable) downstream profile.
    pub primary: ServiceProfile,

    /// Backup (slow, reliable) downstream profile.
    pub backup: ServiceProfile,

    /// Tick cadence and call deadline.
    pub simulation: RunConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            static_breaker: StaticBreakerConfig::default(),
            agent: AgentConfig::default(),
            primary: ServiceProfile::primary(),
            backup: ServiceProfile::backup(),
            simulation: RunConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Baseline breaker settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticBreakerConfig {
    /// Consecutive failures before opening.
    pub failure_threshold: u32,

    /// Seconds to stay open before the trial call.
    pub break_duration_secs: u64,
}

impl Default for StaticBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            break_duration_secs: 10,
        }
    }
}

/// Agent hyperparameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Alpha.
    pub learning_rate: f64,

    /// Gamma.
    pub discount_factor: f64,

    /// Initial epsilon.
    pub exploration_rate: f64,

    /// Epsilon used in training mode.
    pub training_exploration: f64,

    /// Epsilon used in exploit mode.
    pub exploit_exploration: f64,

    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount_factor: 0.9,
            exploration_rate: 0.3,
            training_exploration: 0.3,
            exploit_exploration: 0.05,
            seed: None,
        }
    }
}

/// Latency and failure characteristics of a simulated service.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServiceProfile {
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    /// Probability in `[0, 1]` that a call fails.
    pub failure_rate: f64,
}

impl ServiceProfile {
    pub fn primary() -> Self {
        Self {
            min_latency_ms: 100,
            max_latency_ms: 400,
            failure_rate: 0.1,
        }
    }

    pub fn backup() -> Self {
        Self {
            min_latency_ms: 300,
            max_latency_ms: 500,
            failure_rate: 0.01,
        }
    }
}

/// Driver loop settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RunConfig {
    /// Delay between ticks in milliseconds.
    pub tick_interval_ms: u64,

    /// Deadline for a single downstream call in milliseconds.
    pub call_timeout_ms: u64,

    /// Stop after this many ticks (runs until shutdown when unset).
    pub max_ticks: Option<u64>,

    /// Q-table file loaded at startup and saved at exit.
    pub table_path: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 250,
            call_timeout_ms: 2000,
            max_ticks: None,
            table_path: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log format ("plain" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// Events kept by the in-process recorder.
    pub event_capacity: usize,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "plain".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
            event_capacity: 200,
        }
    }
}
