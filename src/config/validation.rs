//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (rates in [0, 1], durations > 0)
//! - Check cross-field consistency (latency min <= max)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SimulationConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{ServiceProfile, SimulationConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn check_unit(errors: &mut Vec<ValidationError>, field: &str, value: f64) {
    if !(0.0..=1.0).contains(&value) {
        errors.push(ValidationError::new(
            field,
            format!("must be within [0, 1], got {value}"),
        ));
    }
}

fn check_profile(errors: &mut Vec<ValidationError>, name: &str, profile: &ServiceProfile) {
    if profile.min_latency_ms > profile.max_latency_ms {
        errors.push(ValidationError::new(
            format!("{name}.min_latency_ms"),
            format!(
                "must not exceed max_latency_ms ({} > {})",
                profile.min_latency_ms, profile.max_latency_ms
            ),
        ));
    }
    check_unit(errors, &format!("{name}.failure_rate"), profile.failure_rate);
}

/// Validate a parsed configuration.
pub fn validate_config(config: &SimulationConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.static_breaker.failure_threshold == 0 {
        errors.push(ValidationError::new(
            "static_breaker.failure_threshold",
            "must be at least 1",
        ));
    }
    if config.static_breaker.break_duration_secs == 0 {
        errors.push(ValidationError::new(
            "static_breaker.break_duration_secs",
            "must be greater than 0",
        ));
    }

    let agent = &config.agent;
    if !(agent.learning_rate > 0.0 && agent.learning_rate <= 1.0) {
        errors.push(ValidationError::new(
            "agent.learning_rate",
            format!("must be within (0, 1], got {}", agent.learning_rate),
        ));
    }
    check_unit(&mut errors, "agent.discount_factor", agent.discount_factor);
    check_unit(&mut errors, "agent.exploration_rate", agent.exploration_rate);
    check_unit(&mut errors, "agent.training_exploration", agent.training_exploration);
    check_unit(&mut errors, "agent.exploit_exploration", agent.exploit_exploration);

    check_profile(&mut errors, "primary", &config.primary);
    check_profile(&mut errors, "backup", &config.backup);

    if config.simulation.tick_interval_ms == 0 {
        errors.push(ValidationError::new(
            "simulation.tick_interval_ms",
            "must be greater than 0",
        ));
    }
    if config.simulation.call_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "simulation.call_timeout_ms",
            "must be greater than 0",
        ));
    }

    let obs = &config.observability;
    if !matches!(obs.log_format.as_str(), "plain" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            format!("expected \"plain\" or \"json\", got {:?}", obs.log_format),
        ));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("not a socket address: {}", obs.metrics_address),
        ));
    }
    if obs.event_capacity == 0 {
        errors.push(ValidationError::new(
            "observability.event_capacity",
            "must be at least 1",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&SimulationConfig::default()).is_ok());
    }

    #[test]
    fn test_inverted_latency_range() {
        let mut config = SimulationConfig::default();
        config.backup.min_latency_ms = 900;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "backup.min_latency_ms");
    }

    #[test]
    fn test_bad_metrics_address_only_when_enabled() {
        let mut config = SimulationConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "observability.metrics_address");
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = SimulationConfig::default();
        config.static_breaker.failure_threshold = 0;
        config.primary.failure_rate = 1.2;
        config.observability.log_format = "xml".into();
        assert_eq!(validate_config(&config).unwrap_err().len(), 3);
    }
}
