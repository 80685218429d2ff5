//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (interval > 0, non-empty URLs and method lists)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SimulatorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::SimulatorConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("stream.interval_ms must be greater than zero")]
    ZeroStreamInterval,

    #[error("unknown log level '{0}'")]
    UnknownLogLevel(String),
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &SimulatorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.api.default_endpoint_url.trim().is_empty() {
        errors.push(ValidationError::EmptyField("api.default_endpoint_url"));
    }
    if config.api.default_methods.is_empty() {
        errors.push(ValidationError::EmptyField("api.default_methods"));
    }
    if config.queue.endpoint_url.trim().is_empty() {
        errors.push(ValidationError::EmptyField("queue.endpoint_url"));
    }
    if config.queue.methods.is_empty() {
        errors.push(ValidationError::EmptyField("queue.methods"));
    }
    if config.stream.interval_ms == 0 {
        errors.push(ValidationError::ZeroStreamInterval);
    }
    let level = config.observability.log_level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(config.observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
