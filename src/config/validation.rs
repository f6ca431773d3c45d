//! Configuration validation.
//!
//! # Responsibilities
//! - Report option values that failed to parse
//! - Validate value ranges (timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before the listener is bound

use std::time::Duration;
use thiserror::Error;

use crate::config::schema::{keys, ServerConfig};

/// A single problem with a configuration option.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{key}: '{value}' is not a valid port")]
    InvalidPort { key: &'static str, value: String },

    #[error("{key}: '{value}' is not a valid duration")]
    InvalidDuration { key: &'static str, value: String },

    #[error("{key}: must be greater than zero")]
    ZeroDuration { key: &'static str },

    #[error("{key}: host must not contain whitespace")]
    InvalidHost { key: &'static str },
}

/// Check semantic constraints on an already-parsed configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.host.chars().any(char::is_whitespace) {
        errors.push(ValidationError::InvalidHost { key: keys::HOST });
    }

    let durations: [(&'static str, Duration); 4] = [
        (keys::READ_TIMEOUT, config.read_timeout),
        (keys::WRITE_TIMEOUT, config.write_timeout),
        (keys::IDLE_TIMEOUT, config.idle_timeout),
        (keys::SHUTDOWN_DEADLINE, config.shutdown_deadline),
    ];
    for (key, value) in durations {
        if value.is_zero() {
            errors.push(ValidationError::ZeroDuration { key });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
