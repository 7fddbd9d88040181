//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges. Every failing rule
//! is reported, not just the first.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{SupervisorConfig, MAX_JOBS};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("jobs must be between 1 and {max}, got {got}")]
    JobsOutOfRange { got: usize, max: usize },

    #[error("workload.tick_ms must be greater than zero")]
    ZeroTick,

    #[error("workload.exit_one_in must be greater than zero")]
    ZeroExitOdds,

    #[error("log_path must not be empty")]
    EmptyLogPath,

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("unknown log level '{0}'")]
    LogLevel(String),
}

/// Validate a configuration, collecting every failure.
pub fn validate_config(config: &SupervisorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.jobs == 0 || config.jobs > MAX_JOBS {
        errors.push(ValidationError::JobsOutOfRange {
            got: config.jobs,
            max: MAX_JOBS,
        });
    }

    if config.workload.tick_ms == 0 {
        errors.push(ValidationError::ZeroTick);
    }

    if config.workload.exit_one_in == 0 {
        errors.push(ValidationError::ZeroExitOdds);
    }

    if config.log_path.is_empty() {
        errors.push(ValidationError::EmptyLogPath);
    }

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::MetricsAddress(addr.clone()));
        }
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
