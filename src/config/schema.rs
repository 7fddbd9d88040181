//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the supervisor.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Largest worker count the slot table accepts.
pub const MAX_JOBS: usize = 255;

/// Root configuration for the supervisor.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Number of worker processes to keep alive.
    pub jobs: usize,

    /// Detach from the controlling terminal before starting.
    pub daemonize: bool,

    /// File receiving stdin/stdout/stderr when daemonized.
    pub log_path: String,

    /// Shutdown sequencing settings.
    pub shutdown: ShutdownConfig,

    /// Placeholder payload settings.
    pub workload: WorkloadConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            jobs: 2,
            daemonize: false,
            log_path: "/dev/null".to_string(),
            shutdown: ShutdownConfig::default(),
            workload: WorkloadConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Seconds to wait for workers after SIGTERM before sending SIGKILL.
    /// `None` waits indefinitely.
    pub grace_secs: Option<u64>,
}

/// Settings for the random-exit placeholder payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Length of one payload tick in milliseconds.
    pub tick_ms: u64,

    /// The payload exits with probability 1/`exit_one_in` per tick.
    pub exit_one_in: u32,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            tick_ms: 1000,
            exit_one_in: 20,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Prometheus exporter bind address. Disabled when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_address: None,
        }
    }
}
