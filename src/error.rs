//! Supervisor-level error taxonomy and exit codes.

use thiserror::Error;

use crate::config::ConfigError;
use crate::lifecycle::{DaemonError, SignalError};
use crate::worker::{CapacityError, SpawnError};

/// Exit status for any startup failure.
pub const EXIT_STARTUP_FAILURE: i32 = 1;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Capacity(#[from] CapacityError),

    #[error("initial spawn failed: {0}")]
    Spawn(#[from] SpawnError),

    #[error("signal routing failed: {0}")]
    Signal(#[from] SignalError),

    #[error(transparent)]
    Daemon(#[from] DaemonError),

    #[error("supervisor is {current}, cannot {action}")]
    InvalidState {
        current: crate::supervisor::SupervisorState,
        action: &'static str,
    },
}

impl SupervisorError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            SupervisorError::Daemon(e) => e.exit_code(),
            _ => EXIT_STARTUP_FAILURE,
        }
    }
}
