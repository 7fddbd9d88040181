//! Command-line arguments.
//!
//! Flags override values read from `--config`, which override the defaults.

use std::path::PathBuf;

use clap::Parser;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::SupervisorConfig;
use crate::config::validation::validate_config;
use crate::error::EXIT_STARTUP_FAILURE;

#[derive(Debug, Parser)]
#[command(name = "worker-supervisor")]
#[command(about = "A forking supervisor that keeps a fixed pool of workers alive", long_about = None)]
pub struct Cli {
    /// Number of workers to spawn
    #[arg(short, long, value_name = "JOBS")]
    pub jobs: Option<usize>,

    /// Log to FILE when daemonized
    #[arg(short = 'f', long = "log-file", value_name = "FILE")]
    pub log_file: Option<String>,

    /// Detach from the terminal and run in the background
    #[arg(short, long)]
    pub daemonize: bool,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Cli {
    /// Build the effective configuration.
    pub fn resolve(self) -> Result<SupervisorConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => SupervisorConfig::default(),
        };

        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        if let Some(log_file) = self.log_file {
            config.log_path = log_file;
        }
        if self.daemonize {
            config.daemonize = true;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

/// Exit status for a command line clap refused to parse.
///
/// Requests for help or version text exit 0; any usage error exits 1.
pub fn usage_exit_code(err: &clap::Error) -> i32 {
    if err.use_stderr() {
        EXIT_STARTUP_FAILURE
    } else {
        0
    }
}
