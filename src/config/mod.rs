//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults
//!     → loader.rs (optional TOML file)
//!     → cli.rs (command-line overrides)
//!     → validation.rs (range checks, capacity)
//!     → SupervisorConfig (validated, immutable)
//!     → owned by the Supervisor aggregate
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the supervisor starts
//! - All fields have defaults to allow an empty file or no file at all
//! - Oversized worker counts are rejected, never truncated

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;

pub use cli::{usage_exit_code, Cli};
pub use loader::{load_config, ConfigError};
pub use schema::{ObservabilityConfig, ShutdownConfig, SupervisorConfig, WorkloadConfig, MAX_JOBS};
pub use validation::{validate_config, ValidationError};
