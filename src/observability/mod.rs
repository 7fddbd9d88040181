//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! spawner / reaper / shutdown produce:
//!     → logging.rs (structured events with slot, pid, status)
//!     → metrics.rs (spawn, reap and failure counters)
//!
//! Consumers:
//!     → stdout, or the log file when daemonized
//!     → Prometheus scrape (optional)
//! ```

pub mod logging;
pub mod metrics;
