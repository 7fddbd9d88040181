//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Daemonize (daemon.rs):
//!     fork → detach → redirect streams → new session
//!
//! Signals (signals.rs):
//!     SIGCHLD → Trigger(Restart) → reap pass
//!     SIGTERM/SIGINT → Trigger(Shutdown) → shutdown sequence
//!
//! Shutdown (shutdown.rs):
//!     Restore defaults → SIGTERM workers → reap until no children remain
//! ```
//!
//! # Design Decisions
//! - Signal routing is installed only after every initial worker exists
//! - Shutdown disables the restart trigger before signaling any worker
//! - Shutdown waits by default; a grace period with SIGKILL is opt-in

pub mod daemon;
pub mod shutdown;
pub mod signals;

pub use daemon::{detach, DaemonError, Detached};
pub use shutdown::{ShutdownCoordinator, ShutdownReport};
pub use signals::{SignalBinding, SignalError, SignalRole, SignalRouter, Trigger, SUPERVISOR_BINDINGS};
