//! Supervision engine.
//!
//! # Data Flow
//! ```text
//! Starting:
//!     spawn slot 0..jobs (worker::spawner) → install signal routing
//!
//! Running (engine.rs event loop):
//!     Trigger(Restart)  → reaper.rs: poll every slot → policy.rs → respawn
//!     Trigger(Shutdown) → lifecycle::shutdown → Terminated
//! ```
//!
//! # Design Decisions
//! - Signal handlers only enqueue triggers; scanning, logging and forking
//!   happen in the supervisor's own task
//! - The slot table is owned by the Supervisor and has a single writer
//! - Restart attempts are unbounded unless a policy says otherwise

pub mod engine;
pub mod policy;
pub mod reaper;
pub mod state;

pub use engine::Supervisor;
pub use policy::{AlwaysRespawn, RestartDecision, RestartPolicy};
pub use reaper::{reap_and_restart, ReapReport};
pub use state::SupervisorState;
