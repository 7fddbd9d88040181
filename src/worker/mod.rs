//! Worker subsystem.
//!
//! # Data Flow
//! ```text
//! Spawn (spawner.rs):
//!     fork
//!     → parent: record pid in slot.rs, slot → Running
//!     → child: restore signal defaults → workload.rs payload → _exit(status)
//! ```
//!
//! # Design Decisions
//! - One slot per configured job, ids stable for the supervisor's lifetime
//! - Only the spawner moves a slot to Running
//! - The payload is opaque to the supervisor

pub mod exit;
pub mod slot;
pub mod spawner;
pub mod workload;

pub use exit::WorkerExit;
pub use slot::{CapacityError, SlotId, SlotState, SlotTable, WorkerSlot};
pub use spawner::{SpawnError, WorkerSpawner, EXIT_RESTORE_FAILED};
pub use workload::{RandomExit, Workload};
