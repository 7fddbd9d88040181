//! Worker process creation.
//!
//! # Responsibilities
//! - Fork one worker for a given slot
//! - Record the child's pid in the slot (parent side)
//! - Restore default signal dispositions before the payload runs (child side)
//!
//! # Design Decisions
//! - The child never returns into supervisor code; it leaves through `_exit`
//! - A child that cannot restore dispositions exits with `EXIT_RESTORE_FAILED`
//! - A failed fork leaves the slot untouched apart from its failure counter

use std::sync::Arc;

use nix::errno::Errno;
use nix::unistd::{self, ForkResult, Pid};
use thiserror::Error;

use crate::lifecycle::signals::SignalRouter;
use crate::observability::metrics;
use crate::worker::slot::{SlotId, SlotTable};
use crate::worker::workload::Workload;

/// Exit status of a worker that could not reset its signal dispositions.
pub const EXIT_RESTORE_FAILED: i32 = 71;

/// Errors from creating a worker process.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("slot {0} does not exist")]
    UnknownSlot(SlotId),

    #[error("fork failed for slot {slot}: {source}")]
    Fork {
        slot: SlotId,
        #[source]
        source: Errno,
    },
}

/// Creates worker processes running a shared payload.
pub struct WorkerSpawner {
    workload: Arc<dyn Workload>,
}

impl WorkerSpawner {
    pub fn new(workload: Arc<dyn Workload>) -> Self {
        Self { workload }
    }

    /// Fork a worker for `slot` and mark the slot Running.
    pub fn spawn(
        &self,
        slot: SlotId,
        table: &mut SlotTable,
        router: &SignalRouter,
    ) -> Result<Pid, SpawnError> {
        let entry = table.get_mut(slot).ok_or(SpawnError::UnknownSlot(slot))?;

        // SAFETY: the child only resets signal dispositions, runs the payload
        // and leaves through `_exit`, never touching the parent's runtime.
        match unsafe { unistd::fork() } {
            Ok(ForkResult::Parent { child }) => {
                entry.mark_running(child);
                tracing::info!(slot = %slot, pid = %child, "Spawning worker");
                metrics::record_spawn(slot);
                Ok(child)
            }
            Ok(ForkResult::Child) => self.run_child(slot, router),
            Err(source) => {
                entry.record_spawn_failure();
                metrics::record_spawn_failure(slot);
                Err(SpawnError::Fork { slot, source })
            }
        }
    }

    fn run_child(&self, slot: SlotId, router: &SignalRouter) -> ! {
        if let Err(e) = router.restore() {
            tracing::error!(slot = %slot, error = %e, "Worker could not reset signal handlers");
            exit_immediately(EXIT_RESTORE_FAILED);
        }

        let status = self.workload.run(slot);
        exit_immediately(status)
    }
}

/// Leave the child without running the parent's exit handlers or destructors.
fn exit_immediately(status: i32) -> ! {
    // SAFETY: `_exit` only terminates the calling process.
    unsafe { libc::_exit(status) }
}

impl std::fmt::Debug for WorkerSpawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerSpawner").finish_non_exhaustive()
    }
}
