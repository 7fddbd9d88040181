//! Shutdown coordination for the supervisor.
//!
//! # Sequence
//! ```text
//! restore default dispositions   (no more restart triggers, no re-entry)
//!     → SIGTERM every Running worker
//!     → [grace period: poll, then SIGKILL whatever is left]
//!     → wait() until the kernel reports no children remain
//! ```
//!
//! # Design Decisions
//! - Completion is "no children left" (ECHILD), not a count match, so slots
//!   that never spawned are tolerated
//! - Without a grace period the wait blocks indefinitely
//! - Every reaped process is recorded, the caller exits only afterwards

use std::thread;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{wait, waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use crate::lifecycle::signals::SignalRouter;
use crate::observability::metrics;
use crate::worker::exit::WorkerExit;
use crate::worker::slot::{SlotId, SlotTable};

/// How often reaping is polled while a grace period is running.
const GRACE_POLL: Duration = Duration::from_millis(25);

/// Outcome of a completed shutdown.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Workers sent SIGTERM.
    pub signaled: usize,
    /// Workers sent SIGKILL after the grace period.
    pub forced: usize,
    /// Every process reaped; `None` slot means it was not in the table.
    pub reaped: Vec<(Option<SlotId>, Pid, WorkerExit)>,
    /// Pids still owned by Running slots when reaping finished.
    pub outstanding: Vec<Pid>,
}

impl ShutdownReport {
    /// True when no spawned worker was left unreaped.
    pub fn is_complete(&self) -> bool {
        self.outstanding.is_empty()
    }
}

/// Terminates and reaps every worker.
#[derive(Debug, Clone, Default)]
pub struct ShutdownCoordinator {
    grace: Option<Duration>,
}

impl ShutdownCoordinator {
    pub fn new(grace: Option<Duration>) -> Self {
        Self { grace }
    }

    /// Run the shutdown sequence to completion. Blocks the calling thread.
    pub fn run(&self, table: &mut SlotTable, router: &SignalRouter) -> ShutdownReport {
        let mut report = ShutdownReport::default();

        if let Err(e) = router.restore() {
            tracing::error!(error = %e, "Failed to reset signal handlers, continuing shutdown");
        }

        tracing::info!(workers = table.running_count(), "Termination requested, stopping workers");
        report.signaled = broadcast(table, Signal::SIGTERM);

        if let Some(grace) = self.grace {
            let drained = reap_until(table, Instant::now() + grace, &mut report);
            if !drained && !table.outstanding().is_empty() {
                tracing::warn!(
                    grace_secs = grace.as_secs_f64(),
                    remaining = table.outstanding().len(),
                    "Grace period elapsed, killing remaining workers"
                );
                report.forced = broadcast(table, Signal::SIGKILL);
            }
        }

        reap_all(table, &mut report);

        report.outstanding = table.outstanding();
        metrics::record_running(table.running_count());

        if report.is_complete() {
            tracing::info!(reaped = report.reaped.len(), "All workers reaped, shutting down");
        } else {
            tracing::error!(outstanding = ?report.outstanding, "Workers left unreaped at shutdown");
        }

        report
    }
}

/// Send `signal` to every Running worker, returning how many were signaled.
fn broadcast(table: &SlotTable, signal: Signal) -> usize {
    let mut sent = 0;

    for slot in table.iter().filter(|slot| slot.is_running()) {
        let Some(pid) = slot.pid() else { continue };

        match kill(pid, signal) {
            Ok(()) => sent += 1,
            Err(Errno::ESRCH) => {
                tracing::debug!(slot = %slot.id(), pid = %pid, "Worker already gone");
            }
            Err(e) => {
                tracing::warn!(slot = %slot.id(), pid = %pid, signal = %signal, error = %e, "Failed to signal worker");
            }
        }
    }

    sent
}

fn record(table: &mut SlotTable, status: WaitStatus, report: &mut ShutdownReport) {
    let Some((pid, exit)) = WorkerExit::from_wait_status(status) else {
        return;
    };

    let slot = table.find_running_mut(pid).map(|slot| {
        slot.mark_terminated();
        slot.id()
    });

    match slot {
        Some(id) => tracing::info!(slot = %id, pid = %pid, status = %exit, "Reaped worker"),
        None => tracing::debug!(pid = %pid, status = %exit, "Reaped untracked child"),
    }
    report.reaped.push((slot, pid, exit));
}

/// Poll for exits until the deadline. Returns true once no children remain.
fn reap_until(table: &mut SlotTable, deadline: Instant, report: &mut ShutdownReport) -> bool {
    let any_child = Pid::from_raw(-1);

    loop {
        match waitpid(any_child, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => {
                if Instant::now() >= deadline {
                    return false;
                }
                thread::sleep(GRACE_POLL);
            }
            Ok(status) => record(table, status, report),
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => return true,
            Err(e) => {
                tracing::error!(error = %e, "waitpid failed during grace period");
                return false;
            }
        }
    }
}

/// Block until the kernel reports there are no children left.
fn reap_all(table: &mut SlotTable, report: &mut ShutdownReport) {
    loop {
        match wait() {
            Ok(status) => record(table, status, report),
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => break,
            Err(e) => {
                tracing::error!(error = %e, "wait failed during shutdown");
                break;
            }
        }
    }
}
