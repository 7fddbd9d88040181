//! Reap exited workers and respawn their slots.
//!
//! # Responsibilities
//! - Poll every slot without blocking on each restart trigger
//! - Move exited slots to Dead and hand them to the restart policy
//! - Retry slots left Dead by an earlier failed spawn
//!
//! # Design Decisions
//! - One trigger may stand for many exits, so every pass scans the whole table
//! - Liveness and spawn errors are isolated to their slot and logged
//! - A slot skipped this pass is picked up by the next trigger

use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use crate::lifecycle::signals::SignalRouter;
use crate::observability::metrics;
use crate::supervisor::policy::{RestartDecision, RestartPolicy};
use crate::worker::exit::WorkerExit;
use crate::worker::slot::{SlotId, SlotState, SlotTable};
use crate::worker::spawner::WorkerSpawner;

/// What one pass observed and did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReapReport {
    /// Workers found exited this pass.
    pub reaped: Vec<(SlotId, Pid, WorkerExit)>,
    /// Slots given a new process.
    pub respawned: Vec<(SlotId, Pid)>,
    /// Slots whose fork failed; they stay Dead.
    pub spawn_failures: Vec<SlotId>,
    /// Slots the policy chose not to respawn yet.
    pub deferred: Vec<SlotId>,
    /// Slots whose liveness query errored.
    pub liveness_errors: Vec<SlotId>,
}

impl ReapReport {
    pub fn is_quiet(&self) -> bool {
        self.reaped.is_empty()
            && self.respawned.is_empty()
            && self.spawn_failures.is_empty()
            && self.deferred.is_empty()
            && self.liveness_errors.is_empty()
    }
}

/// Scan the whole table once, reaping and respawning as needed.
pub fn reap_and_restart(
    table: &mut SlotTable,
    spawner: &WorkerSpawner,
    router: &SignalRouter,
    policy: &mut dyn RestartPolicy,
) -> ReapReport {
    let mut report = ReapReport::default();
    let ids: Vec<SlotId> = table.ids().collect();

    for id in ids {
        let Some(slot) = table.get(id) else { continue };

        match (slot.state(), slot.pid()) {
            (SlotState::Running, Some(pid)) => match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => continue,
                Ok(status) => match WorkerExit::from_wait_status(status) {
                    Some((_, exit)) => {
                        if let Some(slot) = table.get_mut(id) {
                            slot.mark_dead();
                        }
                        tracing::info!(slot = %id, pid = %pid, status = %exit, "Reaped dead worker");
                        metrics::record_reap(id);
                        report.reaped.push((id, pid, exit));
                    }
                    None => {
                        tracing::debug!(slot = %id, pid = %pid, status = ?status, "Worker changed state but is still alive");
                        continue;
                    }
                },
                Err(errno) => {
                    tracing::warn!(slot = %id, pid = %pid, error = %errno, "Liveness query failed, skipping slot this pass");
                    metrics::record_liveness_error();
                    report.liveness_errors.push(id);
                    continue;
                }
            },
            (SlotState::Dead, _) | (SlotState::Unspawned, _) => {}
            _ => continue,
        }

        let failures = table.get(id).map_or(0, |slot| slot.consecutive_failures());
        if policy.decide(id, failures) == RestartDecision::Defer {
            tracing::debug!(slot = %id, consecutive_failures = failures, "Respawn deferred by policy");
            report.deferred.push(id);
            continue;
        }

        match spawner.spawn(id, table, router) {
            Ok(pid) => report.respawned.push((id, pid)),
            Err(e) => {
                tracing::error!(slot = %id, error = %e, "Respawn failed, slot stays dead until next pass");
                report.spawn_failures.push(id);
            }
        }
    }

    metrics::record_running(table.running_count());
    report
}
