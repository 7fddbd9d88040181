//! Process-level tests for spawning, reaping, respawning and shutdown.
//!
//! Signal routing is never installed here; triggers are fed through a channel
//! or the reap pass is called directly.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitStatus};
use tokio::sync::mpsc;
use worker_supervisor::lifecycle::{
    ShutdownCoordinator, SignalBinding, SignalRole, SignalRouter, Trigger,
};
use worker_supervisor::supervisor::{reap_and_restart, AlwaysRespawn, RestartDecision, RestartPolicy};
use worker_supervisor::worker::{
    SlotId, SlotState, SlotTable, WorkerExit, WorkerSpawner, EXIT_RESTORE_FAILED,
};
use worker_supervisor::{Supervisor, SupervisorError, SupervisorState};

mod common;

/// Table, spawner and router for driving the engine by hand.
struct Harness {
    table: SlotTable,
    spawner: WorkerSpawner,
    router: SignalRouter,
}

impl Harness {
    fn new(jobs: usize) -> Self {
        Self {
            table: SlotTable::with_capacity(jobs).unwrap(),
            spawner: WorkerSpawner::new(common::sleep_forever()),
            router: SignalRouter::default(),
        }
    }

    fn spawn_all(&mut self) {
        let ids: Vec<_> = self.table.ids().collect();
        for id in ids {
            self.spawner.spawn(id, &mut self.table, &self.router).unwrap();
        }
    }

    fn pid(&self, id: usize) -> nix::unistd::Pid {
        self.table.get(SlotId(id)).unwrap().pid().unwrap()
    }

    fn shutdown(&mut self) {
        let report = ShutdownCoordinator::default().run(&mut self.table, &self.router);
        assert!(report.is_complete(), "outstanding: {:?}", report.outstanding);
    }
}

fn trigger(role: SignalRole) -> Trigger {
    let signal = match role {
        SignalRole::Restart => Signal::SIGCHLD,
        SignalRole::Shutdown => Signal::SIGTERM,
    };
    Trigger { signal, role }
}

#[test]
fn test_startup_spawns_every_slot() {
    let _guard = common::process_lock();
    let mut h = Harness::new(5);

    h.spawn_all();

    assert_eq!(h.table.len(), 5);
    assert_eq!(h.table.running_count(), 5);
    let pids: HashSet<_> = h.table.iter().filter_map(|slot| slot.pid()).collect();
    assert_eq!(pids.len(), 5, "every slot owns a distinct process");

    h.shutdown();
}

#[test]
fn test_reap_pass_ignores_live_workers() {
    let _guard = common::process_lock();
    let mut h = Harness::new(3);
    h.spawn_all();

    let report = reap_and_restart(&mut h.table, &h.spawner, &h.router, &mut AlwaysRespawn);

    assert!(report.is_quiet());
    assert_eq!(h.table.running_count(), 3);

    h.shutdown();
}

#[test]
fn test_single_death_single_respawn() {
    let _guard = common::process_lock();
    let mut h = Harness::new(3);
    h.spawn_all();
    let before: Vec<_> = (0..3).map(|i| h.pid(i)).collect();

    common::kill_and_settle(before[1], Signal::SIGKILL);
    let report = reap_and_restart(&mut h.table, &h.spawner, &h.router, &mut AlwaysRespawn);

    assert_eq!(
        report.reaped,
        vec![(SlotId(1), before[1], WorkerExit::Signaled(Signal::SIGKILL))]
    );
    assert_eq!(report.respawned.len(), 1);
    assert_eq!(report.respawned[0].0, SlotId(1));
    assert_ne!(h.pid(1), before[1]);
    assert_eq!(h.pid(0), before[0]);
    assert_eq!(h.pid(2), before[2]);
    assert_eq!(h.table.get(SlotId(1)).unwrap().spawns(), 2);
    assert_eq!(h.table.running_count(), 3);

    h.shutdown();
}

#[test]
fn test_coalesced_deaths_all_respawned_in_one_pass() {
    let _guard = common::process_lock();
    let mut h = Harness::new(4);
    h.spawn_all();
    let survivor = h.pid(2);

    for id in [0, 1, 3] {
        common::kill_and_settle(h.pid(id), Signal::SIGKILL);
    }

    let report = reap_and_restart(&mut h.table, &h.spawner, &h.router, &mut AlwaysRespawn);

    let reaped: Vec<_> = report.reaped.iter().map(|(id, _, _)| *id).collect();
    let respawned: Vec<_> = report.respawned.iter().map(|(id, _)| *id).collect();
    assert_eq!(reaped, vec![SlotId(0), SlotId(1), SlotId(3)]);
    assert_eq!(respawned, reaped);
    assert_eq!(h.pid(2), survivor);
    assert_eq!(h.table.running_count(), 4);

    h.shutdown();
}

#[test]
fn test_all_workers_terminated_are_respawned() {
    let _guard = common::process_lock();
    let mut h = Harness::new(3);
    h.spawn_all();
    let before: Vec<_> = (0..3).map(|i| h.pid(i)).collect();

    for pid in &before {
        common::kill_and_settle(*pid, Signal::SIGTERM);
    }

    let report = reap_and_restart(&mut h.table, &h.spawner, &h.router, &mut AlwaysRespawn);

    assert!(report
        .reaped
        .iter()
        .all(|(_, _, exit)| *exit == WorkerExit::Signaled(Signal::SIGTERM)));
    assert_eq!(report.respawned.len(), 3);
    for (i, old) in before.iter().enumerate() {
        assert_ne!(h.pid(i), *old);
        assert_eq!(h.table.get(SlotId(i)).unwrap().state(), SlotState::Running);
    }

    h.shutdown();
}

/// Defers the first decision for every slot, then respawns.
#[derive(Default)]
struct DeferOnce {
    seen: HashSet<SlotId>,
}

impl RestartPolicy for DeferOnce {
    fn decide(&mut self, slot: SlotId, _consecutive_failures: u32) -> RestartDecision {
        if self.seen.insert(slot) {
            RestartDecision::Defer
        } else {
            RestartDecision::Respawn
        }
    }
}

#[test]
fn test_deferred_slot_retried_next_pass() {
    let _guard = common::process_lock();
    let mut h = Harness::new(2);
    h.spawn_all();
    let mut policy = DeferOnce::default();

    common::kill_and_settle(h.pid(0), Signal::SIGKILL);

    let first = reap_and_restart(&mut h.table, &h.spawner, &h.router, &mut policy);
    assert_eq!(first.deferred, vec![SlotId(0)]);
    assert_eq!(h.table.get(SlotId(0)).unwrap().state(), SlotState::Dead);
    assert_eq!(h.table.running_count(), 1);

    let second = reap_and_restart(&mut h.table, &h.spawner, &h.router, &mut policy);
    assert!(second.reaped.is_empty());
    assert_eq!(second.respawned.len(), 1);
    assert_eq!(h.table.running_count(), 2);

    h.shutdown();
}

#[test]
fn test_worker_exits_distinctly_when_restore_fails() {
    let _guard = common::process_lock();
    let mut table = SlotTable::with_capacity(1).unwrap();
    let spawner = WorkerSpawner::new(common::sleep_forever());
    let broken = SignalRouter::new(vec![SignalBinding::new(Signal::SIGKILL, SignalRole::Shutdown)]);

    let pid = spawner.spawn(SlotId(0), &mut table, &broken).unwrap();

    assert_eq!(
        waitpid(pid, None).unwrap(),
        WaitStatus::Exited(pid, EXIT_RESTORE_FAILED)
    );
}

#[test]
fn test_worker_exit_status_is_payload_status() {
    let _guard = common::process_lock();
    let mut table = SlotTable::with_capacity(1).unwrap();
    let spawner = WorkerSpawner::new(Arc::new(|_: SlotId| 3));

    let pid = spawner.spawn(SlotId(0), &mut table, &SignalRouter::default()).unwrap();

    assert_eq!(waitpid(pid, None).unwrap(), WaitStatus::Exited(pid, 3));
}

#[test]
fn test_shutdown_reaps_every_worker() {
    let _guard = common::process_lock();
    let mut h = Harness::new(3);
    h.spawn_all();
    let pids: HashSet<_> = (0..3).map(|i| h.pid(i)).collect();

    let report = ShutdownCoordinator::default().run(&mut h.table, &h.router);

    assert_eq!(report.signaled, 3);
    assert_eq!(report.forced, 0);
    assert!(report.is_complete());
    let reaped: HashSet<_> = report.reaped.iter().map(|(_, pid, _)| *pid).collect();
    assert_eq!(reaped, pids);
    assert!(h.table.iter().all(|slot| slot.state() == SlotState::Terminated));
}

#[test]
fn test_shutdown_tolerates_already_exited_worker() {
    let _guard = common::process_lock();
    let mut h = Harness::new(2);
    h.spawn_all();

    // Exited but not yet collected: still owned by a Running slot.
    common::kill_and_settle(h.pid(0), Signal::SIGKILL);

    let report = ShutdownCoordinator::default().run(&mut h.table, &h.router);

    assert!(report.is_complete());
    assert_eq!(report.reaped.len(), 2);
    assert!(report
        .reaped
        .iter()
        .any(|(slot, _, exit)| *slot == Some(SlotId(0)) && *exit == WorkerExit::Signaled(Signal::SIGKILL)));
}

#[test]
fn test_grace_period_escalates_to_kill() {
    let _guard = common::process_lock();
    let mut table = SlotTable::with_capacity(1).unwrap();
    let spawner = WorkerSpawner::new(common::stubborn());
    let router = SignalRouter::default();
    spawner.spawn(SlotId(0), &mut table, &router).unwrap();

    // Let the worker install its SIGTERM ignore.
    std::thread::sleep(Duration::from_millis(300));

    let report = ShutdownCoordinator::new(Some(Duration::from_millis(200))).run(&mut table, &router);

    assert_eq!(report.forced, 1);
    assert!(report.is_complete());
    assert_eq!(report.reaped.len(), 1);
    assert_eq!(report.reaped[0].2, WorkerExit::Signaled(Signal::SIGKILL));
}

#[tokio::test]
async fn test_run_loop_shutdown_without_respawn() {
    let _guard = common::process_lock();
    let mut supervisor = Supervisor::with_workload(common::config(2), common::sleep_forever()).unwrap();
    supervisor.spawn_initial().unwrap();

    let (tx, rx) = mpsc::channel(4);
    tx.send(trigger(SignalRole::Restart)).await.unwrap();
    tx.send(trigger(SignalRole::Shutdown)).await.unwrap();

    let report = supervisor.run(rx).await.unwrap();

    assert_eq!(supervisor.state(), SupervisorState::Terminated);
    assert_eq!(report.signaled, 2);
    assert!(report.is_complete());
    assert_eq!(report.reaped.len(), 2);
    for slot in supervisor.table().iter() {
        assert_eq!(slot.state(), SlotState::Terminated);
        assert_eq!(slot.spawns(), 1, "no respawn during shutdown");
    }
}

#[tokio::test]
async fn test_run_loop_respawns_then_shuts_down() {
    let _guard = common::process_lock();
    let mut supervisor = Supervisor::with_workload(common::config(3), common::sleep_forever()).unwrap();
    supervisor.spawn_initial().unwrap();
    let victim = supervisor.table().get(SlotId(1)).unwrap().pid().unwrap();

    common::kill_and_settle(victim, Signal::SIGKILL);

    let (tx, rx) = mpsc::channel(4);
    tx.send(trigger(SignalRole::Restart)).await.unwrap();
    tx.send(trigger(SignalRole::Shutdown)).await.unwrap();

    let report = supervisor.run(rx).await.unwrap();

    let spawns: Vec<_> = supervisor.table().iter().map(|slot| slot.spawns()).collect();
    assert_eq!(spawns, vec![1, 2, 1]);
    assert_ne!(supervisor.table().get(SlotId(1)).unwrap().pid(), Some(victim));
    assert_eq!(report.reaped.len(), 3);
    assert!(report.is_complete());
}

#[tokio::test]
async fn test_closed_trigger_channel_shuts_down() {
    let _guard = common::process_lock();
    let mut supervisor = Supervisor::with_workload(common::config(1), common::sleep_forever()).unwrap();
    supervisor.spawn_initial().unwrap();

    let (tx, rx) = mpsc::channel::<Trigger>(1);
    drop(tx);

    let report = supervisor.run(rx).await.unwrap();
    assert!(report.is_complete());
    assert_eq!(supervisor.state(), SupervisorState::Terminated);
}

#[tokio::test]
async fn test_signal_install_failure_is_fatal() {
    let _guard = common::process_lock();
    let broken = SignalRouter::new(vec![SignalBinding::new(Signal::SIGKILL, SignalRole::Shutdown)]);
    let mut supervisor = Supervisor::with_workload(common::config(2), common::sleep_forever())
        .unwrap()
        .with_router(broken);

    let err = supervisor.start().unwrap_err();

    assert!(matches!(err, SupervisorError::Signal(_)));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(supervisor.state(), SupervisorState::Terminated);

    // Workers were forked before routing failed; they cannot restore SIGKILL either.
    let spawned = supervisor.table().outstanding();
    assert_eq!(spawned.len(), 2);
    for pid in spawned {
        assert_eq!(
            waitpid(pid, None).unwrap(),
            WaitStatus::Exited(pid, EXIT_RESTORE_FAILED)
        );
    }
}

#[test]
fn test_oversized_table_rejected_explicitly() {
    let err = Supervisor::with_workload(common::config(256), Arc::new(|_: SlotId| 0)).unwrap_err();
    assert_eq!(err.exit_code(), 1);
    assert!(err.to_string().contains("256"));
}
