//! Shared utilities for process-level supervision tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd::Pid;
use worker_supervisor::config::SupervisorConfig;
use worker_supervisor::worker::{SlotId, Workload};

static PROCESS_LOCK: Mutex<()> = Mutex::new(());

/// Serialize tests that fork or wait, so one test never reaps another's children.
pub fn process_lock() -> MutexGuard<'static, ()> {
    PROCESS_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Config with `jobs` workers and otherwise defaults.
pub fn config(jobs: usize) -> SupervisorConfig {
    SupervisorConfig {
        jobs,
        ..Default::default()
    }
}

/// A payload that never finishes on its own.
pub fn sleep_forever() -> Arc<dyn Workload> {
    Arc::new(|_: SlotId| -> i32 {
        loop {
            thread::sleep(Duration::from_secs(60));
        }
    })
}

/// A payload that ignores SIGTERM and never finishes on its own.
pub fn stubborn() -> Arc<dyn Workload> {
    Arc::new(|_: SlotId| -> i32 {
        let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
        // SAFETY: SIG_IGN runs no handler code.
        let _ = unsafe { signal::sigaction(Signal::SIGTERM, &ignore) };
        loop {
            thread::sleep(Duration::from_secs(60));
        }
    })
}

/// Poll `check` until it holds or `timeout` elapses.
pub fn wait_until<F: FnMut() -> bool>(timeout: Duration, mut check: F) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    check()
}

/// Whether `pid` has exited but not been reaped (Linux `/proc`).
pub fn is_zombie(pid: Pid) -> bool {
    std::fs::read_to_string(format!("/proc/{}/stat", pid))
        .ok()
        .and_then(|stat| {
            stat.rsplit_once(')')
                .map(|(_, rest)| rest.trim_start().starts_with('Z'))
        })
        .unwrap_or(false)
}

/// Kill `pid` and wait until it is a zombie awaiting collection.
pub fn kill_and_settle(pid: Pid, sig: Signal) {
    signal::kill(pid, sig).expect("kill worker");
    assert!(
        wait_until(Duration::from_secs(5), || is_zombie(pid)),
        "worker {} did not exit after {}",
        pid,
        sig
    );
}
