//! How a worker process ended.

use std::fmt;

use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;

/// Terminal status of a reaped worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Exited normally with a status code.
    Exited(i32),
    /// Killed by a signal.
    Signaled(Signal),
}

impl WorkerExit {
    /// Extract the pid and terminal status, or `None` if the process has not
    /// terminated (still alive, stopped or continued).
    pub fn from_wait_status(status: WaitStatus) -> Option<(Pid, Self)> {
        match status {
            WaitStatus::Exited(pid, code) => Some((pid, WorkerExit::Exited(code))),
            WaitStatus::Signaled(pid, signal, _) => Some((pid, WorkerExit::Signaled(signal))),
            _ => None,
        }
    }
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerExit::Exited(code) => write!(f, "exited with status {}", code),
            WorkerExit::Signaled(signal) => write!(f, "killed by {}", signal),
        }
    }
}
