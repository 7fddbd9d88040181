//! Detaching from the controlling terminal.
//!
//! # Steps
//! ```text
//! fork → (parent process exits 0)
//!     → umask(0)
//!     → stdin/stdout/stderr → log file (append, create 0644)
//!     → setsid (new session, no controlling terminal)
//!     → chdir("/")
//! ```
//!
//! Must run before any threads or runtime exist.

use nix::errno::Errno;
use nix::fcntl::{open, OFlag};
use nix::sys::stat::{umask, Mode};
use nix::unistd::{self, ForkResult, Pid};
use thiserror::Error;

/// Which side of the detaching fork this process is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detached {
    /// The launching process; it should report the pid and exit 0.
    Parent(Pid),
    /// The detached process; it continues as the supervisor.
    Child,
}

/// A daemonization step failed.
#[derive(Debug, Error)]
#[error("daemonize failed at {step}: {errno}")]
pub struct DaemonError {
    pub step: &'static str,
    pub errno: Errno,
}

impl DaemonError {
    fn new(step: &'static str, errno: Errno) -> Self {
        Self { step, errno }
    }

    /// The process exits with the underlying OS error code.
    pub fn exit_code(&self) -> i32 {
        self.errno as i32
    }
}

/// Fork into the background and detach, redirecting standard streams.
pub fn detach(log_path: &str) -> Result<Detached, DaemonError> {
    // SAFETY: called from main before any other thread exists.
    match unsafe { unistd::fork() } {
        Ok(ForkResult::Parent { child }) => return Ok(Detached::Parent(child)),
        Ok(ForkResult::Child) => {}
        Err(errno) => return Err(DaemonError::new("fork", errno)),
    }

    umask(Mode::empty());
    redirect_std_streams(log_path)?;
    unistd::setsid().map_err(|errno| DaemonError::new("setsid", errno))?;
    unistd::chdir("/").map_err(|errno| DaemonError::new("chdir", errno))?;

    Ok(Detached::Child)
}

/// Point stdin, stdout and stderr at `log_path`.
pub fn redirect_std_streams(log_path: &str) -> Result<(), DaemonError> {
    let flags = OFlag::O_WRONLY | OFlag::O_APPEND | OFlag::O_CREAT;
    let mode = Mode::from_bits_truncate(0o644);
    let fd = open(log_path, flags, mode).map_err(|errno| DaemonError::new("open", errno))?;

    for target in [0, 1, 2] {
        unistd::dup2(fd, target).map_err(|errno| DaemonError::new("dup2", errno))?;
    }

    // The log may itself have landed on a standard descriptor.
    if fd > 2 {
        unistd::close(fd).map_err(|errno| DaemonError::new("close", errno))?;
    }

    Ok(())
}
