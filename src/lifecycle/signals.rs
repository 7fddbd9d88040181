//! OS signal routing.
//!
//! # Responsibilities
//! - Redirect the bound signals to supervisor handling (install)
//! - Reset the bound signals to their default disposition (restore)
//! - Translate deliveries into `Trigger`s drained by the event loop
//!
//! # Design Decisions
//! - Uses Tokio's signal streams: the interrupt handler only records the
//!   delivery, all real work happens in the supervisor's own task
//! - Deliveries of the same signal may coalesce; consumers must not count them
//! - Installation is all-or-nothing; a partial install is rolled back
//! - Tokio hooks each signal once per process and `restore` replaces that
//!   hook, so routing can be installed only once per process

use std::sync::atomic::{AtomicBool, Ordering};

use nix::errno::Errno;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use thiserror::Error;
use tokio::signal::unix::{signal as os_signal, SignalKind};
use tokio::sync::mpsc;

/// Capacity of the trigger channel between forwarders and the event loop.
const TRIGGER_BUFFER: usize = 16;

/// Set once any binding has been handed to Tokio in this process.
static ROUTING_CLAIMED: AtomicBool = AtomicBool::new(false);

/// What a delivery of a bound signal asks the supervisor to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalRole {
    /// Some child may have exited; scan and respawn.
    Restart,
    /// Terminate every worker and exit.
    Shutdown,
}

/// A signal and the role it plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalBinding {
    pub signal: Signal,
    pub role: SignalRole,
}

impl SignalBinding {
    pub const fn new(signal: Signal, role: SignalRole) -> Self {
        Self { signal, role }
    }
}

/// One observed delivery, handed to the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub signal: Signal,
    pub role: SignalRole,
}

impl From<SignalBinding> for Trigger {
    fn from(binding: SignalBinding) -> Self {
        Self {
            signal: binding.signal,
            role: binding.role,
        }
    }
}

/// Errors raised while changing signal dispositions.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("failed to install handler for {signal}: {source}")]
    Install {
        signal: Signal,
        #[source]
        source: std::io::Error,
    },

    #[error("signal routing was already installed in this process")]
    AlreadyInstalled,

    #[error("failed to restore default disposition for {signal}: {source}")]
    Restore {
        signal: Signal,
        #[source]
        source: Errno,
    },
}

/// The supervisor's fixed set of bindings.
pub const SUPERVISOR_BINDINGS: [SignalBinding; 3] = [
    SignalBinding::new(Signal::SIGCHLD, SignalRole::Restart),
    SignalBinding::new(Signal::SIGINT, SignalRole::Shutdown),
    SignalBinding::new(Signal::SIGTERM, SignalRole::Shutdown),
];

/// Installs and removes the supervisor's signal dispositions as a unit.
#[derive(Debug, Clone)]
pub struct SignalRouter {
    bindings: Vec<SignalBinding>,
}

impl SignalRouter {
    pub fn new(bindings: Vec<SignalBinding>) -> Self {
        Self { bindings }
    }

    pub fn bindings(&self) -> &[SignalBinding] {
        &self.bindings
    }

    /// Route every bound signal to the returned trigger channel.
    ///
    /// Must be called from within a Tokio runtime. If any binding is
    /// rejected, dispositions already changed are reset before returning.
    /// Once any binding has been accepted, every later call fails with
    /// `AlreadyInstalled`, since a restored disposition cannot be rehooked.
    pub fn install(&self) -> Result<mpsc::Receiver<Trigger>, SignalError> {
        if ROUTING_CLAIMED.load(Ordering::SeqCst) {
            return Err(SignalError::AlreadyInstalled);
        }

        let mut streams = Vec::with_capacity(self.bindings.len());

        for binding in &self.bindings {
            match os_signal(SignalKind::from_raw(binding.signal as i32)) {
                Ok(stream) => {
                    ROUTING_CLAIMED.store(true, Ordering::SeqCst);
                    streams.push((*binding, stream));
                }
                Err(source) => {
                    if let Err(e) = self.restore() {
                        tracing::error!(error = %e, "Rollback of partial signal install failed");
                    }
                    return Err(SignalError::Install {
                        signal: binding.signal,
                        source,
                    });
                }
            }
        }

        let (tx, rx) = mpsc::channel(TRIGGER_BUFFER);
        for (binding, mut stream) in streams {
            let tx = tx.clone();
            tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    if tx.send(Trigger::from(binding)).await.is_err() {
                        break;
                    }
                }
            });
        }

        tracing::debug!(bindings = ?self.bindings, "Signal routing installed");
        Ok(rx)
    }

    /// Reset every bound signal to its default disposition.
    ///
    /// Only calls `sigaction`, so it is safe in a freshly forked child.
    pub fn restore(&self) -> Result<(), SignalError> {
        let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());

        for binding in &self.bindings {
            // SAFETY: SIG_DFL installs no handler code of ours.
            unsafe { signal::sigaction(binding.signal, &default) }.map_err(|source| {
                SignalError::Restore {
                    signal: binding.signal,
                    source,
                }
            })?;
        }

        Ok(())
    }
}

impl Default for SignalRouter {
    fn default() -> Self {
        Self::new(SUPERVISOR_BINDINGS.to_vec())
    }
}
