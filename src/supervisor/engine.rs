//! The Supervisor aggregate and its event loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::SupervisorConfig;
use crate::error::SupervisorError;
use crate::lifecycle::shutdown::{ShutdownCoordinator, ShutdownReport};
use crate::lifecycle::signals::{SignalRole, SignalRouter, Trigger};
use crate::supervisor::policy::{AlwaysRespawn, RestartPolicy};
use crate::supervisor::reaper::{reap_and_restart, ReapReport};
use crate::supervisor::state::SupervisorState;
use crate::worker::slot::SlotTable;
use crate::worker::spawner::WorkerSpawner;
use crate::worker::workload::{RandomExit, Workload};

/// Owns the slot table, configuration and every collaborator.
pub struct Supervisor {
    config: SupervisorConfig,
    table: SlotTable,
    spawner: WorkerSpawner,
    router: SignalRouter,
    policy: Box<dyn RestartPolicy>,
    shutdown: ShutdownCoordinator,
    state: SupervisorState,
}

impl Supervisor {
    /// Create a supervisor running the random-exit placeholder payload.
    pub fn new(config: SupervisorConfig) -> Result<Self, SupervisorError> {
        let workload = Arc::new(RandomExit::from(&config.workload));
        Self::with_workload(config, workload)
    }

    /// Create a supervisor whose workers run `workload`.
    pub fn with_workload(
        config: SupervisorConfig,
        workload: Arc<dyn Workload>,
    ) -> Result<Self, SupervisorError> {
        let table = SlotTable::with_capacity(config.jobs)?;
        let shutdown = ShutdownCoordinator::new(config.shutdown.grace_secs.map(Duration::from_secs));

        Ok(Self {
            config,
            table,
            spawner: WorkerSpawner::new(workload),
            router: SignalRouter::default(),
            policy: Box::new(AlwaysRespawn),
            shutdown,
            state: SupervisorState::Starting,
        })
    }

    /// Replace the restart policy.
    pub fn with_policy(mut self, policy: impl RestartPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Replace the signal bindings.
    pub fn with_router(mut self, router: SignalRouter) -> Self {
        self.router = router;
        self
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn table(&self) -> &SlotTable {
        &self.table
    }

    pub fn router(&self) -> &SignalRouter {
        &self.router
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    fn transition(&mut self, next: SupervisorState) -> Result<(), SupervisorError> {
        if !self.state.can_transition_to(next) {
            return Err(SupervisorError::InvalidState {
                current: self.state,
                action: "change state",
            });
        }
        tracing::debug!(from = %self.state, to = %next, "Supervisor state change");
        self.state = next;
        Ok(())
    }

    fn expect_state(&self, expected: SupervisorState, action: &'static str) -> Result<(), SupervisorError> {
        if self.state != expected {
            return Err(SupervisorError::InvalidState {
                current: self.state,
                action,
            });
        }
        Ok(())
    }

    /// Spawn a worker for every slot, in order. Any failure is fatal.
    ///
    /// Workers spawned before a failure are left running untracked.
    pub fn spawn_initial(&mut self) -> Result<(), SupervisorError> {
        self.expect_state(SupervisorState::Starting, "spawn initial workers")?;

        let ids: Vec<_> = self.table.ids().collect();
        for id in ids {
            if let Err(e) = self.spawner.spawn(id, &mut self.table, &self.router) {
                tracing::error!(slot = %id, error = %e, "Initial spawn failed");
                let orphaned = self.table.outstanding();
                if !orphaned.is_empty() {
                    tracing::warn!(pids = ?orphaned, "Aborting with already spawned workers");
                }
                self.state = SupervisorState::Terminated;
                return Err(e.into());
            }
        }

        Ok(())
    }

    /// Install signal routing. Any rejected binding is fatal.
    pub fn install_signals(&mut self) -> Result<mpsc::Receiver<Trigger>, SupervisorError> {
        self.expect_state(SupervisorState::Starting, "install signal routing")?;

        self.router.install().map_err(|e| {
            tracing::error!(error = %e, "Signal routing failed");
            self.state = SupervisorState::Terminated;
            SupervisorError::from(e)
        })
    }

    /// Run the Starting phase: spawn all workers, then route signals.
    pub fn start(&mut self) -> Result<mpsc::Receiver<Trigger>, SupervisorError> {
        self.spawn_initial()?;
        let triggers = self.install_signals()?;
        self.enter_running()?;
        Ok(triggers)
    }

    fn enter_running(&mut self) -> Result<(), SupervisorError> {
        self.transition(SupervisorState::Running)?;
        tracing::info!(workers = self.table.running_count(), "Supervisor running");

        // Exits during the spawn burst raised no trigger.
        self.reap();
        Ok(())
    }

    /// One reap-and-restart pass over the whole table.
    pub fn reap(&mut self) -> ReapReport {
        reap_and_restart(&mut self.table, &self.spawner, &self.router, self.policy.as_mut())
    }

    /// Drain triggers until a shutdown is requested, then shut down.
    ///
    /// A closed trigger channel is treated as a shutdown request.
    pub async fn run(
        &mut self,
        mut triggers: mpsc::Receiver<Trigger>,
    ) -> Result<ShutdownReport, SupervisorError> {
        match self.state {
            SupervisorState::Starting => self.enter_running()?,
            SupervisorState::Running => {}
            current => {
                return Err(SupervisorError::InvalidState {
                    current,
                    action: "run",
                })
            }
        }

        loop {
            match triggers.recv().await {
                Some(Trigger {
                    role: SignalRole::Restart,
                    ..
                }) => {
                    self.reap();
                }
                Some(Trigger {
                    role: SignalRole::Shutdown,
                    signal,
                }) => {
                    tracing::info!(signal = %signal, "Termination signal received");
                    return self.shutdown();
                }
                None => {
                    tracing::warn!("Trigger channel closed, shutting down");
                    return self.shutdown();
                }
            }
        }
    }

    /// Terminate and reap every worker.
    pub fn shutdown(&mut self) -> Result<ShutdownReport, SupervisorError> {
        self.transition(SupervisorState::ShuttingDown)?;
        let report = self.shutdown.run(&mut self.table, &self.router);
        self.transition(SupervisorState::Terminated)?;
        Ok(report)
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("state", &self.state)
            .field("table", &self.table)
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}
