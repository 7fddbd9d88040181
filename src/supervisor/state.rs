//! Supervisor lifecycle state machine.
//!
//! # State Transitions
//! ```text
//! Starting → Running: all initial spawns succeeded and signals are routed
//! Starting → Terminated: a startup step failed
//! Running → ShuttingDown: a shutdown trigger was observed
//! ShuttingDown → Terminated: every worker has been reaped
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Starting,
    Running,
    ShuttingDown,
    Terminated,
}

impl SupervisorState {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: SupervisorState) -> bool {
        use SupervisorState::*;

        matches!(
            (self, next),
            (Starting, Running)
                | (Starting, Terminated)
                | (Running, ShuttingDown)
                | (ShuttingDown, Terminated)
        )
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SupervisorState::Starting => "starting",
            SupervisorState::Running => "running",
            SupervisorState::ShuttingDown => "shutting-down",
            SupervisorState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}
