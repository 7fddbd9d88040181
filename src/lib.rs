//! Forking Worker Supervisor Library

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod supervisor;
pub mod worker;

pub use config::SupervisorConfig;
pub use error::SupervisorError;
pub use lifecycle::{ShutdownCoordinator, ShutdownReport, SignalRouter};
pub use supervisor::{Supervisor, SupervisorState};
pub use worker::{SlotId, SlotState, SlotTable, Workload};
