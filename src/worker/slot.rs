//! Worker slot registry.
//!
//! # Responsibilities
//! - Map a stable logical worker id to its current process
//! - Track per-slot lifecycle state and restart counters
//! - Enforce the table capacity at construction
//!
//! # State Transitions
//! ```text
//! Unspawned → Running: spawner records a new pid
//! Running → Dead: reaper observes the process exited
//! Dead → Running: spawner records a replacement pid
//! Running → Terminated: shutdown reaps the process
//! ```

use std::fmt;

use nix::unistd::Pid;
use thiserror::Error;

use crate::config::MAX_JOBS;

/// Stable logical worker id, `0..jobs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub usize);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for SlotId {
    fn from(id: usize) -> Self {
        Self(id)
    }
}

/// Lifecycle state of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Unspawned,
    Running,
    Dead,
    Terminated,
}

/// Requested table size is outside `1..=MAX_JOBS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("slot table capacity is 1..={max}, requested {requested}")]
pub struct CapacityError {
    pub requested: usize,
    pub max: usize,
}

/// One logical worker.
#[derive(Debug)]
pub struct WorkerSlot {
    id: SlotId,
    pid: Option<Pid>,
    state: SlotState,
    spawns: u64,
    consecutive_failures: u32,
}

impl WorkerSlot {
    fn new(id: SlotId) -> Self {
        Self {
            id,
            pid: None,
            state: SlotState::Unspawned,
            spawns: 0,
            consecutive_failures: 0,
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    /// Pid of the current or most recent process for this slot.
    pub fn pid(&self) -> Option<Pid> {
        self.pid
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    /// Total successful spawns for this slot, including the first.
    pub fn spawns(&self) -> u64 {
        self.spawns
    }

    /// Spawn failures since the slot was last Running.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn is_running(&self) -> bool {
        self.state == SlotState::Running
    }

    pub(crate) fn mark_running(&mut self, pid: Pid) {
        self.pid = Some(pid);
        self.state = SlotState::Running;
        self.spawns += 1;
        self.consecutive_failures = 0;
    }

    pub(crate) fn mark_dead(&mut self) {
        self.state = SlotState::Dead;
    }

    pub(crate) fn mark_terminated(&mut self) {
        self.state = SlotState::Terminated;
    }

    pub(crate) fn record_spawn_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }
}

/// Fixed-size, index-addressed registry of worker slots.
#[derive(Debug)]
pub struct SlotTable {
    slots: Vec<WorkerSlot>,
}

impl SlotTable {
    /// Create a table with `jobs` unspawned slots.
    pub fn with_capacity(jobs: usize) -> Result<Self, CapacityError> {
        if jobs == 0 || jobs > MAX_JOBS {
            return Err(CapacityError {
                requested: jobs,
                max: MAX_JOBS,
            });
        }

        Ok(Self {
            slots: (0..jobs).map(|i| WorkerSlot::new(SlotId(i))).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, id: SlotId) -> Option<&WorkerSlot> {
        self.slots.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: SlotId) -> Option<&mut WorkerSlot> {
        self.slots.get_mut(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorkerSlot> {
        self.slots.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = SlotId> {
        (0..self.slots.len()).map(SlotId)
    }

    /// Find the Running slot that owns `pid`.
    pub(crate) fn find_running_mut(&mut self, pid: Pid) -> Option<&mut WorkerSlot> {
        self.slots
            .iter_mut()
            .find(|slot| slot.is_running() && slot.pid == Some(pid))
    }

    pub fn running_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_running()).count()
    }

    /// Pids still owned by Running slots, i.e. not yet reaped.
    pub fn outstanding(&self) -> Vec<Pid> {
        self.slots
            .iter()
            .filter(|slot| slot.is_running())
            .filter_map(|slot| slot.pid)
            .collect()
    }
}
