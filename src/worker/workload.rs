//! Worker payloads.
//!
//! A payload runs inside the forked child after signal dispositions have been
//! restored. Its return value becomes the child's exit status.

use std::thread;
use std::time::Duration;

use rand::Rng;

use crate::config::WorkloadConfig;
use crate::worker::slot::SlotId;

/// The unit of work a worker process performs.
pub trait Workload: Send + Sync {
    /// Run the payload for `slot` and return the exit status.
    fn run(&self, slot: SlotId) -> i32;
}

impl<F> Workload for F
where
    F: Fn(SlotId) -> i32 + Send + Sync,
{
    fn run(&self, slot: SlotId) -> i32 {
        self(slot)
    }
}

/// Placeholder payload: sleep one tick at a time, exit at random.
#[derive(Debug, Clone)]
pub struct RandomExit {
    tick: Duration,
    exit_one_in: u32,
}

impl RandomExit {
    pub fn new(tick: Duration, exit_one_in: u32) -> Self {
        Self {
            tick,
            exit_one_in: exit_one_in.max(1),
        }
    }

    /// Whether this tick ends the payload.
    fn should_exit<R: Rng>(&self, rng: &mut R) -> bool {
        rng.gen_range(0..self.exit_one_in) == 0
    }
}

impl From<&WorkloadConfig> for RandomExit {
    fn from(config: &WorkloadConfig) -> Self {
        Self::new(Duration::from_millis(config.tick_ms), config.exit_one_in)
    }
}

impl Default for RandomExit {
    fn default() -> Self {
        Self::from(&WorkloadConfig::default())
    }
}

impl Workload for RandomExit {
    fn run(&self, _slot: SlotId) -> i32 {
        let mut rng = rand::thread_rng();
        while !self.should_exit(&mut rng) {
            thread::sleep(self.tick);
        }
        0
    }
}
