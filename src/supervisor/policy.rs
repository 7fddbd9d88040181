//! Restart policy.
//!
//! Decides, for a slot found Dead during a reap pass, whether to respawn it
//! now or leave it for the next pass. The supervisor ships only
//! `AlwaysRespawn`; rate limiting lives behind this trait.

use crate::worker::slot::SlotId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartDecision {
    /// Fork a replacement in this pass.
    Respawn,
    /// Leave the slot Dead; it is reconsidered on the next pass.
    Defer,
}

pub trait RestartPolicy: Send {
    /// `consecutive_failures` counts failed forks since the slot last ran.
    fn decide(&mut self, slot: SlotId, consecutive_failures: u32) -> RestartDecision;
}

/// Respawn every dead slot immediately, with no cap.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRespawn;

impl RestartPolicy for AlwaysRespawn {
    fn decide(&mut self, _slot: SlotId, _consecutive_failures: u32) -> RestartDecision {
        RestartDecision::Respawn
    }
}
