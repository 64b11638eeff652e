//! Event scheduling: action draws and the loop's stop signal

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::Rng;

/// What an iteration does when the inbox is empty
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Send to one uniformly chosen peer (draws 1 and 2)
    SendOne,
    /// Send to every peer in ascending id order (draw 3)
    Broadcast,
    /// Advance the clock locally (draws 4 to 10)
    Internal,
}

impl Action {
    /// Lowest and highest value of a draw
    pub const DRAW_RANGE: (u8, u8) = (1, 10);

    /// Map a draw in `1..=10` to an action
    pub fn from_draw(draw: u8) -> Self {
        match draw {
            1 | 2 => Action::SendOne,
            3 => Action::Broadcast,
            _ => Action::Internal,
        }
    }

    pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let (low, high) = Self::DRAW_RANGE;
        Self::from_draw(rng.gen_range(low..=high))
    }
}

/// Loop lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// Cooperative stop flag, polled by the loop once per tick
#[derive(Clone, Debug, Default)]
pub struct StopSignal {
    stopped: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Calling again has no further effect.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub fn state(&self) -> LoopState {
        if self.is_stopped() {
            LoopState::Stopped
        } else {
            LoopState::Running
        }
    }
}
