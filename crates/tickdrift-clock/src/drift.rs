//! Drift statistics
//!
//! A receive normally advances the clock by one. When the sender is ahead,
//! the clock jumps further; these jumps measure how far a machine drifts
//! behind its faster peers.

use serde::{Deserialize, Serialize};

use crate::ReceiveOutcome;

/// Running totals over all receive transitions of one machine
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DriftStats {
    /// Receives observed
    pub receives: u64,
    /// Receives that jumped by more than one
    pub jumps: u64,
    /// Sum of all jump sizes
    pub total_jump: u64,
    /// Largest single jump
    pub max_jump: u64,
}

impl DriftStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, outcome: &ReceiveOutcome) {
        let jump = outcome.jump();
        self.receives += 1;
        if jump > 0 {
            self.jumps += 1;
            self.total_jump = self.total_jump.saturating_add(jump);
            self.max_jump = self.max_jump.max(jump);
        }
    }

    /// Mean jump per receive, zero before the first receive
    pub fn mean_jump(&self) -> f64 {
        if self.receives == 0 {
            0.0
        } else {
            self.total_jump as f64 / self.receives as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LamportClock;

    #[test]
    fn test_empty_stats() {
        let stats = DriftStats::new();
        assert_eq!(stats.mean_jump(), 0.0);
        assert_eq!(stats.max_jump, 0);
    }

    #[test]
    fn test_observe_jumps() {
        let mut clock = LamportClock::new();
        let mut stats = DriftStats::new();

        stats.observe(&clock.on_receive(10)); // 0 -> 11, jump 10
        stats.observe(&clock.on_receive(3)); // 11 -> 12, no jump
        stats.observe(&clock.on_receive(16)); // 12 -> 17, jump 4

        assert_eq!(stats.receives, 3);
        assert_eq!(stats.jumps, 2);
        assert_eq!(stats.total_jump, 14);
        assert_eq!(stats.max_jump, 10);
        assert!((stats.mean_jump() - 14.0 / 3.0).abs() < 1e-9);
    }
}
