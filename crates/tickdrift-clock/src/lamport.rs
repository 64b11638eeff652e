//! Lamport logical clock

/// Lamport clock owned by a single machine
/// INVARIANT: the value never decreases
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LamportClock {
    value: u64,
}

/// Outcome of a receive transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReceiveOutcome {
    /// Clock before the transition
    pub before: u64,
    /// Clock after the transition
    pub after: u64,
}

impl ReceiveOutcome {
    /// Advance beyond the ordinary +1, caused by a peer that was ahead
    pub fn jump(&self) -> u64 {
        self.after
            .saturating_sub(self.before)
            .saturating_sub(1)
    }
}

impl LamportClock {
    /// Create a clock starting at zero
    pub fn new() -> Self {
        LamportClock { value: 0 }
    }

    /// Create a clock at an arbitrary starting value
    pub fn starting_at(value: u64) -> Self {
        LamportClock { value }
    }

    /// Current value without advancing
    #[inline]
    pub fn now(&self) -> u64 {
        self.value
    }

    /// Internal event: advance by one
    pub fn tick(&mut self) -> u64 {
        self.value = self.value.saturating_add(1);
        self.value
    }

    /// Send event: advance by one, returning the value to stamp on the message
    pub fn on_send(&mut self) -> u64 {
        self.tick()
    }

    /// Receive event: `max(local, remote) + 1`
    pub fn on_receive(&mut self, remote: u64) -> ReceiveOutcome {
        let before = self.value;
        self.value = before.max(remote).saturating_add(1);
        ReceiveOutcome {
            before,
            after: self.value,
        }
    }
}
