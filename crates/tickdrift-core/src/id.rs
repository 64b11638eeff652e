//! Identity types for simulated machines

use std::fmt;

use serde::{Deserialize, Serialize};

/// Machine identity - unique among all machines of one run
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct MachineId(pub u32);

impl MachineId {
    pub const ZERO: MachineId = MachineId(0);

    #[inline]
    pub fn new(id: u32) -> Self {
        MachineId(id)
    }

    /// Index form, used for port offsets and seed derivation
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn to_wire(self) -> u64 {
        self.0 as u64
    }

    /// Wire ids are 64-bit; anything above `u32::MAX` is not a valid machine
    #[inline]
    pub fn from_wire(raw: u64) -> Option<Self> {
        u32::try_from(raw).ok().map(MachineId)
    }

    /// Conventional log file name for this machine
    pub fn log_file_name(self) -> String {
        format!("machine_{}.log", self.0)
    }
}

impl fmt::Debug for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Machine({})", self.0)
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for MachineId {
    fn from(id: u32) -> Self {
        MachineId(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_id_range() {
        assert_eq!(MachineId::from_wire(7), Some(MachineId(7)));
        assert_eq!(MachineId::from_wire(u32::MAX as u64 + 1), None);
    }

    #[test]
    fn test_log_file_name() {
        assert_eq!(MachineId::new(2).log_file_name(), "machine_2.log");
    }

    #[test]
    fn test_ordering_follows_index() {
        let mut ids = vec![MachineId(3), MachineId(0), MachineId(2)];
        ids.sort();
        assert_eq!(ids, vec![MachineId(0), MachineId(2), MachineId(3)]);
    }
}
