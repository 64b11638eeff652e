//! RPC message schema
//!
//! Machines exchange exactly one request type, `SendMessage(ClockMessage)`,
//! answered by an `Ack`.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::{MachineId, SimError};

/// Event type carried inside a ClockMessage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageKind {
    Send = 0x01,
    Internal = 0x02,
}

impl MessageKind {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(MessageKind::Send),
            0x02 => Some(MessageKind::Internal),
            _ => None,
        }
    }

    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Send => "SEND",
            MessageKind::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SEND" => Ok(MessageKind::Send),
            "INTERNAL" => Ok(MessageKind::Internal),
            other => Err(SimError::UnknownEventType(other.to_string())),
        }
    }
}

/// Message sent from one machine to another. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClockMessage {
    /// Sending machine
    pub sender_id: MachineId,
    /// Sender's logical clock after its send increment
    pub logical_clock: u64,
    /// Sender's wall clock, seconds since the Unix epoch
    pub sender_system_time: f64,
    /// Sender's inbox length at send time
    pub queue_length: u64,
    pub event_type: MessageKind,
}

impl ClockMessage {
    pub fn new(
        sender_id: MachineId,
        logical_clock: u64,
        sender_system_time: f64,
        queue_length: u64,
        event_type: MessageKind,
    ) -> Self {
        ClockMessage {
            sender_id,
            logical_clock,
            sender_system_time,
            queue_length,
            event_type,
        }
    }

    /// A SEND message stamped with the current wall time
    pub fn send_now(sender_id: MachineId, logical_clock: u64, queue_length: u64) -> Self {
        Self::new(
            sender_id,
            logical_clock,
            wall_clock_secs(),
            queue_length,
            MessageKind::Send,
        )
    }
}

/// Acknowledgment returned for every delivered message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub status: String,
}

impl Ack {
    pub const OK: &'static str = "OK";

    pub fn new(status: impl Into<String>) -> Self {
        Ack {
            status: status.into(),
        }
    }

    pub fn ok() -> Self {
        Self::new(Self::OK)
    }
}

/// Current wall clock in seconds since the Unix epoch
pub fn wall_clock_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_kind_bytes() {
        for kind in [MessageKind::Send, MessageKind::Internal] {
            assert_eq!(MessageKind::from_byte(kind.to_byte()), Some(kind));
        }
        assert_eq!(MessageKind::from_byte(0x00), None);
        assert_eq!(MessageKind::from_byte(0x03), None);
    }

    #[test]
    fn test_message_kind_strings() {
        assert_eq!("SEND".parse::<MessageKind>().unwrap(), MessageKind::Send);
        assert_eq!(MessageKind::Internal.to_string(), "INTERNAL");
        assert!(matches!(
            "RECEIVE".parse::<MessageKind>(),
            Err(SimError::UnknownEventType(_))
        ));
    }

    #[test]
    fn test_send_now_is_stamped() {
        let msg = ClockMessage::send_now(MachineId(1), 6, 2);
        assert_eq!(msg.event_type, MessageKind::Send);
        assert_eq!(msg.logical_clock, 6);
        assert_eq!(msg.queue_length, 2);
        assert!(msg.sender_system_time > 0.0);
    }

    #[test]
    fn test_ack_ok() {
        assert_eq!(Ack::ok().status, "OK");
    }
}
