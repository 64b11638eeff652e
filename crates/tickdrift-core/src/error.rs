//! Error types for tickdrift

use std::io;

use thiserror::Error;

use crate::MachineId;

/// Errors raised anywhere in a simulation run
#[derive(Error, Debug)]
pub enum SimError {
    // Wire errors
    #[error("Invalid wire format: {0}")]
    InvalidWireFormat(String),

    #[error("Buffer too short: expected {expected}, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    #[error("Unknown frame kind: {0:#04x}")]
    UnknownFrameKind(u8),

    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    // Transport errors
    #[error("Unknown peer: machine {0}")]
    UnknownPeer(MachineId),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request to machine {0} timed out")]
    Timeout(MachineId),

    // Machine errors
    #[error("Event log I/O failed: {0}")]
    LogIo(#[from] io::Error),

    #[error("Invalid log record: {0}")]
    InvalidRecord(String),

    #[error("Machine task failed: {0}")]
    TaskFailed(String),

    #[error("Report error: {0}")]
    Report(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SimError {
    /// Transport-class failures are recoverable for the sending machine
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SimError::UnknownPeer(_)
                | SimError::TransportError(_)
                | SimError::ConnectionFailed(_)
                | SimError::Timeout(_)
                | SimError::InvalidWireFormat(_)
                | SimError::BufferTooShort { .. }
                | SimError::UnknownFrameKind(_)
                | SimError::UnknownEventType(_)
        )
    }
}

/// Result type for tickdrift operations
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(SimError::UnknownPeer(MachineId(1)).is_transport());
        assert!(SimError::Timeout(MachineId(1)).is_transport());
        assert!(!SimError::LogIo(io::Error::new(io::ErrorKind::Other, "disk")).is_transport());
        assert!(!SimError::InvalidConfig("x".into()).is_transport());
    }
}
