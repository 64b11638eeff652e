//! Fixed header for the tickdrift wire protocol
//!
//! Fixed header is 8 bytes:
//! - Byte 0: Version
//! - Byte 1: Frame kind
//! - Bytes 2-3: Reserved, zero (LE)
//! - Bytes 4-7: Body length (LE)

use tickdrift_core::{SimError, SimResult};

/// Fixed header size in bytes
pub const HEADER_SIZE: usize = 8;

/// Current wire protocol version
pub const WIRE_VERSION: u8 = 1;

/// Largest body a peer will accept
pub const MAX_BODY_SIZE: usize = 4096;

/// Frame kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    /// `SendMessage(ClockMessage)` request
    SendMessage = 0x01,
    /// `Ack` reply
    Ack = 0x02,
}

impl FrameKind {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(FrameKind::SendMessage),
            0x02 => Some(FrameKind::Ack),
            _ => None,
        }
    }

    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Fixed header structure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: u8,
    pub kind: FrameKind,
    /// Length of the body that follows the header
    pub body_len: u32,
}

impl FrameHeader {
    pub fn new(kind: FrameKind, body_len: u32) -> Self {
        FrameHeader {
            version: WIRE_VERSION,
            kind,
            body_len,
        }
    }

    /// Parse header from bytes
    pub fn parse(buf: &[u8]) -> SimResult<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(SimError::BufferTooShort {
                expected: HEADER_SIZE,
                actual: buf.len(),
            });
        }

        let version = buf[0];
        if version != WIRE_VERSION {
            return Err(SimError::InvalidWireFormat(format!(
                "Unsupported version {}",
                version
            )));
        }

        let kind = FrameKind::from_byte(buf[1]).ok_or(SimError::UnknownFrameKind(buf[1]))?;

        let reserved = u16::from_le_bytes([buf[2], buf[3]]);
        if reserved != 0 {
            return Err(SimError::InvalidWireFormat(
                "Reserved header bits set".into(),
            ));
        }

        let body_len = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        if body_len as usize > MAX_BODY_SIZE {
            return Err(SimError::InvalidWireFormat(format!(
                "Body too large: {} > {}",
                body_len, MAX_BODY_SIZE
            )));
        }

        Ok(FrameHeader {
            version,
            kind,
            body_len,
        })
    }

    /// Serialize header into the first `HEADER_SIZE` bytes of `buf`
    pub fn serialize(&self, buf: &mut [u8]) -> SimResult<()> {
        if buf.len() < HEADER_SIZE {
            return Err(SimError::BufferTooShort {
                expected: HEADER_SIZE,
                actual: buf.len(),
            });
        }

        buf[0] = self.version;
        buf[1] = self.kind.to_byte();
        buf[2..4].copy_from_slice(&0u16.to_le_bytes());
        buf[4..8].copy_from_slice(&self.body_len.to_le_bytes());

        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0] = self.version;
        buf[1] = self.kind.to_byte();
        buf[4..8].copy_from_slice(&self.body_len.to_le_bytes());
        buf
    }
}
