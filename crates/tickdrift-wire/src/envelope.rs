//! Complete frames for the RPC protocol
//!
//! Envelope = Fixed Header + Body, where the body is either a
//! ClockMessage (request) or an Ack (reply).

use bytes::{Buf, BufMut, BytesMut};

use tickdrift_core::{Ack, ClockMessage, MachineId, MessageKind, SimError, SimResult};

use crate::{FrameHeader, FrameKind, HEADER_SIZE, MAX_BODY_SIZE};

/// Encoded ClockMessage body size
pub const CLOCK_MESSAGE_SIZE: usize = 33;

/// One RPC frame
#[derive(Clone, Debug, PartialEq)]
pub enum Envelope {
    SendMessage(ClockMessage),
    Ack(Ack),
}

impl Envelope {
    pub fn kind(&self) -> FrameKind {
        match self {
            Envelope::SendMessage(_) => FrameKind::SendMessage,
            Envelope::Ack(_) => FrameKind::Ack,
        }
    }

    /// Serialize header and body into one buffer
    pub fn encode(&self) -> SimResult<Vec<u8>> {
        let mut body = BytesMut::with_capacity(CLOCK_MESSAGE_SIZE);
        match self {
            Envelope::SendMessage(msg) => encode_clock_message(msg, &mut body),
            Envelope::Ack(ack) => encode_ack(ack, &mut body)?,
        }

        if body.len() > MAX_BODY_SIZE {
            return Err(SimError::InvalidWireFormat(format!(
                "Body too large: {} > {}",
                body.len(),
                MAX_BODY_SIZE
            )));
        }

        let header = FrameHeader::new(self.kind(), body.len() as u32);
        let mut buf = Vec::with_capacity(HEADER_SIZE + body.len());
        buf.extend_from_slice(&header.to_bytes());
        buf.extend_from_slice(&body);
        Ok(buf)
    }

    /// Decode a body whose header has already been read
    pub fn decode_body(kind: FrameKind, body: &[u8]) -> SimResult<Self> {
        match kind {
            FrameKind::SendMessage => decode_clock_message(body).map(Envelope::SendMessage),
            FrameKind::Ack => decode_ack(body).map(Envelope::Ack),
        }
    }

    /// Decode one complete frame; the buffer must hold exactly one frame
    pub fn decode(buf: &[u8]) -> SimResult<Self> {
        let header = FrameHeader::parse(buf)?;
        let expected = HEADER_SIZE + header.body_len as usize;
        if buf.len() < expected {
            return Err(SimError::BufferTooShort {
                expected,
                actual: buf.len(),
            });
        }
        if buf.len() > expected {
            return Err(SimError::InvalidWireFormat(format!(
                "{} trailing bytes after frame",
                buf.len() - expected
            )));
        }
        Self::decode_body(header.kind, &buf[HEADER_SIZE..])
    }
}

fn encode_clock_message(msg: &ClockMessage, out: &mut BytesMut) {
    out.put_u64_le(msg.sender_id.to_wire());
    out.put_u64_le(msg.logical_clock);
    out.put_f64_le(msg.sender_system_time);
    out.put_u64_le(msg.queue_length);
    out.put_u8(msg.event_type.to_byte());
}

fn decode_clock_message(mut body: &[u8]) -> SimResult<ClockMessage> {
    if body.len() != CLOCK_MESSAGE_SIZE {
        return Err(SimError::InvalidWireFormat(format!(
            "ClockMessage body must be {} bytes, got {}",
            CLOCK_MESSAGE_SIZE,
            body.len()
        )));
    }

    let raw_sender = body.get_u64_le();
    let sender_id = MachineId::from_wire(raw_sender).ok_or_else(|| {
        SimError::InvalidWireFormat(format!("Sender id out of range: {}", raw_sender))
    })?;
    let logical_clock = body.get_u64_le();
    let sender_system_time = body.get_f64_le();
    let queue_length = body.get_u64_le();
    let tag = body.get_u8();
    let event_type = MessageKind::from_byte(tag)
        .ok_or_else(|| SimError::UnknownEventType(format!("{:#04x}", tag)))?;

    Ok(ClockMessage::new(
        sender_id,
        logical_clock,
        sender_system_time,
        queue_length,
        event_type,
    ))
}

fn encode_ack(ack: &Ack, out: &mut BytesMut) -> SimResult<()> {
    let status = ack.status.as_bytes();
    let len = u16::try_from(status.len())
        .map_err(|_| SimError::InvalidWireFormat("Ack status too long".into()))?;
    out.put_u16_le(len);
    out.put_slice(status);
    Ok(())
}

fn decode_ack(mut body: &[u8]) -> SimResult<Ack> {
    if body.len() < 2 {
        return Err(SimError::BufferTooShort {
            expected: 2,
            actual: body.len(),
        });
    }
    let len = body.get_u16_le() as usize;
    if body.len() != len {
        return Err(SimError::InvalidWireFormat(format!(
            "Ack status length {} does not match remaining {}",
            len,
            body.len()
        )));
    }
    let status = std::str::from_utf8(body)
        .map_err(|e| SimError::InvalidWireFormat(format!("Ack status: {}", e)))?;
    Ok(Ack::new(status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_message() -> ClockMessage {
        ClockMessage::new(MachineId(2), 41, 1700000000.25, 3, MessageKind::Send)
    }

    #[test]
    fn test_clock_message_frame_size() {
        let bytes = Envelope::SendMessage(sample_message()).encode().unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + CLOCK_MESSAGE_SIZE);
        assert_eq!(bytes[1], FrameKind::SendMessage.to_byte());
        assert_eq!(bytes[HEADER_SIZE..HEADER_SIZE + 8], 2u64.to_le_bytes());
    }

    #[test]
    fn test_decode_clock_message() {
        let msg = sample_message();
        let bytes = Envelope::SendMessage(msg.clone()).encode().unwrap();
        assert_eq!(Envelope::decode(&bytes).unwrap(), Envelope::SendMessage(msg));
    }

    #[test]
    fn test_decode_ack() {
        let bytes = Envelope::Ack(Ack::ok()).encode().unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + 2 + 2);
        assert_eq!(Envelope::decode(&bytes).unwrap(), Envelope::Ack(Ack::ok()));
    }

    #[test]
    fn test_unknown_event_type_tag() {
        let mut bytes = Envelope::SendMessage(sample_message()).encode().unwrap();
        let last = bytes.len() - 1;
        bytes[last] = 0x09;
        assert!(matches!(
            Envelope::decode(&bytes),
            Err(SimError::UnknownEventType(_))
        ));
    }

    #[test]
    fn test_sender_id_out_of_range() {
        let mut bytes = Envelope::SendMessage(sample_message()).encode().unwrap();
        bytes[HEADER_SIZE..HEADER_SIZE + 8].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(Envelope::decode(&bytes).is_err());
    }

    #[test]
    fn test_truncated_and_trailing() {
        let bytes = Envelope::SendMessage(sample_message()).encode().unwrap();
        assert!(matches!(
            Envelope::decode(&bytes[..bytes.len() - 1]),
            Err(SimError::BufferTooShort { .. })
        ));

        let mut long = bytes.clone();
        long.push(0);
        assert!(Envelope::decode(&long).is_err());
    }

    #[test]
    fn test_ack_length_mismatch_and_utf8() {
        let mut bytes = Envelope::Ack(Ack::ok()).encode().unwrap();
        bytes[HEADER_SIZE] = 5;
        assert!(Envelope::decode(&bytes).is_err());

        let mut bad_utf8 = Envelope::Ack(Ack::ok()).encode().unwrap();
        bad_utf8[HEADER_SIZE + 2] = 0xFF;
        assert!(Envelope::decode(&bad_utf8).is_err());
    }

    #[test]
    fn test_wrong_body_for_kind() {
        let ack_body = Envelope::Ack(Ack::ok()).encode().unwrap();
        assert!(Envelope::decode_body(FrameKind::SendMessage, &ack_body[HEADER_SIZE..]).is_err());
    }

    proptest! {
        #[test]
        fn prop_arbitrary_bytes_never_panic(buf in proptest::collection::vec(any::<u8>(), 0..64)) {
            let _ = Envelope::decode(&buf);
        }

        #[test]
        fn prop_clock_fields_survive(
            sender in any::<u32>(),
            clock in any::<u64>(),
            queue in any::<u64>(),
            time in 0.0f64..4.0e9,
        ) {
            let msg = ClockMessage::new(MachineId(sender), clock, time, queue, MessageKind::Internal);
            let bytes = Envelope::SendMessage(msg.clone()).encode().unwrap();
            prop_assert_eq!(Envelope::decode(&bytes).unwrap(), Envelope::SendMessage(msg));
        }
    }
}
