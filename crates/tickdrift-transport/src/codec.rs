//! Async framing of envelopes over byte streams

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use tickdrift_core::{SimError, SimResult};
use tickdrift_wire::{Envelope, FrameHeader, HEADER_SIZE};

fn io_error(e: io::Error) -> SimError {
    SimError::TransportError(e.to_string())
}

/// Read one envelope. Returns `None` if the stream closed before a header.
pub async fn read_envelope<R>(reader: &mut R) -> SimResult<Option<Envelope>>
where
    R: AsyncRead + Unpin,
{
    let mut header_buf = [0u8; HEADER_SIZE];
    match reader.read_exact(&mut header_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(io_error(e)),
    }

    let header = FrameHeader::parse(&header_buf)?;
    let mut body = vec![0u8; header.body_len as usize];
    reader.read_exact(&mut body).await.map_err(io_error)?;

    Envelope::decode_body(header.kind, &body).map(Some)
}

/// Write one envelope and flush
pub async fn write_envelope<W>(writer: &mut W, envelope: &Envelope) -> SimResult<()>
where
    W: AsyncWrite + Unpin,
{
    let bytes = envelope.encode()?;
    writer.write_all(&bytes).await.map_err(io_error)?;
    writer.flush().await.map_err(io_error)?;
    Ok(())
}
