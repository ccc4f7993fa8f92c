//! Framed stream reader/writer.
//!
//! TCP is a *stream* protocol: there are no message boundaries on the wire,
//! and a frame's length depends on its payload.  Reading therefore happens
//! in two phases:
//!
//! 1. Read exactly the 7-byte header, which ends with the payload length.
//! 2. Read exactly `payload_len + 4` more bytes (payload plus CRC trailer).
//!
//! The concatenation is then validated by [`decode_message`], so a frame read
//! from a stream is held to exactly the same rules as a frame decoded from a
//! buffer.  `read_exact` never returns a short read: a peer that disconnects
//! mid-frame surfaces as an `UnexpectedEof` transport error.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::BeamError;
use crate::protocol::codec::{declared_payload_len, decode_message, encode_message};
use crate::protocol::messages::{Message, HEADER_SIZE, TRAILER_SIZE};

/// Encodes `msg` and writes the whole frame, then flushes.
///
/// # Errors
///
/// Returns [`BeamError::Transport`] if the stream fails before every byte
/// was handed over.
pub async fn write_message<W>(writer: &mut W, msg: &Message) -> Result<(), BeamError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let bytes = encode_message(msg);
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    trace!(kind = %msg.kind(), len = bytes.len(), "frame written");
    Ok(())
}

/// Reads exactly one frame from `reader` and decodes it.
///
/// # Errors
///
/// - [`BeamError::Transport`] if the stream errors or ends before the frame
///   is complete.
/// - [`BeamError::MalformedFrame`] if the frame fails validation.
pub async fn read_message<R>(reader: &mut R) -> Result<Message, BeamError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header).await?;

    let payload_len = declared_payload_len(&header);
    let mut frame = Vec::with_capacity(HEADER_SIZE + payload_len + TRAILER_SIZE);
    frame.extend_from_slice(&header);
    frame.resize(HEADER_SIZE + payload_len + TRAILER_SIZE, 0);
    reader.read_exact(&mut frame[HEADER_SIZE..]).await?;

    let msg = decode_message(&frame)?;
    trace!(kind = %msg.kind(), len = frame.len(), "frame read");
    Ok(msg)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
