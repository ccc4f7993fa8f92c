//! Binary codec for encoding and decoding beam protocol messages.
//!
//! Wire format:
//! ```text
//! [magic:4][kind:1][payload_len:2][payload:N][crc32:4]
//! ```
//! Header size: 7 bytes, trailer size: 4 bytes.  All multi-byte integers are
//! big-endian.  The CRC-32 (IEEE polynomial) covers the payload only.

use thiserror::Error;

use crate::protocol::messages::{
    Message, MessageKind, HEADER_SIZE, MAGIC, MIN_FRAME_SIZE, TRAILER_SIZE,
};

/// Errors that can occur while building or decoding a frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The buffer is shorter than an empty-payload frame.
    #[error("frame too short: need at least {needed} bytes, got {available}")]
    TooShort { needed: usize, available: usize },

    /// The first four bytes are not the protocol magic.
    #[error("bad magic: expected {expected:02X?}, got {found:02X?}")]
    BadMagic { expected: [u8; 4], found: [u8; 4] },

    /// The kind byte is not one of the five known tags.
    #[error("unknown message kind: 0x{0:02X}")]
    UnknownKind(u8),

    /// The declared payload length does not match the bytes between header and trailer.
    #[error("payload length mismatch: header says {declared}, frame carries {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// The trailing CRC-32 does not match the payload.
    #[error("checksum mismatch: trailer says 0x{expected:08X}, payload hashes to 0x{actual:08X}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// A payload does not fit the 16-bit length field.
    #[error("payload of {0} bytes exceeds the 65535-byte frame limit")]
    PayloadTooLarge(usize),

    /// A structured payload (e.g. `FILE_INFO`) could not be parsed.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`Message`] into exactly `11 + payload.len()` bytes.
///
/// Never fails: [`Message`] already guarantees the payload fits the length
/// field.
///
/// # Examples
///
/// ```rust
/// use beam_core::protocol::{decode_message, encode_message, Message};
///
/// let msg = Message::file_chunk(b"hello").unwrap();
/// let bytes = encode_message(&msg);
/// assert_eq!(bytes.len(), 11 + 5);
/// assert_eq!(decode_message(&bytes).unwrap(), msg);
/// ```
pub fn encode_message(msg: &Message) -> Vec<u8> {
    let payload = msg.payload();
    // Checked by Message::new.
    let payload_len = payload.len() as u16;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len() + TRAILER_SIZE);
    buf.extend_from_slice(&MAGIC);
    buf.push(msg.kind() as u8);
    buf.extend_from_slice(&payload_len.to_be_bytes());
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&checksum(payload).to_be_bytes());
    buf
}

/// Decodes exactly one frame occupying the whole of `bytes`.
///
/// Checks, in order: minimum length, magic, kind, declared length against
/// the actual span, and the CRC-32 trailer.  Any failure rejects the frame
/// with no partial result.
///
/// # Errors
///
/// Returns the [`FrameError`] for the first check that fails.
pub fn decode_message(bytes: &[u8]) -> Result<Message, FrameError> {
    if bytes.len() < MIN_FRAME_SIZE {
        return Err(FrameError::TooShort {
            needed: MIN_FRAME_SIZE,
            available: bytes.len(),
        });
    }

    let found = [bytes[0], bytes[1], bytes[2], bytes[3]];
    if found != MAGIC {
        return Err(FrameError::BadMagic {
            expected: MAGIC,
            found,
        });
    }

    let kind_byte = bytes[4];
    let kind = MessageKind::try_from(kind_byte).map_err(|_| FrameError::UnknownKind(kind_byte))?;

    let declared = u16::from_be_bytes([bytes[5], bytes[6]]) as usize;
    let actual = bytes.len() - MIN_FRAME_SIZE;
    if declared != actual {
        return Err(FrameError::LengthMismatch { declared, actual });
    }

    let payload = &bytes[HEADER_SIZE..HEADER_SIZE + declared];
    let trailer = &bytes[HEADER_SIZE + declared..];
    let expected = u32::from_be_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let actual_crc = checksum(payload);
    if expected != actual_crc {
        return Err(FrameError::ChecksumMismatch {
            expected,
            actual: actual_crc,
        });
    }

    Message::new(kind, payload.to_vec())
}

/// Reads the payload length out of a frame header.
///
/// Only the length field (offsets 5–6) is looked at; magic and kind are
/// validated later by [`decode_message`] over the complete frame.
pub fn declared_payload_len(header: &[u8; HEADER_SIZE]) -> usize {
    u16::from_be_bytes([header[5], header[6]]) as usize
}

fn checksum(payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(payload);
    hasher.finalize()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
