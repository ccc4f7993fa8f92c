//! All beam protocol message types.
//!
//! A [`Message`] is nothing more than a [`MessageKind`] tag plus an opaque
//! payload.  The only structured payload is [`FileInfo`], carried by
//! `FILE_INFO`; everything else is either empty (`OK`, `NO`), a beam code
//! (`BEAM_CODE`), or raw file bytes (`FILE_CHUNK`).

use std::fmt;

use crate::protocol::codec::FrameError;

// ── Protocol constants ────────────────────────────────────────────────────────

/// Fixed prefix of every frame.  Anything else is a foreign or corrupt stream.
pub const MAGIC: [u8; 4] = [0x06, 0x07, 0x08, 0x09];

/// Bytes before the payload: magic (4) + kind (1) + length (2).
pub const HEADER_SIZE: usize = 7;

/// Bytes after the payload: big-endian CRC-32 of the payload.
pub const TRAILER_SIZE: usize = 4;

/// Size of a frame with an empty payload.
pub const MIN_FRAME_SIZE: usize = HEADER_SIZE + TRAILER_SIZE;

/// Largest payload the 16-bit length field can describe.
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

// ── Message kinds ─────────────────────────────────────────────────────────────

/// The closed set of message kinds, with their on-wire tag bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    /// Positive acknowledgement.
    Ok = 0x01,
    /// Negative acknowledgement (reject / cancel).
    No = 0x02,
    /// The absorber presents the beam code.
    BeamCode = 0x03,
    /// The emitter announces the file (see [`FileInfo`]).
    FileInfo = 0x04,
    /// One slice of file content; an empty payload ends the transfer.
    FileChunk = 0x05,
}

impl MessageKind {
    /// Every kind, in tag order.
    pub const ALL: [MessageKind; 5] = [
        MessageKind::Ok,
        MessageKind::No,
        MessageKind::BeamCode,
        MessageKind::FileInfo,
        MessageKind::FileChunk,
    ];

    /// Returns the protocol name used in logs and error messages.
    pub fn name(self) -> &'static str {
        match self {
            MessageKind::Ok => "OK",
            MessageKind::No => "NO",
            MessageKind::BeamCode => "BEAM_CODE",
            MessageKind::FileInfo => "FILE_INFO",
            MessageKind::FileChunk => "FILE_CHUNK",
        }
    }
}

impl TryFrom<u8> for MessageKind {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0x01 => Ok(MessageKind::Ok),
            0x02 => Ok(MessageKind::No),
            0x03 => Ok(MessageKind::BeamCode),
            0x04 => Ok(MessageKind::FileInfo),
            0x05 => Ok(MessageKind::FileChunk),
            _ => Err(()),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Message ───────────────────────────────────────────────────────────────────

/// One protocol message: a kind tag plus a payload of at most
/// [`MAX_PAYLOAD_SIZE`] bytes.
///
/// The fields are private so the payload bound is checked exactly once, at
/// construction.  That is what lets [`crate::encode_message`] be infallible
/// without ever truncating the length field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    kind: MessageKind,
    payload: Vec<u8>,
}

impl Message {
    /// Builds a message from a kind and an arbitrary payload.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::PayloadTooLarge`] if `payload` does not fit the
    /// 16-bit length field.
    pub fn new(kind: MessageKind, payload: Vec<u8>) -> Result<Self, FrameError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge(payload.len()));
        }
        Ok(Self { kind, payload })
    }

    /// `OK` with no payload.
    pub fn ok() -> Self {
        Self {
            kind: MessageKind::Ok,
            payload: Vec::new(),
        }
    }

    /// `NO` with no payload.
    pub fn no() -> Self {
        Self {
            kind: MessageKind::No,
            payload: Vec::new(),
        }
    }

    /// `BEAM_CODE` carrying the code bytes.
    pub fn beam_code(code: &[u8]) -> Result<Self, FrameError> {
        Self::new(MessageKind::BeamCode, code.to_vec())
    }

    /// `FILE_INFO` carrying the encoded [`FileInfo`].
    pub fn file_info(info: &FileInfo) -> Result<Self, FrameError> {
        Self::new(MessageKind::FileInfo, info.encode()?)
    }

    /// `FILE_CHUNK` carrying a slice of file content.
    pub fn file_chunk(chunk: &[u8]) -> Result<Self, FrameError> {
        Self::new(MessageKind::FileChunk, chunk.to_vec())
    }

    /// The empty `FILE_CHUNK` that marks the end of a transfer.
    pub fn end_of_file() -> Self {
        Self {
            kind: MessageKind::FileChunk,
            payload: Vec::new(),
        }
    }

    /// The message kind.
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// The payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consumes the message and returns its payload.
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// `true` for a `FILE_CHUNK` with an empty payload.
    pub fn is_end_of_file(&self) -> bool {
        self.kind == MessageKind::FileChunk && self.payload.is_empty()
    }
}

// ── FileInfo payload ──────────────────────────────────────────────────────────

/// Metadata announced by the emitter before any file content.
///
/// Layout: `[name_len:2][name:N][size:8]`, all integers big-endian.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// File name as the emitter knows it (not a trusted path).
    pub name: String,
    /// File size in bytes at the time of the announcement.
    pub size: u64,
}

impl FileInfo {
    /// Encodes the metadata into a `FILE_INFO` payload.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::PayloadTooLarge`] if the name does not fit the
    /// 16-bit name length (or the whole payload does not fit a frame).
    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        let name = self.name.as_bytes();
        let name_len =
            u16::try_from(name.len()).map_err(|_| FrameError::PayloadTooLarge(name.len()))?;
        let mut buf = Vec::with_capacity(2 + name.len() + 8);
        buf.extend_from_slice(&name_len.to_be_bytes());
        buf.extend_from_slice(name);
        buf.extend_from_slice(&self.size.to_be_bytes());
        if buf.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge(buf.len()));
        }
        Ok(buf)
    }

    /// Decodes a `FILE_INFO` payload.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::MalformedPayload`] on short input, trailing bytes,
    /// or a name that is not valid UTF-8.
    pub fn decode(payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() < 2 {
            return Err(FrameError::MalformedPayload(
                "FILE_INFO: missing name length".to_string(),
            ));
        }
        let name_len = u16::from_be_bytes([payload[0], payload[1]]) as usize;
        let name_end = 2 + name_len;
        if payload.len() != name_end + 8 {
            return Err(FrameError::MalformedPayload(format!(
                "FILE_INFO: expected {} bytes for a {name_len}-byte name, got {}",
                name_end + 8,
                payload.len()
            )));
        }
        let name = std::str::from_utf8(&payload[2..name_end])
            .map_err(|e| FrameError::MalformedPayload(format!("FILE_INFO: name is not UTF-8: {e}")))?
            .to_string();
        let mut size = [0u8; 8];
        size.copy_from_slice(&payload[name_end..]);
        Ok(Self {
            name,
            size: u64::from_be_bytes(size),
        })
    }
}

// ── Chunk size ────────────────────────────────────────────────────────────────

/// Number of file bytes carried per `FILE_CHUNK`, in `1..=65535`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSize(u16);

impl ChunkSize {
    /// 32 KiB, the production default.
    pub const DEFAULT: ChunkSize = ChunkSize(32 * 1024);

    /// Eight bytes: tiny on purpose so that every frame boundary gets
    /// exercised.  Useful in tests and for protocol debugging.
    pub const REFERENCE: ChunkSize = ChunkSize(8);

    /// Validates a configured chunk size.
    ///
    /// Returns `None` for 0 or anything above 65535.
    pub fn new(bytes: u32) -> Option<Self> {
        match u16::try_from(bytes) {
            Ok(0) | Err(_) => None,
            Ok(n) => Some(Self(n)),
        }
    }

    /// The size in bytes.
    pub fn get(self) -> usize {
        self.0 as usize
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
