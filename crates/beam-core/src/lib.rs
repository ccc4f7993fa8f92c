//! # beam-core
//!
//! Shared library for beam containing the wire protocol codec, the framed
//! stream reader/writer, the role-restricted endpoint, and the per-side
//! session state machine.
//!
//! This crate owns no sockets and no files.  Everything that touches bytes is
//! generic over tokio's `AsyncRead` / `AsyncWrite`, so the same code runs over
//! a `TcpStream` in production and over an in-memory pipe in tests.
//!
//! # Architecture overview (for beginners)
//!
//! beam moves a single file between two machines over one TCP connection.
//! The side that has the file (the *emitter*) listens and prints a short
//! secret called the *beam code*.  The other side (the *absorber*) dials in,
//! presents the code, and on acceptance receives the file in small,
//! individually acknowledged chunks.
//!
//! This crate (`beam-core`) is the shared foundation.  It defines:
//!
//! - **`protocol`** – How bytes travel over the network.  Every message is a
//!   self-delimiting frame (magic, kind, length, payload, CRC-32) and the
//!   framing layer reads exactly one frame at a time from a stream.
//!
//! - **`domain`** – Pure protocol rules with no I/O: which role may send or
//!   receive which message kind, the explicit session state machine, and the
//!   beam code type.
//!
//! - **`endpoint`** – Glues the two together: an [`Endpoint`] owns one
//!   connection and refuses any message that its role or the current session
//!   state does not allow, *before* a single byte is written.

// Declare the top-level modules.
pub mod domain;
pub mod endpoint;
pub mod error;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `beam_core::Message` instead of `beam_core::protocol::messages::Message`.
pub use domain::beam_code::{BeamCode, BeamCodeError};
pub use domain::role::{Absorber, Emitter, Role, Side};
pub use domain::session::{Direction, SessionMachine, SessionState};
pub use endpoint::Endpoint;
pub use error::{BeamError, Violation};
pub use protocol::codec::{decode_message, encode_message, FrameError};
pub use protocol::framing::{read_message, write_message};
pub use protocol::messages::{ChunkSize, FileInfo, Message, MessageKind};
