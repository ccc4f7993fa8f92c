//! Protocol module containing message types, the binary codec, and the
//! framed stream reader/writer.

pub mod codec;
pub mod framing;
pub mod messages;

pub use codec::{decode_message, encode_message, FrameError};
pub use framing::{read_message, write_message};
pub use messages::*;
