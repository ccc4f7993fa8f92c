//! Error taxonomy shared by every beam session.
//!
//! Every failure is fatal to the connection it happened on.  Nothing in this
//! crate retries; starting a fresh session is a caller decision.

use thiserror::Error;

use crate::domain::session::{Direction, SessionState};
use crate::protocol::codec::FrameError;
use crate::protocol::messages::MessageKind;

/// A session-level failure.
#[derive(Debug, Error)]
pub enum BeamError {
    /// A received frame failed structural or integrity validation.  The
    /// stream is at an unknown offset afterwards.
    #[error("malformed frame")]
    MalformedFrame(#[from] FrameError),

    /// A message kind outside what the role or the session state allows.
    #[error("protocol violation")]
    ProtocolViolation(#[from] Violation),

    /// The underlying connection failed (reset, EOF mid-frame, ...).
    #[error("transport error")]
    Transport(#[from] std::io::Error),

    /// The presented beam code did not match.
    #[error("beam code rejected")]
    AuthenticationFailure,

    /// The absorber declined the announced file.
    #[error("transfer rejected by absorber")]
    TransferRejected,

    /// The absorber answered a chunk with NO.
    #[error("transfer canceled by absorber")]
    TransferCanceled,
}

/// Details of a [`BeamError::ProtocolViolation`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The role may never send this kind.
    #[error("{role} may not send {kind}")]
    IllegalSend {
        role: &'static str,
        kind: MessageKind,
    },

    /// The role may never receive this kind.
    #[error("{role} may not receive {kind}")]
    IllegalReceive {
        role: &'static str,
        kind: MessageKind,
    },

    /// The kind is legal for the role but not in the current session state.
    #[error("{role} cannot {direction} {kind} while {state:?}")]
    OutOfOrder {
        role: &'static str,
        state: SessionState,
        direction: Direction,
        kind: MessageKind,
    },
}
