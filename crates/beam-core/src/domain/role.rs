//! Role legality rules.
//!
//! Each side of a session may only ever send a fixed subset of message kinds
//! and only ever expect a fixed subset in return:
//!
//! | Role     | May send                      | May receive                   |
//! |----------|-------------------------------|-------------------------------|
//! | Emitter  | OK, NO, FILE_INFO, FILE_CHUNK | BEAM_CODE, OK, NO             |
//! | Absorber | BEAM_CODE, OK, NO             | OK, NO, FILE_INFO, FILE_CHUNK |
//!
//! Roles are zero-sized marker types used as a type parameter of
//! [`Endpoint`](crate::endpoint::Endpoint), so an endpoint's role is fixed at
//! compile time and cannot change for the life of the connection.

use crate::protocol::messages::MessageKind;

/// Runtime tag for the two sides of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Holds the file, listens, verifies the code.
    Emitter,
    /// Dials in, presents the code, receives the file.
    Absorber,
}

impl Side {
    /// `true` if this side is ever allowed to send `kind`.
    pub fn may_send(self, kind: MessageKind) -> bool {
        match self {
            Side::Emitter => matches!(
                kind,
                MessageKind::Ok | MessageKind::No | MessageKind::FileInfo | MessageKind::FileChunk
            ),
            Side::Absorber => matches!(
                kind,
                MessageKind::BeamCode | MessageKind::Ok | MessageKind::No
            ),
        }
    }

    /// `true` if this side is ever allowed to receive `kind`.
    ///
    /// Every kind one side may send is exactly what the other may receive.
    pub fn may_receive(self, kind: MessageKind) -> bool {
        self.peer().may_send(kind)
    }

    /// The opposite side.
    pub fn peer(self) -> Side {
        match self {
            Side::Emitter => Side::Absorber,
            Side::Absorber => Side::Emitter,
        }
    }

    /// Lower-case name used in logs and error messages.
    pub fn name(self) -> &'static str {
        match self {
            Side::Emitter => "emitter",
            Side::Absorber => "absorber",
        }
    }
}

/// Compile-time role marker.
pub trait Role {
    /// Which side this marker stands for.
    const SIDE: Side;
}

/// The side that holds the file.
#[derive(Debug)]
pub enum Emitter {}

/// The side that receives the file.
#[derive(Debug)]
pub enum Absorber {}

impl Role for Emitter {
    const SIDE: Side = Side::Emitter;
}

impl Role for Absorber {
    const SIDE: Side = Side::Absorber;
}
