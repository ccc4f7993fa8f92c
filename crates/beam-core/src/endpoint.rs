//! Role-restricted connection endpoint.
//!
//! An [`Endpoint`] owns one established byte stream and exposes exactly three
//! operations: [`send`](Endpoint::send), [`receive`](Endpoint::receive), and
//! [`close`](Endpoint::close).  Every message goes through two gates:
//!
//! 1. **Role** – is this kind ever legal for this side in this direction?
//! 2. **Session** – is it legal *now*, given the lock-step sequence?
//!
//! An outgoing message that fails either gate is refused before a single
//! byte reaches the stream.  An incoming message that fails either gate is
//! reported as a [`BeamError::ProtocolViolation`].  Either way the session
//! is marked failed and the caller is expected to close the endpoint.
//!
//! `close` consumes the endpoint, so closing twice or using a closed
//! endpoint does not compile.

use std::marker::PhantomData;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::domain::role::Role;
use crate::domain::session::{Direction, SessionMachine, SessionState};
use crate::error::{BeamError, Violation};
use crate::protocol::framing::{read_message, write_message};
use crate::protocol::messages::Message;

/// One side of one beam session over stream `S`, acting as role `R`.
#[derive(Debug)]
pub struct Endpoint<R: Role, S> {
    stream: S,
    session: SessionMachine,
    _role: PhantomData<R>,
}

impl<R, S> Endpoint<R, S>
where
    R: Role,
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an already-established stream.  The session starts in
    /// [`SessionState::AwaitingCode`].
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            session: SessionMachine::new(R::SIDE),
            _role: PhantomData,
        }
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Sends one message.
    ///
    /// # Errors
    ///
    /// - [`BeamError::ProtocolViolation`] if the role or the session forbids
    ///   the message.  Nothing is written in that case.
    /// - [`BeamError::Transport`] if the write fails.
    pub async fn send(&mut self, msg: &Message) -> Result<(), BeamError> {
        let side = R::SIDE;
        if !side.may_send(msg.kind()) {
            self.session.fail();
            return Err(Violation::IllegalSend {
                role: side.name(),
                kind: msg.kind(),
            }
            .into());
        }

        let transition = match self.session.check(Direction::Sent, msg) {
            Ok(t) => t,
            Err(v) => {
                self.session.fail();
                return Err(v.into());
            }
        };

        if let Err(e) = write_message(&mut self.stream, msg).await {
            self.session.fail();
            return Err(e);
        }
        self.session.commit(transition);
        debug!(
            role = side.name(),
            kind = %msg.kind(),
            payload_len = msg.payload().len(),
            state = ?self.session.state(),
            "sent"
        );
        Ok(())
    }

    /// Receives one message.
    ///
    /// # Errors
    ///
    /// - [`BeamError::Transport`] if the stream fails or ends mid-frame.
    /// - [`BeamError::MalformedFrame`] if the frame fails validation.
    /// - [`BeamError::ProtocolViolation`] if the role or the session forbids
    ///   the received kind.
    pub async fn receive(&mut self) -> Result<Message, BeamError> {
        let side = R::SIDE;
        let msg = match read_message(&mut self.stream).await {
            Ok(msg) => msg,
            Err(e) => {
                self.session.fail();
                return Err(e);
            }
        };

        if !side.may_receive(msg.kind()) {
            self.session.fail();
            warn!(role = side.name(), kind = %msg.kind(), "peer sent a kind this role never receives");
            return Err(Violation::IllegalReceive {
                role: side.name(),
                kind: msg.kind(),
            }
            .into());
        }

        self.session.advance(Direction::Received, &msg)?;
        debug!(
            role = side.name(),
            kind = %msg.kind(),
            payload_len = msg.payload().len(),
            state = ?self.session.state(),
            "received"
        );
        Ok(msg)
    }

    /// Shuts the stream down and drops the endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`BeamError::Transport`] if the shutdown fails.  The stream is
    /// dropped either way.
    pub async fn close(mut self) -> Result<(), BeamError> {
        debug!(role = R::SIDE.name(), state = ?self.session.state(), "closing endpoint");
        self.stream.shutdown().await?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
