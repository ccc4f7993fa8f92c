//! Per-side session state machine.
//!
//! A beam session is strictly lock-step: every message from one side is
//! answered by exactly one message from the other before anything else
//! happens.  Seen from the emitter, the legal sequence is:
//!
//! ```text
//!  AwaitingCode ──recv BEAM_CODE──► AwaitingCodeResult
//!  AwaitingCodeResult ──send OK──► AwaitingInfo        ──send NO──► Failed
//!  AwaitingInfo ──send FILE_INFO──► AwaitingInfoResult
//!  AwaitingInfoResult ──recv OK──► Transferring        ──recv NO──► Failed
//!  Transferring ──send FILE_CHUNK──► (ack pending)
//!  (ack pending) ──recv OK──► Transferring, or Done after the empty chunk
//!  (ack pending) ──recv NO──► Failed
//! ```
//!
//! The absorber walks the same states with "send" and "receive" swapped.
//! Anything else is a [`Violation`] and moves the machine to `Failed`, from
//! which no message is legal.
//!
//! The machine performs no I/O.  [`SessionMachine::check`] computes the next
//! step without committing it, so a caller can refuse an illegal send before
//! writing a byte and only [`commit`](SessionMachine::commit) once the write
//! actually went through.

use std::fmt;

use crate::domain::role::Side;
use crate::error::Violation;
use crate::protocol::messages::{Message, MessageKind};

/// Where a session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected; the absorber has not presented a code yet.
    AwaitingCode,
    /// The code is on its way to (or at) the emitter, no verdict yet.
    AwaitingCodeResult,
    /// The code was accepted; the emitter has not announced the file yet.
    AwaitingInfo,
    /// The file was announced; the absorber has not answered yet.
    AwaitingInfoResult,
    /// Chunks are flowing.
    Transferring,
    /// The empty terminator chunk was acknowledged.
    Done,
    /// A NO was exchanged or a violation occurred.
    Failed,
}

impl SessionState {
    /// `true` for `Done` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Done | SessionState::Failed)
    }
}

/// Whether a message is leaving or arriving at this side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Sent,
    Received,
}

impl Direction {
    fn flip(self) -> Direction {
        match self {
            Direction::Sent => Direction::Received,
            Direction::Received => Direction::Sent,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Sent => "send",
            Direction::Received => "receive",
        })
    }
}

/// A computed but not yet committed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a transition does nothing until it is committed"]
pub struct Transition {
    state: SessionState,
    /// `Some(is_terminator)` while a sent chunk awaits its acknowledgement.
    ack_pending: Option<bool>,
}

impl Transition {
    /// The state the session will be in after this step.
    pub fn state(&self) -> SessionState {
        self.state
    }
}

/// The protocol state of one side of one session.
#[derive(Debug, Clone)]
pub struct SessionMachine {
    side: Side,
    state: SessionState,
    ack_pending: Option<bool>,
}

impl SessionMachine {
    /// A fresh machine for `side`, in [`SessionState::AwaitingCode`].
    pub fn new(side: Side) -> Self {
        Self {
            side,
            state: SessionState::AwaitingCode,
            ack_pending: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// `true` once the session reached `Done` or `Failed`.
    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// Computes the step `msg` travelling in `direction` would cause, without
    /// changing anything.
    ///
    /// # Errors
    ///
    /// Returns [`Violation::OutOfOrder`] if the message is not legal in the
    /// current state.
    pub fn check(&self, direction: Direction, msg: &Message) -> Result<Transition, Violation> {
        use MessageKind as K;
        use SessionState as S;

        // One table, written from the emitter's point of view.
        let seen_by_emitter = match self.side {
            Side::Emitter => direction,
            Side::Absorber => direction.flip(),
        };
        let sent = seen_by_emitter == Direction::Sent;
        let received = !sent;
        let kind = msg.kind();

        let step = |state, ack_pending| Transition { state, ack_pending };

        let next = match (self.state, self.ack_pending, kind) {
            (S::AwaitingCode, None, K::BeamCode) if received => step(S::AwaitingCodeResult, None),
            (S::AwaitingCodeResult, None, K::Ok) if sent => step(S::AwaitingInfo, None),
            (S::AwaitingCodeResult, None, K::No) if sent => step(S::Failed, None),
            (S::AwaitingInfo, None, K::FileInfo) if sent => step(S::AwaitingInfoResult, None),
            (S::AwaitingInfoResult, None, K::Ok) if received => step(S::Transferring, None),
            (S::AwaitingInfoResult, None, K::No) if received => step(S::Failed, None),
            (S::Transferring, None, K::FileChunk) if sent => {
                step(S::Transferring, Some(msg.is_end_of_file()))
            }
            (S::Transferring, Some(true), K::Ok) if received => step(S::Done, None),
            (S::Transferring, Some(false), K::Ok) if received => step(S::Transferring, None),
            (S::Transferring, Some(_), K::No) if received => step(S::Failed, None),
            _ => {
                return Err(Violation::OutOfOrder {
                    role: self.side.name(),
                    state: self.state,
                    direction,
                    kind,
                })
            }
        };
        Ok(next)
    }

    /// Applies a step previously returned by [`check`](Self::check).
    pub fn commit(&mut self, transition: Transition) {
        self.state = transition.state;
        self.ack_pending = transition.ack_pending;
    }

    /// Checks and commits in one go.  A violation moves the machine to
    /// [`SessionState::Failed`].
    ///
    /// # Errors
    ///
    /// Returns the [`Violation`] if the message is not legal here.
    pub fn advance(&mut self, direction: Direction, msg: &Message) -> Result<SessionState, Violation> {
        match self.check(direction, msg) {
            Ok(t) => {
                self.commit(t);
                Ok(self.state)
            }
            Err(v) => {
                self.fail();
                Err(v)
            }
        }
    }

    /// Forces the machine into [`SessionState::Failed`].
    pub fn fail(&mut self) {
        self.state = SessionState::Failed;
        self.ack_pending = None;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::FileInfo;

    fn info() -> Message {
        Message::file_info(&FileInfo {
            name: "a.txt".to_string(),
            size: 3,
        })
        .unwrap()
    }

    fn chunk(bytes: &[u8]) -> Message {
        Message::file_chunk(bytes).unwrap()
    }

    /// Drives the machine for `side` through a full successful session with
    /// `n` data chunks.
    fn run_happy_path(side: Side, n: usize) -> SessionMachine {
        let (from_emitter, from_absorber) = match side {
            Side::Emitter => (Direction::Sent, Direction::Received),
            Side::Absorber => (Direction::Received, Direction::Sent),
        };
        let mut m = SessionMachine::new(side);
        m.advance(from_absorber, &Message::beam_code(b"c").unwrap()).unwrap();
        m.advance(from_emitter, &Message::ok()).unwrap();
        m.advance(from_emitter, &info()).unwrap();
        m.advance(from_absorber, &Message::ok()).unwrap();
        for _ in 0..n {
            m.advance(from_emitter, &chunk(b"data")).unwrap();
            m.advance(from_absorber, &Message::ok()).unwrap();
        }
        m.advance(from_emitter, &Message::end_of_file()).unwrap();
        m.advance(from_absorber, &Message::ok()).unwrap();
        m
    }

    #[test]
    fn test_emitter_happy_path_reaches_done() {
        let m = run_happy_path(Side::Emitter, 3);
        assert_eq!(m.state(), SessionState::Done);
        assert!(m.is_finished());
    }

    #[test]
    fn test_absorber_happy_path_reaches_done() {
        let m = run_happy_path(Side::Absorber, 3);
        assert_eq!(m.state(), SessionState::Done);
    }

    #[test]
    fn test_empty_file_session_has_only_the_terminator() {
        assert_eq!(run_happy_path(Side::Emitter, 0).state(), SessionState::Done);
    }

    #[test]
    fn test_code_rejection_fails_emitter() {
        let mut m = SessionMachine::new(Side::Emitter);
        m.advance(Direction::Received, &Message::beam_code(b"x").unwrap()).unwrap();
        let state = m.advance(Direction::Sent, &Message::no()).unwrap();
        assert_eq!(state, SessionState::Failed);
    }

    #[test]
    fn test_info_rejection_fails_absorber() {
        let mut m = SessionMachine::new(Side::Absorber);
        m.advance(Direction::Sent, &Message::beam_code(b"x").unwrap()).unwrap();
        m.advance(Direction::Received, &Message::ok()).unwrap();
        m.advance(Direction::Received, &info()).unwrap();
        assert_eq!(m.advance(Direction::Sent, &Message::no()).unwrap(), SessionState::Failed);
    }

    #[test]
    fn test_chunk_before_ack_is_out_of_order() {
        // Arrange: emitter in Transferring with one chunk unacknowledged.
        let mut m = SessionMachine::new(Side::Emitter);
        m.advance(Direction::Received, &Message::beam_code(b"c").unwrap()).unwrap();
        m.advance(Direction::Sent, &Message::ok()).unwrap();
        m.advance(Direction::Sent, &info()).unwrap();
        m.advance(Direction::Received, &Message::ok()).unwrap();
        m.advance(Direction::Sent, &chunk(b"one")).unwrap();

        // Act
        let err = m.advance(Direction::Sent, &chunk(b"two")).unwrap_err();

        // Assert
        assert!(matches!(
            err,
            Violation::OutOfOrder {
                state: SessionState::Transferring,
                direction: Direction::Sent,
                kind: MessageKind::FileChunk,
                ..
            }
        ));
        assert_eq!(m.state(), SessionState::Failed);
    }

    #[test]
    fn test_ok_without_pending_chunk_is_out_of_order() {
        let mut m = SessionMachine::new(Side::Emitter);
        m.advance(Direction::Received, &Message::beam_code(b"c").unwrap()).unwrap();
        m.advance(Direction::Sent, &Message::ok()).unwrap();
        m.advance(Direction::Sent, &info()).unwrap();
        m.advance(Direction::Received, &Message::ok()).unwrap();
        assert!(m.advance(Direction::Received, &Message::ok()).is_err());
    }

    #[test]
    fn test_file_info_before_code_accepted_is_out_of_order() {
        let m = SessionMachine::new(Side::Emitter);
        assert!(m.check(Direction::Sent, &info()).is_err());
    }

    #[test]
    fn test_check_does_not_mutate() {
        let m = SessionMachine::new(Side::Absorber);
        let t = m.check(Direction::Sent, &Message::beam_code(b"c").unwrap()).unwrap();
        assert_eq!(t.state(), SessionState::AwaitingCodeResult);
        assert_eq!(m.state(), SessionState::AwaitingCode);
    }

    #[test]
    fn test_nothing_is_legal_after_done_or_failed() {
        let done = run_happy_path(Side::Emitter, 1);
        for kind_msg in [Message::ok(), Message::no(), chunk(b"x"), info()] {
            assert!(done.check(Direction::Sent, &kind_msg).is_err());
            assert!(done.check(Direction::Received, &kind_msg).is_err());
        }

        let mut failed = SessionMachine::new(Side::Absorber);
        failed.fail();
        assert!(failed
            .check(Direction::Sent, &Message::beam_code(b"c").unwrap())
            .is_err());
    }
}
