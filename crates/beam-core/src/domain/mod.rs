//! Domain layer: protocol rules with no I/O.
//!
//! - [`role`] – which side may send or receive which message kind.
//! - [`session`] – the explicit per-side state machine.
//! - [`beam_code`] – the shared secret the absorber presents.

pub mod beam_code;
pub mod role;
pub mod session;
