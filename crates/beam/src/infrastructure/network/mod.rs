//! Network infrastructure: turning addresses into role endpoints.
//!
//! # Sub-modules
//!
//! - **`listener`** – The emitter binds, waits for exactly one absorber, and
//!   releases the listening socket as soon as that connection is accepted.
//!
//! - **`dialer`** – The absorber resolves the emitter's address and opens
//!   one outbound connection.
//!
//! Both hand back a [`beam_core::Endpoint`] with the role already fixed, so
//! nothing above this layer ever touches a raw `TcpStream`.

use std::time::Duration;

use thiserror::Error;

pub mod dialer;
pub mod listener;

/// Error type for connection setup.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("cannot listen on {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("accepting a connection failed")]
    Accept(#[source] std::io::Error),

    #[error("no absorber connected within {0:?}")]
    AcceptTimeout(Duration),

    #[error("cannot connect to {addr}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connecting to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },
}
