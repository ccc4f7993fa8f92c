//! Emitter-side TCP listener.
//!
//! An emitter serves exactly one absorber per run.  [`EmitterListener::accept`]
//! therefore consumes the listener: once the single connection is in, the
//! listening socket is closed and later connection attempts are refused by
//! the OS instead of queuing up behind a session that will never serve them.

use std::net::SocketAddr;
use std::time::Duration;

use beam_core::{Emitter, Endpoint};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use super::NetworkError;

/// A bound, not yet accepted, emitter socket.
#[derive(Debug)]
pub struct EmitterListener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl EmitterListener {
    /// Binds `addr` (e.g. `"0.0.0.0:3000"`, or port `0` for any free port).
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Bind`] if the address is invalid or in use.
    pub async fn bind(addr: &str) -> Result<Self, NetworkError> {
        let bind_err = |source| NetworkError::Bind {
            addr: addr.to_string(),
            source,
        };
        let inner = TcpListener::bind(addr).await.map_err(bind_err)?;
        let local_addr = inner.local_addr().map_err(bind_err)?;
        info!("listening on {local_addr}");
        Ok(Self { inner, local_addr })
    }

    /// The address actually bound (resolves port `0`).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits for one absorber, then closes the listening socket.
    ///
    /// `None` waits forever.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::AcceptTimeout`] if nobody connects in time.
    /// - [`NetworkError::Accept`] if the OS reports an accept failure.
    pub async fn accept(
        self,
        timeout: Option<Duration>,
    ) -> Result<Endpoint<Emitter, TcpStream>, NetworkError> {
        let accepted = match timeout {
            Some(limit) => tokio::time::timeout(limit, self.inner.accept())
                .await
                .map_err(|_| NetworkError::AcceptTimeout(limit))?,
            None => self.inner.accept().await,
        };
        let (stream, peer) = accepted.map_err(NetworkError::Accept)?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!("TCP_NODELAY not set: {e}");
        }
        info!("absorber connected from {peer}");
        Ok(Endpoint::new(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_port_zero_reports_real_port() {
        let listener = EmitterListener::bind("127.0.0.1:0").await.unwrap();
        assert_ne!(listener.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_invalid_address_is_bind_error() {
        let err = EmitterListener::bind("not an address").await.unwrap_err();
        assert!(matches!(err, NetworkError::Bind { .. }));
    }

    #[tokio::test]
    async fn test_accept_times_out_without_peer() {
        let listener = EmitterListener::bind("127.0.0.1:0").await.unwrap();

        let err = listener
            .accept(Some(Duration::from_millis(20)))
            .await
            .unwrap_err();

        assert!(matches!(err, NetworkError::AcceptTimeout(_)));
    }

    #[tokio::test]
    async fn test_accept_releases_the_listening_socket() {
        // Arrange
        let listener = EmitterListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr();
        let first = tokio::spawn(async move { TcpStream::connect(addr).await });

        // Act
        let endpoint = listener.accept(None).await.unwrap();
        let _client = first.await.unwrap().unwrap();

        // Assert: the port no longer accepts connections.
        assert!(TcpStream::connect(addr).await.is_err());
        drop(endpoint);
    }
}
