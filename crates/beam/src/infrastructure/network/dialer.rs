//! Absorber-side TCP dialer.

use std::time::Duration;

use beam_core::{Absorber, Endpoint};
use tokio::net::TcpStream;
use tracing::{debug, info};

use super::NetworkError;

/// Resolves `host:port` and opens one connection to the emitter.
///
/// `timeout` bounds resolution plus the TCP handshake; `None` leaves it to
/// the OS.
///
/// # Errors
///
/// - [`NetworkError::Connect`] if resolution or the connection fails.
/// - [`NetworkError::ConnectTimeout`] if `timeout` elapses first.
pub async fn connect(
    host: &str,
    port: u16,
    timeout: Option<Duration>,
) -> Result<Endpoint<Absorber, TcpStream>, NetworkError> {
    let addr = format!("{host}:{port}");
    debug!("connecting to {addr}");

    let attempt = TcpStream::connect(addr.as_str());
    let connected = match timeout {
        Some(limit) => match tokio::time::timeout(limit, attempt).await {
            Ok(result) => result,
            Err(_) => {
                return Err(NetworkError::ConnectTimeout {
                    addr,
                    timeout: limit,
                })
            }
        },
        None => attempt.await,
    };
    let stream = connected.map_err(|source| NetworkError::Connect {
        addr: addr.clone(),
        source,
    })?;

    if let Err(e) = stream.set_nodelay(true) {
        debug!("TCP_NODELAY not set: {e}");
    }
    info!("connected to emitter at {addr}");
    Ok(Endpoint::new(stream))
}
