//! EmitFileUseCase: the sending side of a beam session.
//!
//! ```text
//!  absorber                      emitter (this use case)
//!     │ ── BEAM_CODE(code) ──────────► │  compare byte-for-byte
//!     │ ◄───────────────── OK / NO ─── │  NO ends the session
//!     │ ◄──────────── FILE_INFO(meta) ─ │
//!     │ ── OK / NO ──────────────────► │  NO: TransferRejected
//!     │ ◄──────────── FILE_CHUNK(data) ─ │ ┐
//!     │ ── OK / NO ──────────────────► │ ┘ repeat; NO: TransferCanceled
//!     │ ◄──────────── FILE_CHUNK([]) ── │  end of file
//!     │ ── OK ───────────────────────► │  done
//! ```
//!
//! The source is read in chunks of at most `chunk_size` bytes.  A chunk is
//! only short when the source is exhausted, and the empty terminator is only
//! sent once a read returns zero bytes.

use std::future::Future;

use beam_core::{BeamCode, BeamError, ChunkSize, Emitter, Endpoint, FileInfo, Message, MessageKind};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tracing::{debug, info, warn};

/// Text shown while the emitter waits for a connection.
pub const WAITING_MESSAGE: &str = "Waiting for absorber...";

/// Error type for the emit use case.
#[derive(Debug, Error)]
pub enum EmitError {
    /// No absorber connection could be obtained.
    #[error("waiting for an absorber failed")]
    Accept(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The session itself failed (code mismatch, refusal, transport, ...).
    #[error(transparent)]
    Session(#[from] BeamError),

    /// Reading the file being sent failed.
    #[error("reading the source failed")]
    Source(#[source] std::io::Error),
}

/// Start/stop progress display shown while waiting for the absorber.
///
/// `stop` may be called more than once and must be a no-op after the first.
#[cfg_attr(test, mockall::automock)]
pub trait ProgressIndicator: Send {
    fn start(&mut self, message: &str);
    fn stop(&mut self);
}

/// A [`ProgressIndicator`] that shows nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressIndicator for NoProgress {
    fn start(&mut self, _message: &str) {}
    fn stop(&mut self) {}
}

/// Summary of a completed emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EmitReport {
    /// `FILE_CHUNK` messages sent, including the empty terminator.
    pub chunks_sent: u64,
    /// File bytes sent.
    pub bytes_sent: u64,
}

/// The Emit File use case.
pub struct EmitFileUseCase<P> {
    code: BeamCode,
    chunk_size: ChunkSize,
    progress: P,
}

impl<P: ProgressIndicator> EmitFileUseCase<P> {
    /// Creates a use case that will only serve an absorber presenting `code`.
    pub fn new(code: BeamCode, chunk_size: ChunkSize, progress: P) -> Self {
        Self {
            code,
            chunk_size,
            progress,
        }
    }

    pub fn code(&self) -> &BeamCode {
        &self.code
    }

    /// Waits for one absorber, runs the session, and closes the connection.
    ///
    /// The progress indicator runs from before the wait until the file is
    /// announced (or the session fails, whichever comes first).
    ///
    /// # Errors
    ///
    /// - [`EmitError::Accept`] if `accept` fails.
    /// - Anything [`transfer`](Self::transfer) returns.
    pub async fn execute<S, R, F, E>(
        &mut self,
        accept: F,
        info: &FileInfo,
        source: &mut R,
    ) -> Result<EmitReport, EmitError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
        R: AsyncRead + Unpin,
        F: Future<Output = Result<Endpoint<Emitter, S>, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.progress.start(WAITING_MESSAGE);
        let mut endpoint = match accept.await {
            Ok(endpoint) => endpoint,
            Err(e) => {
                self.progress.stop();
                return Err(EmitError::Accept(Box::new(e)));
            }
        };

        let result = self.transfer(&mut endpoint, info, source).await;
        self.progress.stop();

        if let Err(e) = endpoint.close().await {
            debug!(error = ?e, "closing emitter connection failed");
        }
        result
    }

    /// Runs one session over an already-connected endpoint.
    ///
    /// # Errors
    ///
    /// - [`BeamError::AuthenticationFailure`] after answering a wrong code with NO.
    /// - [`BeamError::TransferRejected`] if the absorber declines the file.
    /// - [`BeamError::TransferCanceled`] if the absorber answers a chunk with NO.
    /// - [`EmitError::Source`] if reading the source fails.
    /// - Any transport, framing, or protocol failure of the connection.
    pub async fn transfer<S, R>(
        &mut self,
        endpoint: &mut Endpoint<Emitter, S>,
        info: &FileInfo,
        source: &mut R,
    ) -> Result<EmitReport, EmitError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
        R: AsyncRead + Unpin,
    {
        // ── Code exchange ─────────────────────────────────────────────────────
        let presented = endpoint.receive().await?;
        if !self.code.matches(presented.payload()) {
            warn!("absorber presented a wrong beam code");
            endpoint.send(&Message::no()).await?;
            return Err(BeamError::AuthenticationFailure.into());
        }
        endpoint.send(&Message::ok()).await?;
        info!("absorber authenticated");

        // ── Metadata handoff ──────────────────────────────────────────────────
        self.progress.stop();
        let announce = Message::file_info(info).map_err(BeamError::from)?;
        endpoint.send(&announce).await?;
        if endpoint.receive().await?.kind() == MessageKind::No {
            warn!(name = %info.name, "absorber declined the file");
            return Err(BeamError::TransferRejected.into());
        }

        // ── Chunk loop ────────────────────────────────────────────────────────
        let mut report = EmitReport::default();
        let mut buf = vec![0u8; self.chunk_size.get()];
        loop {
            let n = fill(source, &mut buf).await.map_err(EmitError::Source)?;
            let chunk = Message::file_chunk(&buf[..n]).map_err(BeamError::from)?;
            endpoint.send(&chunk).await?;
            report.chunks_sent += 1;
            report.bytes_sent += n as u64;

            if endpoint.receive().await?.kind() == MessageKind::No {
                warn!(chunk = report.chunks_sent, "absorber canceled the transfer");
                return Err(BeamError::TransferCanceled.into());
            }
            debug!(chunk = report.chunks_sent, len = n, "chunk acknowledged");
            if n == 0 {
                break;
            }
        }

        info!(
            name = %info.name,
            bytes = report.bytes_sent,
            chunks = report.chunks_sent,
            "file sent"
        );
        Ok(report)
    }
}

/// Reads until `buf` is full or the source is exhausted.
async fn fill<R: AsyncRead + Unpin>(source: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = source.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use beam_core::{Absorber, SessionState};
    use tokio::io::{duplex, DuplexStream};

    fn endpoints() -> (Endpoint<Emitter, DuplexStream>, Endpoint<Absorber, DuplexStream>) {
        let (a, b) = duplex(4096);
        (Endpoint::new(a), Endpoint::new(b))
    }

    fn info(size: u64) -> FileInfo {
        FileInfo {
            name: "data.bin".to_string(),
            size,
        }
    }

    fn stopping_progress() -> MockProgressIndicator {
        let mut progress = MockProgressIndicator::new();
        progress.expect_stop().times(1..).return_const(());
        progress
    }

    #[tokio::test]
    async fn test_fill_collects_short_reads_into_a_full_buffer() {
        // Arrange: a source that trickles 3 bytes at a time.
        let mut source = tokio_test::io::Builder::new()
            .read(b"abc")
            .read(b"def")
            .read(b"ghi")
            .build();
        let mut buf = [0u8; 8];

        // Act
        let first = fill(&mut source, &mut buf).await.unwrap();
        let rest = fill(&mut source, &mut buf).await.unwrap();

        // Assert
        assert_eq!(first, 8);
        assert_eq!(rest, 1);
        assert_eq!(buf[0], b'i');
    }

    #[tokio::test]
    async fn test_transfer_sends_chunks_and_terminator() {
        // Arrange
        let (mut emitter, mut absorber) = endpoints();
        let code = BeamCode::parse("secret").unwrap();
        let mut use_case = EmitFileUseCase::new(code, ChunkSize::REFERENCE, stopping_progress());
        let source_bytes = b"0123456789abcdefghij".to_vec();

        let peer = tokio::spawn(async move {
            absorber.send(&Message::beam_code(b"secret").unwrap()).await.unwrap();
            assert_eq!(absorber.receive().await.unwrap().kind(), MessageKind::Ok);
            let announced = absorber.receive().await.unwrap();
            assert_eq!(FileInfo::decode(announced.payload()).unwrap().size, 20);
            absorber.send(&Message::ok()).await.unwrap();
            let mut lens = Vec::new();
            loop {
                let chunk = absorber.receive().await.unwrap();
                lens.push(chunk.payload().len());
                absorber.send(&Message::ok()).await.unwrap();
                if chunk.is_end_of_file() {
                    break;
                }
            }
            lens
        });

        // Act
        let report = use_case
            .transfer(&mut emitter, &info(20), &mut source_bytes.as_slice())
            .await
            .unwrap();

        // Assert
        assert_eq!(peer.await.unwrap(), vec![8, 8, 4, 0]);
        assert_eq!(
            report,
            EmitReport {
                chunks_sent: 4,
                bytes_sent: 20
            }
        );
        assert_eq!(emitter.state(), SessionState::Done);
    }

    #[tokio::test]
    async fn test_transfer_answers_wrong_code_with_no() {
        // Arrange
        let (mut emitter, mut absorber) = endpoints();
        let mut use_case = EmitFileUseCase::new(
            BeamCode::parse("secret").unwrap(),
            ChunkSize::REFERENCE,
            NoProgress,
        );
        let peer = tokio::spawn(async move {
            absorber.send(&Message::beam_code(b"guess").unwrap()).await.unwrap();
            absorber.receive().await.unwrap().kind()
        });

        // Act
        let err = use_case
            .transfer(&mut emitter, &info(1), &mut &b"x"[..])
            .await
            .unwrap_err();

        // Assert
        assert!(matches!(err, EmitError::Session(BeamError::AuthenticationFailure)));
        assert_eq!(peer.await.unwrap(), MessageKind::No);
    }

    #[tokio::test]
    async fn test_transfer_declined_file_sends_no_chunks() {
        let (mut emitter, mut absorber) = endpoints();
        let mut use_case = EmitFileUseCase::new(
            BeamCode::parse("c").unwrap(),
            ChunkSize::REFERENCE,
            stopping_progress(),
        );
        let peer = tokio::spawn(async move {
            absorber.send(&Message::beam_code(b"c").unwrap()).await.unwrap();
            absorber.receive().await.unwrap();
            absorber.receive().await.unwrap();
            absorber.send(&Message::no()).await.unwrap();
            absorber.state()
        });

        let err = use_case
            .transfer(&mut emitter, &info(3), &mut &b"abc"[..])
            .await
            .unwrap_err();

        assert!(matches!(err, EmitError::Session(BeamError::TransferRejected)));
        assert_eq!(peer.await.unwrap(), SessionState::Failed);
    }

    #[tokio::test]
    async fn test_execute_starts_progress_and_stops_it_on_accept_failure() {
        // Arrange
        let mut progress = MockProgressIndicator::new();
        progress
            .expect_start()
            .times(1)
            .return_const(());
        progress.expect_stop().times(1..).return_const(());
        let mut use_case = EmitFileUseCase::new(BeamCode::generate(), ChunkSize::DEFAULT, progress);
        let accept = async {
            Err::<Endpoint<Emitter, DuplexStream>, _>(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "nobody came",
            ))
        };

        // Act
        let err = use_case
            .execute(accept, &info(0), &mut &b""[..])
            .await
            .unwrap_err();

        // Assert
        assert!(matches!(err, EmitError::Accept(_)));
        let cause = std::error::Error::source(&err).unwrap();
        assert_eq!(cause.to_string(), "nobody came");
        assert!(!err.to_string().contains("nobody came"));
    }

    #[tokio::test]
    async fn test_execute_runs_empty_file_session_and_closes() {
        let (a, mut absorber) = {
            let (a, b) = duplex(1024);
            (a, Endpoint::<Absorber, _>::new(b))
        };
        let mut progress = MockProgressIndicator::new();
        progress.expect_start().times(1).return_const(());
        progress.expect_stop().times(1..).return_const(());
        let mut use_case =
            EmitFileUseCase::new(BeamCode::parse("c").unwrap(), ChunkSize::DEFAULT, progress);
        let peer = tokio::spawn(async move {
            absorber.send(&Message::beam_code(b"c").unwrap()).await.unwrap();
            absorber.receive().await.unwrap();
            absorber.receive().await.unwrap();
            absorber.send(&Message::ok()).await.unwrap();
            assert!(absorber.receive().await.unwrap().is_end_of_file());
            absorber.send(&Message::ok()).await.unwrap();
            // The emitter closes after the final OK.
            absorber.receive().await.is_err()
        });

        let report = use_case
            .execute(
                async { Ok::<_, std::io::Error>(Endpoint::new(a)) },
                &info(0),
                &mut &b""[..],
            )
            .await
            .unwrap();

        assert_eq!(report.chunks_sent, 1);
        assert_eq!(report.bytes_sent, 0);
        assert!(peer.await.unwrap());
    }
}
