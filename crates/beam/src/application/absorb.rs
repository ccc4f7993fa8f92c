//! AbsorbFileUseCase: the receiving side of a beam session.
//!
//! The absorber presents its beam code, looks at the announced file, and
//! decides whether to take it.  Every chunk is written to a [`FileSink`]
//! before it is acknowledged, so an OK always means "these bytes are stored".
//! If the sink fails, the absorber answers NO and the emitter stops.
//!
//! The two decisions that involve the outside world live behind traits:
//!
//! - [`TransferApproval`] – should this file be accepted at all?
//! - [`FileSink`] – where do the bytes go?

use async_trait::async_trait;
use beam_core::{Absorber, BeamCode, BeamError, Endpoint, FileInfo, Message, MessageKind};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

/// Error type for the absorb use case.
#[derive(Debug, Error)]
pub enum AbsorbError {
    /// The session failed (wrong code, transport, framing, protocol).
    #[error(transparent)]
    Session(#[from] BeamError),

    /// The destination could not be opened, written, or finalised.  The
    /// emitter was told NO before this was returned.
    #[error("writing the received file failed")]
    Sink(#[source] std::io::Error),

    /// The emitter sent more bytes than it announced.  The emitter was told
    /// NO and nothing past the announced size reached the sink.
    #[error("emitter sent more than the announced {announced} bytes")]
    Oversize { announced: u64 },
}

/// Decides whether an announced file is accepted.
#[async_trait]
pub trait TransferApproval: Send {
    async fn approve(&mut self, info: &FileInfo) -> bool;
}

/// Destination for received bytes.
#[async_trait]
pub trait FileSink: Send {
    /// Prepares the destination for `info`.  Called once, after approval.
    async fn open(&mut self, info: &FileInfo) -> std::io::Result<()>;

    /// Appends one non-empty chunk.
    async fn write_chunk(&mut self, bytes: &[u8]) -> std::io::Result<()>;

    /// Flushes everything.  Called once, after the terminator arrived.
    async fn finish(&mut self) -> std::io::Result<()>;
}

/// Why an announced file was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    /// The approval seam said no.
    Refused,
    /// The announced size exceeds the configured limit.
    TooLarge { size: u64, limit: u64 },
}

/// How an absorb session ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbsorbOutcome {
    /// The whole file arrived and was stored.
    Completed {
        info: FileInfo,
        bytes: u64,
        /// `FILE_CHUNK` messages received, including the empty terminator.
        chunks: u64,
    },
    /// The file was announced and turned down.
    Declined { info: FileInfo, reason: DeclineReason },
}

/// The Absorb File use case.
pub struct AbsorbFileUseCase<A, K> {
    code: BeamCode,
    approval: A,
    sink: K,
    max_file_size: Option<u64>,
}

impl<A, K> AbsorbFileUseCase<A, K>
where
    A: TransferApproval,
    K: FileSink,
{
    pub fn new(code: BeamCode, approval: A, sink: K) -> Self {
        Self {
            code,
            approval,
            sink,
            max_file_size: None,
        }
    }

    /// Declines, without asking, any file announced as larger than `limit`.
    pub fn with_max_file_size(mut self, limit: Option<u64>) -> Self {
        self.max_file_size = limit;
        self
    }

    /// Gives the sink back, e.g. to inspect what was written.
    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Runs one session over an already-connected endpoint.
    ///
    /// # Errors
    ///
    /// - [`BeamError::AuthenticationFailure`] if the emitter rejects the code.
    /// - [`BeamError::MalformedFrame`] if the announced metadata cannot be
    ///   decoded (answered with NO).
    /// - [`AbsorbError::Sink`] if the destination fails (answered with NO).
    /// - [`AbsorbError::Oversize`] if more bytes arrive than were announced
    ///   (answered with NO).
    /// - Any transport, framing, or protocol failure of the connection.
    pub async fn execute<S>(
        &mut self,
        endpoint: &mut Endpoint<Absorber, S>,
    ) -> Result<AbsorbOutcome, AbsorbError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        // ── Code exchange ─────────────────────────────────────────────────────
        let code = Message::beam_code(self.code.as_bytes()).map_err(BeamError::from)?;
        endpoint.send(&code).await?;
        if endpoint.receive().await?.kind() == MessageKind::No {
            warn!("emitter rejected the beam code");
            return Err(BeamError::AuthenticationFailure.into());
        }
        debug!("beam code accepted");

        // ── Metadata handoff ──────────────────────────────────────────────────
        let announced = endpoint.receive().await?;
        let info = match FileInfo::decode(announced.payload()) {
            Ok(info) => info,
            Err(e) => {
                warn!("announced file info is malformed: {e}");
                refuse(endpoint).await;
                return Err(BeamError::from(e).into());
            }
        };
        info!(name = %info.name, size = info.size, "file announced");

        if let Some(limit) = self.max_file_size.filter(|limit| info.size > *limit) {
            warn!(size = info.size, limit, "announced file exceeds the size limit");
            endpoint.send(&Message::no()).await?;
            let reason = DeclineReason::TooLarge {
                size: info.size,
                limit,
            };
            return Ok(AbsorbOutcome::Declined { info, reason });
        }

        if !self.approval.approve(&info).await {
            info!(name = %info.name, "file declined");
            endpoint.send(&Message::no()).await?;
            return Ok(AbsorbOutcome::Declined {
                info,
                reason: DeclineReason::Refused,
            });
        }

        if let Err(e) = self.sink.open(&info).await {
            warn!("cannot open destination: {e}");
            refuse(endpoint).await;
            return Err(AbsorbError::Sink(e));
        }
        endpoint.send(&Message::ok()).await?;

        // ── Chunk loop ────────────────────────────────────────────────────────
        let mut bytes = 0u64;
        let mut chunks = 0u64;
        loop {
            let chunk = endpoint.receive().await?;
            chunks += 1;

            // The size limit and the approval were granted for `info.size`.
            let len = chunk.payload().len() as u64;
            if bytes + len > info.size {
                warn!(
                    announced = info.size,
                    received = bytes + len,
                    "emitter overran the announced size"
                );
                refuse(endpoint).await;
                return Err(AbsorbError::Oversize { announced: info.size });
            }

            let stored = if chunk.is_end_of_file() {
                self.sink.finish().await
            } else {
                self.sink.write_chunk(chunk.payload()).await
            };
            if let Err(e) = stored {
                warn!(chunk = chunks, "destination write failed, canceling: {e}");
                refuse(endpoint).await;
                return Err(AbsorbError::Sink(e));
            }
            endpoint.send(&Message::ok()).await?;

            if chunk.is_end_of_file() {
                break;
            }
            bytes += len;
            debug!(chunk = chunks, total = bytes, "chunk stored");
        }

        info!(name = %info.name, bytes, chunks, "file received");
        Ok(AbsorbOutcome::Completed {
            info,
            bytes,
            chunks,
        })
    }
}

/// Answers NO on the way out of a failure.  If that send fails too, it is
/// only logged so the error that caused the refusal is the one returned.
async fn refuse<S>(endpoint: &mut Endpoint<Absorber, S>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if let Err(e) = endpoint.send(&Message::no()).await {
        debug!(error = ?e, "could not answer NO");
    }
}

/// Approves every file.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprove;

#[async_trait]
impl TransferApproval for AutoApprove {
    async fn approve(&mut self, _info: &FileInfo) -> bool {
        true
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
