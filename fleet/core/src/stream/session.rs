//! Stream Sessions
//!
//! A session is one lifecycle of incremental body consumption: it starts
//! empty, grows by appending decoded chunks in receipt order, and ends in
//! exactly one [`StreamOutcome`]. The read loop ([`pump`]) is the single
//! writer; it feeds a [`ChunkSink`] and returns the terminal outcome.

use std::fmt::Display;
use std::time::{Duration, Instant};

use futures::{Stream, StreamExt};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::decoder::Utf8Decoder;

// ============================================================================
// Outcomes
// ============================================================================

/// Why a stream session failed
///
/// Cancellation is deliberately absent: an aborted session ends in
/// [`StreamOutcome::Cancelled`] and never carries an error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StreamError {
    /// The URL did not parse or is not http(s)
    #[error("invalid stream URL '{url}': {reason}")]
    InvalidUrl {
        /// The URL as given
        url: String,
        /// What was wrong with it
        reason: String,
    },

    /// The server answered with a non-success status
    #[error("HTTP error! status: {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// The request could not be sent or the client could not be built
    #[error("{0}")]
    Transport(String),

    /// Reading the body failed mid-stream
    #[error("{0}")]
    Read(String),
}

impl StreamError {
    /// HTTP status code, if this error came from the initial response
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status } => Some(*status),
            _ => None,
        }
    }
}

/// Terminal state of a stream session
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The body ended normally
    Completed,
    /// The session was aborted by its owner or superseded by a new one
    Cancelled,
    /// The session ended with an error
    Failed(StreamError),
}

impl StreamOutcome {
    /// The error, for failed sessions only
    #[must_use]
    pub fn error(&self) -> Option<&StreamError> {
        match self {
            Self::Failed(error) => Some(error),
            _ => None,
        }
    }

    /// Whether the session failed
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Receives decoded text in receipt order
pub trait ChunkSink {
    /// Record one received body chunk and append its decoded text
    ///
    /// `text` is empty when the chunk ended inside a multi-byte character.
    fn push_chunk(&mut self, text: &str);

    /// Append text that does not correspond to a new chunk (the decoder tail)
    fn push_text(&mut self, text: &str);
}

/// Read `body` to its end, feeding decoded text into `sink`
///
/// Cancellation is checked first at every suspension point, so once `cancel`
/// fires no later chunk reaches the sink even if it is already buffered.
pub async fn pump<S, B, E>(
    body: S,
    cancel: &CancellationToken,
    sink: &mut impl ChunkSink,
) -> StreamOutcome
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    tokio::pin!(body);
    let mut decoder = Utf8Decoder::new();
    let mut received: u64 = 0;

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!(chunks = received, "stream cancelled");
                return StreamOutcome::Cancelled;
            }

            next = body.next() => match next {
                Some(Ok(bytes)) => {
                    received += 1;
                    let text = decoder.decode(bytes.as_ref());
                    sink.push_chunk(&text);
                }
                Some(Err(e)) => {
                    warn!(error = %e, chunks = received, "stream read failed");
                    return StreamOutcome::Failed(StreamError::Read(e.to_string()));
                }
                None => {
                    let tail = decoder.finish();
                    if !tail.is_empty() {
                        sink.push_text(&tail);
                    }
                    debug!(chunks = received, "stream reached end of body");
                    return StreamOutcome::Completed;
                }
            }
        }
    }
}

// ============================================================================
// Owned Session
// ============================================================================

/// An owned, single-writer stream session
///
/// Use [`StreamSession::collect`] when the caller just wants the finished
/// text and outcome without a live view.
#[derive(Debug)]
pub struct StreamSession {
    id: u64,
    text: String,
    chunks: usize,
    started_at: Instant,
    finished_at: Option<Instant>,
    outcome: Option<StreamOutcome>,
}

impl StreamSession {
    /// Create an empty, active session
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self {
            id,
            text: String::new(),
            chunks: 0,
            started_at: Instant::now(),
            finished_at: None,
            outcome: None,
        }
    }

    /// Consume `body` into a new session and return it finished
    pub async fn collect<S, B, E>(id: u64, body: S, cancel: &CancellationToken) -> Self
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
    {
        let mut session = Self::new(id);
        let outcome = pump(body, cancel, &mut session).await;
        session.finish(outcome);
        session
    }

    /// Session identifier
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Accumulated text
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Take the accumulated text
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }

    /// Number of body chunks received
    #[must_use]
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    /// Whether no terminal outcome has been reached yet
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.outcome.is_none()
    }

    /// Terminal outcome, once reached
    #[must_use]
    pub fn outcome(&self) -> Option<&StreamOutcome> {
        self.outcome.as_ref()
    }

    /// Error, for failed sessions only
    #[must_use]
    pub fn error(&self) -> Option<&StreamError> {
        self.outcome.as_ref().and_then(StreamOutcome::error)
    }

    /// Time from start until finish (or until now, while active)
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.finished_at
            .unwrap_or_else(Instant::now)
            .duration_since(self.started_at)
    }

    /// Record the terminal outcome
    ///
    /// Only the first call has an effect. Returns whether it did.
    pub fn finish(&mut self, outcome: StreamOutcome) -> bool {
        if self.outcome.is_some() {
            return false;
        }
        self.outcome = Some(outcome);
        self.finished_at = Some(Instant::now());
        true
    }
}

impl ChunkSink for StreamSession {
    fn push_chunk(&mut self, text: &str) {
        if self.outcome.is_some() {
            return;
        }
        self.chunks += 1;
        self.text.push_str(text);
    }

    fn push_text(&mut self, text: &str) {
        if self.outcome.is_some() {
            return;
        }
        self.text.push_str(text);
    }
}
