//! Stream Consumer
//!
//! Issues a request whose body is streamed (Docker build logs) and exposes the
//! growing text to a UI through a [`watch`] channel of [`StreamSnapshot`]s.
//!
//! Each `start_stream` opens a new session with a fresh generation number and
//! cancellation token. Starting a new session cancels the previous one, and
//! every write into the snapshot is checked against the generation, so a
//! superseded session can never leak text into its successor.

use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::session::{pump, ChunkSink, StreamError, StreamOutcome};
use crate::api::Endpoints;
use crate::config::ApiConfig;

// ============================================================================
// Requests
// ============================================================================

/// A streaming request
#[derive(Clone, Debug)]
pub struct StreamRequest {
    /// Absolute http(s) URL
    pub url: String,
    /// HTTP method (GET by default)
    pub method: Method,
    /// Extra request headers
    pub headers: HeaderMap,
    /// Optional request body
    pub body: Option<Vec<u8>>,
}

impl StreamRequest {
    /// GET request for `url`
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// POST request for `url` with a body
    pub fn post(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            method: Method::POST,
            body: Some(body.into()),
            ..Self::get(url)
        }
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

fn parse_stream_url(raw: &str) -> Result<Url, StreamError> {
    let url = Url::parse(raw).map_err(|e| StreamError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(StreamError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// What a UI sees of the consumer's current session
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamSnapshot {
    /// Generation of the session this snapshot belongs to (0 = none yet)
    pub session: u64,
    /// Accumulated text
    pub text: String,
    /// Number of body chunks received
    pub chunks: usize,
    /// Whether the session is still running
    pub active: bool,
    /// Terminal outcome, once reached
    pub outcome: Option<StreamOutcome>,
}

impl StreamSnapshot {
    /// Same as `active`; named for loading spinners
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.active
    }

    /// Error, for failed sessions only
    #[must_use]
    pub fn error(&self) -> Option<&StreamError> {
        self.outcome.as_ref().and_then(StreamOutcome::error)
    }
}

/// Writes into the shared snapshot on behalf of one session
struct SnapshotSink<'a> {
    session: u64,
    state: &'a watch::Sender<StreamSnapshot>,
}

impl SnapshotSink<'_> {
    fn append(&self, text: &str, chunk: bool) {
        let session = self.session;
        self.state.send_if_modified(|snap| {
            if snap.session != session || snap.outcome.is_some() {
                return false;
            }
            if chunk {
                snap.chunks += 1;
            } else if text.is_empty() {
                return false;
            }
            snap.text.push_str(text);
            true
        });
    }
}

impl ChunkSink for SnapshotSink<'_> {
    fn push_chunk(&mut self, text: &str) {
        self.append(text, true);
    }

    fn push_text(&mut self, text: &str) {
        self.append(text, false);
    }
}

// ============================================================================
// Abort Handle
// ============================================================================

/// Cancels one specific session
///
/// The handle stays bound to the session that was current when it was taken;
/// it never cancels a later session.
#[derive(Clone, Debug)]
pub struct AbortHandle {
    session: u64,
    token: CancellationToken,
}

impl AbortHandle {
    /// Session this handle cancels
    #[must_use]
    pub fn session(&self) -> u64 {
        self.session
    }

    /// Signal cancellation (idempotent)
    pub fn abort(&self) {
        self.token.cancel();
    }

    /// Whether cancellation has been signalled
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }
}

// ============================================================================
// Consumer
// ============================================================================

#[derive(Default)]
struct Slot {
    generation: u64,
    active: Option<CancellationToken>,
}

/// Ends its session as [`StreamOutcome::Cancelled`] if dropped unfinished
///
/// Covers callers that drop the session future early (a `timeout`, a lost
/// `select!` branch).
struct SessionGuard<'a> {
    consumer: &'a StreamConsumer,
    session: u64,
    token: CancellationToken,
    done: bool,
}

impl SessionGuard<'_> {
    fn complete(mut self, outcome: &StreamOutcome) {
        self.done = true;
        self.consumer.finish(self.session, outcome);
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        debug!(session = self.session, "stream dropped before finishing");
        self.token.cancel();
        self.consumer.finish(self.session, &StreamOutcome::Cancelled);
    }
}

/// Statuses whose responses never carry a body
fn is_bodiless(method: &Method, status: StatusCode) -> bool {
    *method == Method::HEAD
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::RESET_CONTENT
        || status == StatusCode::NOT_MODIFIED
}

/// Consumes streamed HTTP bodies one session at a time
pub struct StreamConsumer {
    client: Client,
    endpoints: Endpoints,
    slot: Mutex<Slot>,
    state: watch::Sender<StreamSnapshot>,
}

impl StreamConsumer {
    /// Create a consumer over an existing HTTP client
    #[must_use]
    pub fn new(client: Client, endpoints: Endpoints) -> Self {
        let (state, _) = watch::channel(StreamSnapshot::default());
        Self {
            client,
            endpoints,
            slot: Mutex::new(Slot::default()),
            state,
        }
    }

    /// Create a consumer from API configuration
    ///
    /// Only the connect timeout applies; build streams may legitimately run
    /// for a long time.
    pub fn from_config(config: &ApiConfig) -> Result<Self, StreamError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| StreamError::Transport(e.to_string()))?;
        Ok(Self::new(client, Endpoints::new(&config.base_url)))
    }

    /// Endpoints this consumer resolves paths against
    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Subscribe to snapshot updates
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StreamSnapshot> {
        self.state.subscribe()
    }

    /// Current snapshot
    #[must_use]
    pub fn snapshot(&self) -> StreamSnapshot {
        self.state.borrow().clone()
    }

    /// Whether a session is in flight
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.slot.lock().active.is_some()
    }

    /// Handle that aborts the in-flight session, if any
    #[must_use]
    pub fn abort_handle(&self) -> Option<AbortHandle> {
        let slot = self.slot.lock();
        slot.active.as_ref().map(|token| AbortHandle {
            session: slot.generation,
            token: token.clone(),
        })
    }

    /// Abort the in-flight session, if any
    ///
    /// The session ends as [`StreamOutcome::Cancelled`] with no error.
    pub fn abort(&self) {
        let slot = self.slot.lock();
        if let Some(token) = &slot.active {
            debug!(session = slot.generation, "aborting stream");
            token.cancel();
        }
    }

    /// Follow the build log of a Docker script
    pub async fn follow_build(&self, script_id: &str) -> StreamOutcome {
        let url = self.endpoints.build_image(script_id);
        self.start_stream(StreamRequest::get(url)).await
    }

    /// Start a new session for `request` and run it to its terminal outcome
    ///
    /// Any previous session is cancelled and the snapshot is reset before the
    /// request is sent.
    pub async fn start_stream(&self, request: StreamRequest) -> StreamOutcome {
        let guard = self.begin();
        info!(session = guard.session, method = %request.method, url = %request.url, "starting stream");

        let outcome = self.run(guard.session, &guard.token, request).await;
        guard.complete(&outcome);
        outcome
    }

    /// Run a new session over an already-open body
    ///
    /// Useful for transports other than HTTP. Same reset and cancellation
    /// rules as [`StreamConsumer::start_stream`].
    pub async fn attach<S, B, E>(&self, body: S) -> StreamOutcome
    where
        S: futures::Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: std::fmt::Display,
    {
        let guard = self.begin();
        info!(session = guard.session, "attaching stream");

        let mut sink = SnapshotSink {
            session: guard.session,
            state: &self.state,
        };
        let outcome = pump(body, &guard.token, &mut sink).await;
        guard.complete(&outcome);
        outcome
    }

    fn begin(&self) -> SessionGuard<'_> {
        let mut slot = self.slot.lock();
        slot.generation += 1;
        let session = slot.generation;
        let token = CancellationToken::new();

        if let Some(previous) = slot.active.replace(token.clone()) {
            debug!(session, "superseding in-flight stream");
            previous.cancel();
        }

        self.state.send_replace(StreamSnapshot {
            session,
            active: true,
            ..StreamSnapshot::default()
        });

        SessionGuard {
            consumer: self,
            session,
            token,
            done: false,
        }
    }

    fn finish(&self, session: u64, outcome: &StreamOutcome) {
        {
            let mut slot = self.slot.lock();
            if slot.generation != session {
                debug!(session, current = slot.generation, "stale session finished");
                return;
            }
            slot.active = None;

            self.state.send_modify(|snap| {
                snap.active = false;
                snap.outcome = Some(outcome.clone());
            });
        }

        match outcome {
            StreamOutcome::Completed => info!(session, "stream completed"),
            StreamOutcome::Cancelled => info!(session, "stream cancelled"),
            StreamOutcome::Failed(e) => warn!(session, error = %e, "stream failed"),
        }
    }

    async fn run(
        &self,
        session: u64,
        token: &CancellationToken,
        request: StreamRequest,
    ) -> StreamOutcome {
        let url = match parse_stream_url(&request.url) {
            Ok(url) => url,
            Err(e) => return StreamOutcome::Failed(e),
        };

        let method = request.method;
        let mut builder = self
            .client
            .request(method.clone(), url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = tokio::select! {
            biased;

            () = token.cancelled() => return StreamOutcome::Cancelled,

            sent = builder.send() => match sent {
                Ok(response) => response,
                Err(e) => return StreamOutcome::Failed(StreamError::Transport(e.to_string())),
            },
        };

        // A response without a body is rejected like a bad status
        let status = response.status();
        if !status.is_success() || is_bodiless(&method, status) {
            return StreamOutcome::Failed(StreamError::Status {
                status: status.as_u16(),
            });
        }
        debug!(session, %status, "stream response accepted");

        let mut sink = SnapshotSink {
            session,
            state: &self.state,
        };
        pump(response.bytes_stream(), token, &mut sink).await
    }
}
