//! Polling Feed Simulator
//!
//! Drives a [`LogFeed`] from an [`EventSource`] one tick at a time. The
//! simulator itself is synchronous; [`spawn_ticker`] adds the timer.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::buffer::{LogFeed, DEFAULT_RETENTION};
use super::entry::LogEntry;
use super::filter::LogFilter;
use super::source::{EventSource, SyntheticSource};

/// Default time between emissions
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(2000);

/// Whether the simulator is producing entries
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FeedState {
    /// Each tick emits one entry
    Running,
    /// Ticks do nothing
    #[default]
    Stopped,
}

/// Timer-free feed simulator
pub struct FeedSimulator<S = SyntheticSource> {
    source: S,
    feed: LogFeed,
    state: FeedState,
    emitted: u64,
}

impl<S: EventSource> FeedSimulator<S> {
    /// Stopped simulator with an empty feed
    pub fn new(source: S, retention: usize) -> Self {
        Self {
            source,
            feed: LogFeed::new(retention),
            state: FeedState::Stopped,
            emitted: 0,
        }
    }

    /// Stopped simulator with the default retention
    pub fn with_source(source: S) -> Self {
        Self::new(source, DEFAULT_RETENTION)
    }

    /// Pre-load the feed (e.g. with starter entries)
    ///
    /// Pre-loaded entries are subject to retention but are not counted as
    /// emissions.
    #[must_use]
    pub fn with_entries(mut self, entries: impl IntoIterator<Item = LogEntry>) -> Self {
        for entry in entries {
            self.feed.push(entry);
        }
        self
    }

    /// STOPPED → RUNNING
    pub fn start(&mut self) {
        if self.state == FeedState::Running {
            return;
        }
        self.state = FeedState::Running;
        info!(source = self.source.name(), "feed started");
    }

    /// RUNNING → STOPPED
    pub fn stop(&mut self) {
        if self.state == FeedState::Stopped {
            return;
        }
        self.state = FeedState::Stopped;
        info!(source = self.source.name(), emitted = self.emitted, "feed stopped");
    }

    /// Drop every retained entry; the state is unchanged
    pub fn clear(&mut self) {
        debug!(dropped = self.feed.len(), "feed cleared");
        self.feed.clear();
    }

    /// Clear the feed and restart the source for a new session
    pub fn reset(&mut self) {
        self.clear();
        self.source.restart();
        self.emitted = 0;
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> FeedState {
        self.state
    }

    /// Whether ticks emit entries
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == FeedState::Running
    }

    /// One emission
    ///
    /// Returns the appended entry, or `None` when stopped or when the source
    /// had nothing.
    pub fn tick(&mut self) -> Option<&LogEntry> {
        if self.state != FeedState::Running {
            return None;
        }

        let entry = self.source.next_entry()?;
        let evicted = self.feed.push(entry);
        self.emitted += 1;
        trace!(emitted = self.emitted, evicted, "feed tick");

        self.feed.last()
    }

    /// The retained feed
    #[must_use]
    pub fn feed(&self) -> &LogFeed {
        &self.feed
    }

    /// The event source
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Entries passing `filter`, oldest first
    #[must_use]
    pub fn visible(&self, filter: &LogFilter) -> Vec<&LogEntry> {
        self.feed.visible(filter)
    }

    /// Visible entries rendered for download
    #[must_use]
    pub fn export(&self, filter: &LogFilter) -> String {
        self.feed.export(filter)
    }

    /// Total emissions since creation or the last reset
    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Retained entries emitted after the emission count was `mark`
    ///
    /// Lets a poller that remembered [`FeedSimulator::emitted`] pick up only
    /// what is new, even if some of it was already evicted.
    pub fn recent_since(&self, mark: u64) -> impl Iterator<Item = &LogEntry> {
        let fresh = usize::try_from(self.emitted.saturating_sub(mark)).unwrap_or(usize::MAX);
        self.feed.newest(fresh)
    }
}

// ============================================================================
// Timer
// ============================================================================

/// A simulator shared between the ticker and its readers
pub type SharedFeed<S = SyntheticSource> = Arc<Mutex<FeedSimulator<S>>>;

/// Wrap a simulator for sharing with [`spawn_ticker`]
pub fn shared<S: EventSource>(simulator: FeedSimulator<S>) -> SharedFeed<S> {
    Arc::new(Mutex::new(simulator))
}

/// Handle to a running ticker task
pub struct FeedTicker {
    handle: JoinHandle<()>,
    updates: watch::Receiver<u64>,
}

impl FeedTicker {
    /// Receiver that changes to the emission count after every productive tick
    #[must_use]
    pub fn updates(&self) -> watch::Receiver<u64> {
        self.updates.clone()
    }

    /// Wait for the task to end (after cancellation)
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            debug!(error = %e, "feed ticker task ended abnormally");
        }
    }

    /// Stop the task without waiting
    pub fn abort(&self) {
        self.handle.abort();
    }
}

fn saturating_millis(period: Duration) -> u64 {
    u64::try_from(period.as_millis()).unwrap_or(u64::MAX)
}

/// Call [`FeedSimulator::tick`] every `period` until `cancel` fires
///
/// The first tick happens one full period after spawning. Missed ticks are
/// skipped, not bunched up. The lock is held only for the synchronous tick.
pub fn spawn_ticker<S>(shared: SharedFeed<S>, period: Duration, cancel: CancellationToken) -> FeedTicker
where
    S: EventSource + 'static,
{
    let (tx, updates) = watch::channel(shared.lock().emitted());

    let handle = tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!(period_ms = saturating_millis(period), "feed ticker started");

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    debug!("feed ticker cancelled");
                    break;
                }

                _ = interval.tick() => {
                    let emitted = {
                        let mut sim = shared.lock();
                        sim.tick().is_some().then(|| sim.emitted())
                    };
                    if let Some(count) = emitted {
                        tx.send_replace(count);
                    }
                }
            }
        }
    });

    FeedTicker { handle, updates }
}
