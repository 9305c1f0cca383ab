//! Event Sources
//!
//! Where feed entries come from. The simulator pulls one entry per tick and
//! never cares whether it was made up, replayed or pushed by a backend.

use chrono::{Duration as ChronoDuration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::debug;

use super::entry::{LogEntry, LogLevel};

/// Lazy, possibly infinite sequence of log entries
///
/// Sources are pulled synchronously from the feed's tick, so `next_entry`
/// must never block.
pub trait EventSource: Send {
    /// Next entry, or `None` if nothing is available right now
    fn next_entry(&mut self) -> Option<LogEntry>;

    /// Begin a fresh session (rewind, reseed, ...)
    fn restart(&mut self) {}

    /// Short name for logs
    fn name(&self) -> &str;
}

impl<S: EventSource + ?Sized> EventSource for Box<S> {
    fn next_entry(&mut self) -> Option<LogEntry> {
        (**self).next_entry()
    }

    fn restart(&mut self) {
        (**self).restart();
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

// ============================================================================
// Synthetic
// ============================================================================

/// Messages the synthetic source picks from
pub const SYNTHETIC_MESSAGES: [&str; 5] = [
    "Processing request from client",
    "File saved: /workspace/src/index.js",
    "Extension activated: ms-python.python",
    "Memory usage: 245MB",
    "WebSocket heartbeat received",
];

/// Source tags the synthetic source picks from
pub const SYNTHETIC_SOURCES: [&str; 5] = ["server", "filesystem", "extension", "system", "websocket"];

/// Random entries in the shape of a code-server log
///
/// Level, message and source tag are each chosen uniformly and independently.
pub struct SyntheticSource {
    rng: StdRng,
    seed: Option<u64>,
}

impl SyntheticSource {
    /// Source seeded from OS entropy
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            seed: None,
        }
    }

    /// Deterministic source; `restart` replays the same sequence
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    /// Seed, if deterministic
    #[must_use]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for SyntheticSource {
    fn next_entry(&mut self) -> Option<LogEntry> {
        let level = *LogLevel::ALL.choose(&mut self.rng)?;
        let message = *SYNTHETIC_MESSAGES.choose(&mut self.rng)?;
        let source = *SYNTHETIC_SOURCES.choose(&mut self.rng)?;
        Some(LogEntry::new(level, message).with_source(source))
    }

    fn restart(&mut self) {
        if let Some(seed) = self.seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

// ============================================================================
// Replay
// ============================================================================

/// Replays a fixed list of entries, then runs dry
///
/// Replayed entries are re-stamped with the emission time.
pub struct ReplaySource {
    entries: Vec<LogEntry>,
    cursor: usize,
}

impl ReplaySource {
    /// Replay `entries` in order
    #[must_use]
    pub fn new(entries: Vec<LogEntry>) -> Self {
        Self { entries, cursor: 0 }
    }

    /// Entries not yet replayed
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.entries.len() - self.cursor
    }
}

impl EventSource for ReplaySource {
    fn next_entry(&mut self) -> Option<LogEntry> {
        let template = self.entries.get(self.cursor)?;
        self.cursor += 1;

        let mut entry = LogEntry::new(template.level(), template.message()).with_timestamp(Utc::now());
        if let Some(source) = template.source() {
            entry = entry.with_source(source);
        }
        Some(entry)
    }

    fn restart(&mut self) {
        self.cursor = 0;
    }

    fn name(&self) -> &str {
        "replay"
    }
}

// ============================================================================
// Channel
// ============================================================================

/// Entries pushed by another task (e.g. a real telemetry backend)
pub struct ChannelSource {
    rx: mpsc::Receiver<LogEntry>,
    closed: bool,
}

impl ChannelSource {
    /// Source fed by the sending half of `rx`
    #[must_use]
    pub fn new(rx: mpsc::Receiver<LogEntry>) -> Self {
        Self { rx, closed: false }
    }

    /// Source plus the sender that feeds it
    #[must_use]
    pub fn channel(capacity: usize) -> (mpsc::Sender<LogEntry>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self::new(rx))
    }

    /// Whether every sender is gone and the queue is drained
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl EventSource for ChannelSource {
    fn next_entry(&mut self) -> Option<LogEntry> {
        match self.rx.try_recv() {
            Ok(entry) => Some(entry),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                if !self.closed {
                    debug!("channel source disconnected");
                    self.closed = true;
                }
                None
            }
        }
    }

    fn name(&self) -> &str {
        "channel"
    }
}

// ============================================================================
// Starter entries
// ============================================================================

/// The entries a freshly opened log viewer shows, oldest first
#[must_use]
pub fn starter_entries() -> Vec<LogEntry> {
    let now = Utc::now();
    let seed = [
        (
            4,
            LogLevel::Info,
            "Extension host started with pid 12345",
            "extension",
        ),
        (
            3,
            LogLevel::Warning,
            "File watcher error: ENOSPC: System limit for number of file watchers reached",
            "filesystem",
        ),
        (
            2,
            LogLevel::Debug,
            "WebSocket connection established from 192.168.1.100",
            "websocket",
        ),
        (
            1,
            LogLevel::Info,
            "Using config file ~/.config/code-server/config.yaml",
            "config",
        ),
        (
            0,
            LogLevel::Info,
            "HTTP server listening on http://0.0.0.0:8080",
            "server",
        ),
    ];

    seed.into_iter()
        .map(|(secs_ago, level, message, source)| {
            LogEntry::new(level, message)
                .with_source(source)
                .with_timestamp(now - ChronoDuration::seconds(secs_ago))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn take(source: &mut impl EventSource, n: usize) -> Vec<(LogLevel, String, Option<String>)> {
        (0..n)
            .filter_map(|_| source.next_entry())
            .map(|e| (e.level(), e.message().to_string(), e.source().map(str::to_string)))
            .collect()
    }

    #[test]
    fn test_synthetic_draws_from_fixed_lists() {
        let mut source = SyntheticSource::new();
        for _ in 0..50 {
            let entry = source.next_entry().unwrap();
            assert!(SYNTHETIC_MESSAGES.contains(&entry.message()));
            assert!(SYNTHETIC_SOURCES.contains(&entry.source().unwrap()));
        }
    }

    #[test]
    fn test_seeded_source_is_reproducible() {
        let mut a = SyntheticSource::with_seed(7);
        let mut b = SyntheticSource::with_seed(7);
        let first = take(&mut a, 20);
        assert_eq!(first, take(&mut b, 20));

        a.restart();
        assert_eq!(take(&mut a, 20), first);
    }

    #[test]
    fn test_replay_runs_dry_and_rewinds() {
        let mut source = ReplaySource::new(vec![
            LogEntry::new(LogLevel::Info, "one").with_source("server"),
            LogEntry::new(LogLevel::Error, "two"),
        ]);

        assert_eq!(source.remaining(), 2);
        let replayed = take(&mut source, 5);
        assert_eq!(
            replayed,
            vec![
                (LogLevel::Info, "one".to_string(), Some("server".to_string())),
                (LogLevel::Error, "two".to_string(), None),
            ]
        );
        assert!(source.next_entry().is_none());

        source.restart();
        assert_eq!(source.remaining(), 2);
        assert_eq!(source.next_entry().unwrap().message(), "one");
    }

    #[test]
    fn test_channel_source_never_blocks() {
        let (tx, mut source) = ChannelSource::channel(4);
        assert!(source.next_entry().is_none());

        tx.try_send(LogEntry::new(LogLevel::Warning, "disk almost full")).unwrap();
        assert_eq!(source.next_entry().unwrap().message(), "disk almost full");
        assert!(source.next_entry().is_none());
        assert!(!source.is_closed());

        drop(tx);
        assert!(source.next_entry().is_none());
        assert!(source.is_closed());
    }

    #[test]
    fn test_starter_entries_are_oldest_first() {
        let entries = starter_entries();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[4].message(), "HTTP server listening on http://0.0.0.0:8080");
        assert!(entries.windows(2).all(|w| w[0].timestamp() < w[1].timestamp()));
    }

    #[test]
    fn test_boxed_source_forwards() {
        let mut source: Box<dyn EventSource> = Box::new(SyntheticSource::with_seed(1));
        assert_eq!(source.name(), "synthetic");
        assert!(source.next_entry().is_some());
    }
}
