//! Bounded Log Feed
//!
//! Chronological, capped sequence of log entries. New entries go to the tail;
//! once the retention cap is exceeded the oldest entries are dropped from the
//! head.

use std::collections::VecDeque;

use chrono::NaiveDate;

use super::entry::LogEntry;
use super::filter::LogFilter;

/// Default number of entries a feed retains
pub const DEFAULT_RETENTION: usize = 100;

/// Ordered, bounded sequence of log entries
#[derive(Clone, Debug)]
pub struct LogFeed {
    entries: VecDeque<LogEntry>,
    retention: usize,
    evicted: u64,
}

impl Default for LogFeed {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

impl LogFeed {
    /// Create an empty feed keeping at most `retention` entries
    ///
    /// A retention of zero is raised to one.
    #[must_use]
    pub fn new(retention: usize) -> Self {
        let retention = retention.max(1);
        Self {
            entries: VecDeque::with_capacity(retention),
            retention,
            evicted: 0,
        }
    }

    /// Retention cap
    #[must_use]
    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Number of retained entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is retained
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries evicted over the feed's lifetime
    #[must_use]
    pub fn total_evicted(&self) -> u64 {
        self.evicted
    }

    /// Append an entry, evicting the oldest while over the cap
    ///
    /// Returns how many entries were evicted.
    pub fn push(&mut self, entry: LogEntry) -> usize {
        self.entries.push_back(entry);
        if self.entries.len() <= self.retention {
            return 0;
        }

        let excess = self.entries.len() - self.retention;
        self.entries.drain(..excess);
        self.evicted += excess as u64;
        excess
    }

    /// Drop every retained entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Retained entries, oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LogEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Entry at `index` (0 = oldest retained)
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&LogEntry> {
        self.entries.get(index)
    }

    /// Oldest retained entry
    #[must_use]
    pub fn first(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    /// Newest entry
    #[must_use]
    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    /// Entries passing `filter`, in feed order
    #[must_use]
    pub fn visible(&self, filter: &LogFilter) -> Vec<&LogEntry> {
        self.entries.iter().filter(|e| filter.matches(e)).collect()
    }

    /// The newest `count` entries (or all, if fewer are retained)
    pub fn newest(&self, count: usize) -> impl Iterator<Item = &LogEntry> {
        let skip = self.entries.len().saturating_sub(count);
        self.entries.iter().skip(skip)
    }

    /// Render visible entries as text, one line per entry
    #[must_use]
    pub fn export(&self, filter: &LogFilter) -> String {
        self.entries
            .iter()
            .filter(|e| filter.matches(e))
            .map(LogEntry::to_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// File name for an exported feed: `<instance>-logs-<YYYY-MM-DD>.txt`
#[must_use]
pub fn export_file_name(instance_name: &str, date: NaiveDate) -> String {
    format!("{instance_name}-logs-{}.txt", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::feed::entry::LogLevel;

    fn entry(n: usize) -> LogEntry {
        LogEntry::new(LogLevel::Info, format!("entry {n}"))
    }

    #[test]
    fn test_push_under_cap() {
        let mut feed = LogFeed::new(3);
        assert_eq!(feed.push(entry(0)), 0);
        assert_eq!(feed.push(entry(1)), 0);
        assert_eq!(feed.len(), 2);
        assert_eq!(feed.first().unwrap().message(), "entry 0");
        assert_eq!(feed.last().unwrap().message(), "entry 1");
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let mut feed = LogFeed::new(DEFAULT_RETENTION);
        let mut evicted = 0;
        for n in 0..105 {
            evicted += feed.push(entry(n));
        }

        assert_eq!(feed.len(), 100);
        assert_eq!(evicted, 5);
        assert_eq!(feed.total_evicted(), 5);
        assert_eq!(feed.first().unwrap().message(), "entry 5");
        assert_eq!(feed.last().unwrap().message(), "entry 104");
    }

    #[test]
    fn test_zero_retention_is_raised() {
        let mut feed = LogFeed::new(0);
        feed.push(entry(0));
        feed.push(entry(1));
        assert_eq!(feed.retention(), 1);
        assert_eq!(feed.len(), 1);
        assert_eq!(feed.first().unwrap().message(), "entry 1");
    }

    #[test]
    fn test_visible_preserves_order_and_feed() {
        let mut feed = LogFeed::new(10);
        feed.push(LogEntry::new(LogLevel::Error, "first failure"));
        feed.push(LogEntry::new(LogLevel::Info, "ok"));
        feed.push(LogEntry::new(LogLevel::Error, "second failure"));

        let filter = LogFilter::all().with_level(Some(LogLevel::Error));
        let visible: Vec<_> = feed.visible(&filter).iter().map(|e| e.message()).collect();
        assert_eq!(visible, vec!["first failure", "second failure"]);
        assert_eq!(feed.len(), 3);
    }

    #[test]
    fn test_newest() {
        let mut feed = LogFeed::new(10);
        for n in 0..4 {
            feed.push(entry(n));
        }
        let newest: Vec<_> = feed.newest(2).map(LogEntry::message).collect();
        assert_eq!(newest, vec!["entry 2", "entry 3"]);
        assert_eq!(feed.newest(10).count(), 4);
    }

    #[test]
    fn test_export() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let mut feed = LogFeed::new(10);
        feed.push(LogEntry::new(LogLevel::Info, "HTTP server listening").with_timestamp(ts));
        feed.push(LogEntry::new(LogLevel::Debug, "noise").with_timestamp(ts));
        feed.push(LogEntry::new(LogLevel::Error, "Extension host crashed").with_timestamp(ts));

        let text = feed.export(&LogFilter::all().with_search("e"));
        assert_eq!(
            text,
            "[2024-05-01T08:00:00.000Z] INFO: HTTP server listening\n\
             [2024-05-01T08:00:00.000Z] DEBUG: noise\n\
             [2024-05-01T08:00:00.000Z] ERROR: Extension host crashed"
        );
        assert_eq!(feed.export(&LogFilter::all().with_search("zzz")), "");
    }

    #[test]
    fn test_export_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(export_file_name("frontend-dev", date), "frontend-dev-logs-2024-05-01.txt");
    }
}
