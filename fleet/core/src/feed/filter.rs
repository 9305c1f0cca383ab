//! Read-only feed filtering

use super::entry::{LogEntry, LogLevel};

/// Level and text filter over a feed
///
/// An empty filter matches everything. The search term is matched
/// case-insensitively against the message and the source tag.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogFilter {
    level: Option<LogLevel>,
    search: Option<String>,
}

impl LogFilter {
    /// Filter that matches every entry
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Only entries with exactly this level (`None` = all levels)
    #[must_use]
    pub fn with_level(mut self, level: Option<LogLevel>) -> Self {
        self.level = level;
        self
    }

    /// Only entries whose message or source contains `term`
    ///
    /// A blank term clears the search.
    #[must_use]
    pub fn with_search(mut self, term: &str) -> Self {
        self.search = if term.is_empty() {
            None
        } else {
            Some(term.to_lowercase())
        };
        self
    }

    /// Selected level
    #[must_use]
    pub fn level(&self) -> Option<LogLevel> {
        self.level
    }

    /// Normalized (lower-case) search term
    #[must_use]
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    /// Whether this filter lets everything through
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.level.is_none() && self.search.is_none()
    }

    /// Whether `entry` passes
    #[must_use]
    pub fn matches(&self, entry: &LogEntry) -> bool {
        if let Some(level) = self.level {
            if entry.level() != level {
                return false;
            }
        }

        match &self.search {
            None => true,
            Some(term) => {
                entry.message().to_lowercase().contains(term.as_str())
                    || entry
                        .source()
                        .is_some_and(|source| source.to_lowercase().contains(term.as_str()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_matches_all() {
        let filter = LogFilter::all().with_search("");
        assert!(filter.is_empty());
        assert!(filter.matches(&LogEntry::new(LogLevel::Debug, "anything")));
    }

    #[test]
    fn test_level_is_exact() {
        let filter = LogFilter::all().with_level(Some(LogLevel::Warning));
        assert!(filter.matches(&LogEntry::new(LogLevel::Warning, "x")));
        assert!(!filter.matches(&LogEntry::new(LogLevel::Error, "x")));
    }

    #[test]
    fn test_search_is_case_insensitive_over_message_and_source() {
        let filter = LogFilter::all().with_search("WebSocket");
        assert_eq!(filter.search(), Some("websocket"));

        assert!(filter.matches(&LogEntry::new(LogLevel::Info, "websocket heartbeat received")));
        assert!(filter.matches(&LogEntry::new(LogLevel::Info, "heartbeat").with_source("WEBSOCKET")));
        assert!(!filter.matches(&LogEntry::new(LogLevel::Info, "File saved").with_source("filesystem")));
        assert!(!filter.matches(&LogEntry::new(LogLevel::Info, "no source here")));
    }

    #[test]
    fn test_level_and_search_combine() {
        let filter = LogFilter::all()
            .with_level(Some(LogLevel::Error))
            .with_search("memory");
        assert!(filter.matches(&LogEntry::new(LogLevel::Error, "Memory usage: 245MB")));
        assert!(!filter.matches(&LogEntry::new(LogLevel::Info, "Memory usage: 245MB")));
        assert!(!filter.matches(&LogEntry::new(LogLevel::Error, "Disk full")));
    }
}
