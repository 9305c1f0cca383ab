//! Activity Feed
//!
//! A bounded, filterable feed of log entries that grows on a timer. Entries
//! come from an [`EventSource`]; the [`FeedSimulator`] pulls one per tick while
//! running and keeps only the most recent [`DEFAULT_RETENTION`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  tick()  ┌────────────────┐  push  ┌───────────────────┐
//! │ spawn_ticker │ ───────► │ FeedSimulator  │ ─────► │ LogFeed (cap 100) │
//! │  (interval)  │          │ RUNNING/STOPPED│        │ drop-oldest       │
//! └──────────────┘          └───────┬────────┘        └─────────┬─────────┘
//!                                   │ next_entry()              │ visible(filter)
//!                                   ▼                           ▼
//!                     Synthetic / Replay / Channel         UI, export
//! ```
//!
//! Filtering never mutates the feed.

mod buffer;
mod entry;
mod filter;
mod simulator;
mod source;

pub use buffer::{export_file_name, LogFeed, DEFAULT_RETENTION};
pub use entry::{EntryId, LogEntry, LogLevel, ParseLevelError};
pub use filter::LogFilter;
pub use simulator::{
    shared, spawn_ticker, FeedSimulator, FeedState, FeedTicker, SharedFeed, DEFAULT_INTERVAL,
};
pub use source::{
    starter_entries, ChannelSource, EventSource, ReplaySource, SyntheticSource,
    SYNTHETIC_MESSAGES, SYNTHETIC_SOURCES,
};
