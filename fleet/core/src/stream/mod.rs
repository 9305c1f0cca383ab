//! Build Log Streaming
//!
//! Incremental consumption of streamed HTTP bodies with cooperative
//! cancellation. The main user is the Docker build log viewer, which follows
//! `GET <base>/docker-scripts/{scriptId}/build-image` until the build ends or
//! the user aborts.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        StreamConsumer                          │
//! │                                                                │
//! │  start_stream() ──► begin(): generation += 1, new token,       │
//! │        │                     cancel previous, reset snapshot   │
//! │        ▼                                                       │
//! │   HTTP request ──► status check ──► pump(bytes_stream)         │
//! │                                        │                       │
//! │                         Utf8Decoder ◄──┘                       │
//! │                              │                                 │
//! │                              ▼                                 │
//! │                  SnapshotSink (generation-checked)             │
//! │                              │                                 │
//! │                              ▼                                 │
//! │              watch::Sender<StreamSnapshot> ──► UI              │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Terminal outcomes
//!
//! Every session ends in exactly one [`StreamOutcome`]:
//!
//! - [`StreamOutcome::Completed`]: the body ended
//! - [`StreamOutcome::Cancelled`]: aborted or superseded (not an error)
//! - [`StreamOutcome::Failed`]: bad status, transport or read failure
//!
//! There are no retries. Callers start a fresh session instead.
//!
//! # Example
//!
//! ```ignore
//! use fleet_core::stream::StreamConsumer;
//!
//! let consumer = StreamConsumer::from_config(&config.api)?;
//! let mut updates = consumer.subscribe();
//! let outcome = consumer.follow_build("script-42").await;
//! println!("{}", updates.borrow_and_update().text);
//! ```

mod consumer;
mod decoder;
mod session;

pub use consumer::{AbortHandle, StreamConsumer, StreamRequest, StreamSnapshot};
pub use decoder::Utf8Decoder;
pub use session::{pump, ChunkSink, StreamError, StreamOutcome, StreamSession};
