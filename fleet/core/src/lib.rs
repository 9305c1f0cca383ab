//! Fleet Core - Client Engine for the code-server Fleet Console
//!
//! This crate holds the non-visual half of a console that manages a fleet of
//! containerized development environments (code-server instances). UI layers
//! (the `fleetctl` terminal front end, or anything else) call into it; it never
//! renders anything itself.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        UI / fleetctl                              │
//! └──────┬──────────────────────┬───────────────────────┬────────────┘
//!        │ follow_build / abort │ start / stop / tick   │ list / create
//!        ▼                      ▼                       ▼
//! ┌──────────────┐      ┌───────────────┐       ┌──────────────┐
//! │    stream    │      │     feed      │       │     api      │
//! │StreamConsumer│      │ FeedSimulator │       │  ApiClient   │
//! │ (watch view) │      │ LogFeed (100) │       │ (envelopes)  │
//! └──────┬───────┘      └───────┬───────┘       └──────┬───────┘
//!        │ streamed body        │ EventSource          │ JSON
//!        ▼                      ▼                      ▼
//!   /docker-scripts/{id}/   synthetic, replay,     /code-server, /credentials,
//!      build-image          channel                /docker-scripts, /templates
//! ```
//!
//! The stream consumer and the feed simulator are independent of each other.
//!
//! # Key Types
//!
//! - [`StreamConsumer`]: follows a streamed HTTP body with cancellation
//! - [`StreamOutcome`]: how a stream session ended
//! - [`FeedSimulator`]: timer-driven, bounded log feed
//! - [`LogFilter`]: read-only level/search view over a feed
//! - [`ApiClient`]: CRUD calls against the fleet API
//! - [`FleetConfig`]: layered configuration
//!
//! # Quick Start
//!
//! ```ignore
//! use fleet_core::{config, StreamConsumer};
//!
//! let config = config::load_config()?;
//! let consumer = StreamConsumer::from_config(&config.api)?;
//! let mut view = consumer.subscribe();
//!
//! tokio::spawn(async move {
//!     while view.changed().await.is_ok() {
//!         render(&view.borrow_and_update().text);
//!     }
//! });
//!
//! let outcome = consumer.follow_build("script-42").await;
//! ```
//!
//! # Module Overview
//!
//! - [`stream`]: incremental streamed-body consumption
//! - [`feed`]: log entries, bounded feed, filters, event sources, simulator
//! - [`api`]: endpoints, response envelope, domain models, HTTP client
//! - [`config`]: TOML + environment configuration

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod config;
pub mod feed;
pub mod stream;

pub use api::{ApiClient, ApiError, Endpoints};
pub use config::{load_config, ConfigError, ConfigOverrides, FleetConfig};
pub use feed::{
    EventSource, FeedSimulator, FeedState, LogEntry, LogFeed, LogFilter, LogLevel,
    SyntheticSource,
};
pub use stream::{AbortHandle, StreamConsumer, StreamError, StreamOutcome, StreamSnapshot};
