//! # jules-fleet-sdk
//!
//! A Rust SDK for the Jules coding-agent API, plus a GitHub-backed fleet
//! orchestration layer built on top of it.
//!
//! ## Overview
//!
//! The SDK gives you:
//! - **Sessions**: start and drive automated coding sessions against a repo
//! - **Activities**: the append-only event stream a session produces
//! - **A structured query engine**: `jql`-style filtering, sorting, cursor
//!   pagination, and inclusion across the local session/activity cache
//! - **Local caching**: sessions and activities are mirrored to disk (or
//!   memory, under test) so repeated reads don't re-hit the network
//! - **Fleet orchestration**: a `fleet` module that coordinates many
//!   sessions against GitHub issues/PRs — init, configure, signal, dispatch,
//!   analyze, merge, trace
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use jules_fleet::{Client, ClientConfig, NewSessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder().api_key("...").build();
//!     let client = Client::new(config)?;
//!
//!     let session = client
//!         .run(NewSessionConfig::new("Fix the flaky test", "acme", "widgets"))
//!         .await?;
//!     println!("started {}", session.id());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **client**: `Client`, session lifecycle (`run`, `session`, `sessions`, `sync`)
//! - **model**: wire types for sessions and activities
//! - **storage**: write-through caches for sessions/activities (file or memory)
//! - **network**: paginated HTTP fetch over the Jules REST surface
//! - **activity_client** / **session_client**: per-session activity access
//! - **query**: the structured query engine (`JulesQuery`, `QueryEngine`)
//! - **fleet**: GitHub-backed multi-session orchestration
//! - **config**: provider/endpoint configuration helpers
//! - **error**: the `Error` enum and `Result<T>` alias
//! - **retry**: full-jitter exponential backoff
//! - **platform**: injectable clock/sleep for deterministic tests

mod activity_client;

/// Core client implementation: session lifecycle, sync, and the cursor-based
/// sessions/all iterators.
mod client;

/// Provider/endpoint configuration helpers and `ClientConfig`.
mod config;

/// Error types and conversions used across all public APIs.
mod error;

/// Thin HTTP layer wrapping `reqwest`, shared by `network` and `client`.
mod http;

/// Wire model types for sessions and activities.
mod model;

/// Paginated fetch over the Jules REST surface.
mod network;

/// Injectable clock/sleep, so retry and polling logic is deterministic under test.
mod platform;

/// The structured query engine (`JulesQuery`, `QueryEngine`, `Domain`, etc).
pub mod query;

/// Full-jitter exponential backoff, used by `network` and the fleet handlers.
pub mod retry;

/// Per-session activity access (`ActivityClient`, `SelectOptions`).
mod session_client;

/// Write-through caches for sessions and activities.
mod storage;

pub use activity_client::{ActivityClient, SelectOptions, originator_is_user};
pub use client::{
    AllOptions, AutomatedSession, Client, NewSessionConfig, SessionsCursor, SessionsQuery,
    SyncDepth, SyncOptions, SyncProgress, connect, default_client,
};
pub use config::{
    ClientConfig, ClientConfigBuilder, DEFAULT_BASE_URL, DEFAULT_CACHE_DIR, RateLimitRetryConfig,
    RepoCoordinates, get_base_branch, get_base_url, get_cache_dir,
};
pub use error::{Error, Result};
pub use model::{
    Activity, ActivityType, Artifact, CachedSession, ChangeType, FileDiff, Originator,
    SessionIndexEntry, SessionOutput, SessionResource, SessionSnapshot, SessionSource,
    SessionState,
};
pub use platform::{Platform, TokioPlatform};
pub use session_client::{SessionClient, StreamOptions};
pub use storage::{ActivityStore, FileActivityStore, FileSessionStore, MemoryActivityStore, MemorySessionStore, SessionStore};

/// GitHub-backed multi-session orchestration: init, configure, signal,
/// dispatch, analyze, merge, trace.
pub mod fleet;

/// Convenience module bundling the most commonly used types.
///
/// Import with `use jules_fleet::prelude::*;` for typical client usage.
pub mod prelude {
    pub use crate::{
        Activity, ActivityType, Client, ClientConfig, Error, NewSessionConfig, Result,
        SessionClient, SessionResource, SessionState,
    };
    pub use crate::query::{Domain, Include, JulesQuery, Order, QueryEngine};
}
