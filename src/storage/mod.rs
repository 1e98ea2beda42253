//! Write-through caches for activities and session envelopes.
//!
//! Both stores come in two flavors behind the same trait: a file-backed
//! implementation (newline-delimited JSON under the configured cache root)
//! and an in-memory implementation used under `JULES_FORCE_MEMORY_STORAGE`
//! or in tests.

mod activity_store;
mod session_store;

pub use activity_store::{ActivityStore, FileActivityStore, MemoryActivityStore};
pub use session_store::{FileSessionStore, MemorySessionStore, SessionStore};
