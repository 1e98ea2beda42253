//! Process-wide session cache: one envelope per session plus an append-only
//! index used for cheap `scanIndex()` enumeration.

use crate::error::Result;
use crate::model::{CachedSession, SessionIndexEntry, SessionResource, now_millis};
use crate::platform::Platform;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Aggregate counters kept in `global-metadata.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GlobalMetadata {
    #[serde(rename = "lastSyncedAt")]
    pub last_synced_at: i64,
    #[serde(rename = "sessionCount")]
    pub session_count: usize,
}

/// Cache of session envelopes, keyed by session id.
///
/// `delete` removes the envelope but never compacts the index: `scanIndex()`
/// may still surface stale entries for deleted sessions (normal operation
/// treats the index as append-only).
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn init(&self) -> Result<()>;
    async fn upsert(&self, resource: SessionResource) -> Result<()>;
    async fn upsert_many(&self, resources: Vec<SessionResource>) -> Result<()> {
        for resource in resources {
            self.upsert(resource).await?;
        }
        Ok(())
    }
    async fn get(&self, id: &str) -> Result<Option<CachedSession>>;
    async fn delete(&self, id: &str) -> Result<()>;
    async fn scan_index(&self) -> Result<Vec<SessionIndexEntry>>;
    async fn global_metadata(&self) -> Result<GlobalMetadata>;
}

#[derive(Default)]
struct State {
    envelopes: HashMap<String, CachedSession>,
    index: Vec<SessionIndexEntry>,
}

/// File-backed session store.
///
/// Layout: `<root>/global-metadata.json`, `<root>/<id>/session.json`
/// (the cached envelope), `<root>/index.jsonl` (append-only index entries).
pub struct FileSessionStore {
    platform: Arc<dyn Platform>,
    root: PathBuf,
    state: Mutex<State>,
}

impl FileSessionStore {
    pub fn new(platform: Arc<dyn Platform>, root: PathBuf) -> Self {
        Self {
            platform,
            root,
            state: Mutex::new(State::default()),
        }
    }

    fn session_path(&self, id: &str) -> PathBuf {
        self.root.join(id).join("session.json")
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("index.jsonl")
    }

    fn global_metadata_path(&self) -> PathBuf {
        self.root.join("global-metadata.json")
    }

    async fn persist_index(&self, index: &[SessionIndexEntry]) -> Result<()> {
        let mut out = String::new();
        for entry in index {
            out.push_str(&serde_json::to_string(entry).unwrap_or_default());
            out.push('\n');
        }
        self.platform
            .write_file(&self.index_path(), out.as_bytes())
            .await?;
        Ok(())
    }

    async fn persist_global_metadata(&self, state: &State) -> Result<()> {
        let metadata = GlobalMetadata {
            last_synced_at: state
                .envelopes
                .values()
                .map(|e| e.last_synced_at)
                .max()
                .unwrap_or(0),
            session_count: state.envelopes.len(),
        };
        self.platform
            .write_file(
                &self.global_metadata_path(),
                serde_json::to_string(&metadata)?.as_bytes(),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn init(&self) -> Result<()> {
        self.platform.create_dir_all(&self.root).await?;
        let mut state = State::default();

        if self.platform.file_exists(&self.index_path()).await {
            let bytes = self.platform.read_file(&self.index_path()).await?;
            for line in bytes.split(|&b| b == b'\n') {
                if line.is_empty() {
                    continue;
                }
                if let Ok(entry) = serde_json::from_slice::<SessionIndexEntry>(line) {
                    state.index.push(entry);
                }
            }
        }
        for entry in state.index.clone() {
            let path = self.session_path(&entry.id);
            if self.platform.file_exists(&path).await {
                if let Ok(bytes) = self.platform.read_file(&path).await {
                    if let Ok(envelope) = serde_json::from_slice::<CachedSession>(&bytes) {
                        state.envelopes.insert(entry.id.clone(), envelope);
                    }
                }
            }
        }
        *self.state.lock().await = state;
        Ok(())
    }

    async fn upsert(&self, mut resource: SessionResource) -> Result<()> {
        resource.id = crate::model::SessionResource::normalize_id(&resource.id).to_string();
        let mut state = self.state.lock().await;
        let entry = SessionIndexEntry::from(&resource);
        let envelope = CachedSession {
            resource: resource.clone(),
            last_synced_at: now_millis(),
        };

        self.platform.create_dir_all(&self.root.join(&resource.id)).await?;
        self.platform
            .write_file(&self.session_path(&resource.id), serde_json::to_string(&envelope)?.as_bytes())
            .await?;

        state.envelopes.insert(resource.id.clone(), envelope);
        state.index.push(entry);
        self.persist_index(&state.index).await?;
        self.persist_global_metadata(&state).await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<CachedSession>> {
        let id = crate::model::SessionResource::normalize_id(id);
        Ok(self.state.lock().await.envelopes.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let id = crate::model::SessionResource::normalize_id(id);
        let mut state = self.state.lock().await;
        state.envelopes.remove(id);
        self.platform.delete_file(&self.session_path(id)).await?;
        self.persist_global_metadata(&state).await?;
        Ok(())
    }

    async fn scan_index(&self) -> Result<Vec<SessionIndexEntry>> {
        Ok(self.state.lock().await.index.clone())
    }

    async fn global_metadata(&self) -> Result<GlobalMetadata> {
        if self.platform.file_exists(&self.global_metadata_path()).await {
            let bytes = self.platform.read_file(&self.global_metadata_path()).await?;
            if let Ok(metadata) = serde_json::from_slice::<GlobalMetadata>(&bytes) {
                return Ok(metadata);
            }
        }
        // Migration path: no metadata file yet, fall back to a full scan.
        let state = self.state.lock().await;
        Ok(GlobalMetadata {
            last_synced_at: state.envelopes.values().map(|e| e.last_synced_at).max().unwrap_or(0),
            session_count: state.envelopes.len(),
        })
    }
}

/// In-memory session store, used under `JULES_FORCE_MEMORY_STORAGE` or tests.
#[derive(Default)]
pub struct MemorySessionStore {
    state: Mutex<State>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, mut resource: SessionResource) -> Result<()> {
        resource.id = crate::model::SessionResource::normalize_id(&resource.id).to_string();
        let mut state = self.state.lock().await;
        let entry = SessionIndexEntry::from(&resource);
        state.envelopes.insert(
            resource.id.clone(),
            CachedSession {
                resource,
                last_synced_at: now_millis(),
            },
        );
        state.index.push(entry);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<CachedSession>> {
        let id = crate::model::SessionResource::normalize_id(id);
        Ok(self.state.lock().await.envelopes.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let id = crate::model::SessionResource::normalize_id(id);
        self.state.lock().await.envelopes.remove(id);
        Ok(())
    }

    async fn scan_index(&self) -> Result<Vec<SessionIndexEntry>> {
        Ok(self.state.lock().await.index.clone())
    }

    async fn global_metadata(&self) -> Result<GlobalMetadata> {
        let state = self.state.lock().await;
        Ok(GlobalMetadata {
            last_synced_at: state.envelopes.values().map(|e| e.last_synced_at).max().unwrap_or(0),
            session_count: state.envelopes.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SessionSource, SessionState};
    use crate::platform::TokioPlatform;

    fn resource(id: &str, title: &str) -> SessionResource {
        SessionResource {
            id: id.to_string(),
            name: String::new(),
            title: title.to_string(),
            prompt: String::new(),
            source: SessionSource {
                owner: "acme".into(),
                repo: "widgets".into(),
                base_branch: "main".into(),
            },
            source_context: String::new(),
            url: String::new(),
            state: SessionState::InProgress,
            create_time: "2026-01-01T00:00:00Z".into(),
            update_time: "2026-01-01T00:00:00Z".into(),
            outputs: vec![],
        }
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let store = MemorySessionStore::new();
        store.upsert(resource("s1", "Title")).await.unwrap();
        let cached = store.get("s1").await.unwrap().unwrap();
        assert_eq!(cached.resource.title, "Title");
    }

    #[tokio::test]
    async fn get_strips_sessions_prefix() {
        let store = MemorySessionStore::new();
        store.upsert(resource("s1", "Title")).await.unwrap();
        assert!(store.get("sessions/s1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_removes_envelope_but_not_index() {
        let store = MemorySessionStore::new();
        store.upsert(resource("s1", "Title")).await.unwrap();
        store.delete("s1").await.unwrap();
        assert!(store.get("s1").await.unwrap().is_none());
        let index = store.scan_index().await.unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index[0].id, "s1");
    }

    #[tokio::test]
    async fn repeated_upserts_append_to_index() {
        let store = MemorySessionStore::new();
        store.upsert(resource("s1", "A")).await.unwrap();
        store.upsert(resource("s1", "B")).await.unwrap();
        assert_eq!(store.scan_index().await.unwrap().len(), 2);
        assert_eq!(store.get("s1").await.unwrap().unwrap().resource.title, "B");
    }

    #[tokio::test]
    async fn file_store_round_trips_through_init() {
        let dir = tempfile::tempdir().unwrap();
        let platform: Arc<dyn Platform> = Arc::new(TokioPlatform);

        {
            let store = FileSessionStore::new(platform.clone(), dir.path().to_path_buf());
            store.init().await.unwrap();
            store.upsert(resource("s1", "Title")).await.unwrap();
        }

        let reopened = FileSessionStore::new(platform, dir.path().to_path_buf());
        reopened.init().await.unwrap();
        assert!(reopened.get("s1").await.unwrap().is_some());
        let metadata = reopened.global_metadata().await.unwrap();
        assert_eq!(metadata.session_count, 1);
    }
}
