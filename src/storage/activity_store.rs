//! Append-only per-session activity log with a unique id index and a cached
//! latest pointer.

use crate::error::Result;
use crate::model::Activity;
use crate::platform::Platform;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

const TAIL_CHUNK_SIZE: usize = 8192;

/// Append-only store for one session's activities.
///
/// `append` is idempotent on id: re-appending an activity with an id already
/// present updates the stored value in place without changing its position
/// in `scan()` order.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn init(&self) -> Result<()>;
    async fn close(&self) -> Result<()>;
    async fn append(&self, activity: Activity) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<Activity>>;
    async fn latest(&self) -> Result<Option<Activity>>;
    async fn scan(&self) -> Result<Vec<Activity>>;
    /// Most recent `n` activities, in append order. File-backed
    /// implementations satisfy this without scanning the whole log.
    async fn latest_activities(&self, n: usize) -> Result<Vec<Activity>>;
}

#[derive(Default)]
struct Index {
    order: Vec<String>,
    by_id: HashMap<String, Activity>,
}

impl Index {
    fn record(&mut self, activity: Activity) {
        if !self.by_id.contains_key(&activity.id) {
            self.order.push(activity.id.clone());
        }
        self.by_id.insert(activity.id.clone(), activity);
    }

    fn to_jsonl(&self) -> String {
        let mut out = String::new();
        for id in &self.order {
            if let Some(activity) = self.by_id.get(id) {
                out.push_str(&serde_json::to_string(activity).unwrap_or_default());
                out.push('\n');
            }
        }
        out
    }
}

/// File-backed activity store: `<session_dir>/activities.jsonl` holds one
/// JSON record per line in append order; `<session_dir>/metadata.json` holds
/// `{activityCount}`.
pub struct FileActivityStore {
    platform: Arc<dyn Platform>,
    session_dir: PathBuf,
    state: Mutex<Index>,
}

impl FileActivityStore {
    pub fn new(platform: Arc<dyn Platform>, session_dir: PathBuf) -> Self {
        Self {
            platform,
            session_dir,
            state: Mutex::new(Index::default()),
        }
    }

    fn log_path(&self) -> PathBuf {
        self.session_dir.join("activities.jsonl")
    }

    fn metadata_path(&self) -> PathBuf {
        self.session_dir.join("metadata.json")
    }

    async fn persist(&self, index: &Index) -> Result<()> {
        self.platform
            .write_file(&self.log_path(), index.to_jsonl().as_bytes())
            .await?;
        let metadata = serde_json::json!({ "activityCount": index.order.len() });
        self.platform
            .write_file(&self.metadata_path(), metadata.to_string().as_bytes())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ActivityStore for FileActivityStore {
    async fn init(&self) -> Result<()> {
        self.platform.create_dir_all(&self.session_dir).await?;
        if !self.platform.file_exists(&self.log_path()).await {
            return Ok(());
        }
        let bytes = self.platform.read_file(&self.log_path()).await?;
        let mut index = Index::default();
        for line in bytes.split(|&b| b == b'\n') {
            if line.is_empty() {
                continue;
            }
            if let Ok(activity) = serde_json::from_slice::<Activity>(line) {
                index.record(activity);
            }
        }
        *self.state.lock().await = index;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    async fn append(&self, activity: Activity) -> Result<()> {
        let mut index = self.state.lock().await;
        index.record(activity);
        self.persist(&index).await
    }

    async fn get(&self, id: &str) -> Result<Option<Activity>> {
        Ok(self.state.lock().await.by_id.get(id).cloned())
    }

    async fn latest(&self) -> Result<Option<Activity>> {
        let index = self.state.lock().await;
        Ok(index
            .order
            .last()
            .and_then(|id| index.by_id.get(id))
            .cloned())
    }

    async fn scan(&self) -> Result<Vec<Activity>> {
        let index = self.state.lock().await;
        Ok(index
            .order
            .iter()
            .filter_map(|id| index.by_id.get(id).cloned())
            .collect())
    }

    async fn latest_activities(&self, n: usize) -> Result<Vec<Activity>> {
        if !self.platform.file_exists(&self.log_path()).await {
            return Ok(Vec::new());
        }
        let bytes = self.platform.read_file(&self.log_path()).await?;
        let lines = tail_chunk_lines(&bytes, n);
        Ok(lines
            .iter()
            .filter_map(|line| serde_json::from_slice::<Activity>(line).ok())
            .collect())
    }
}

/// In-memory activity store, used under `JULES_FORCE_MEMORY_STORAGE` or tests.
#[derive(Default)]
pub struct MemoryActivityStore {
    state: Mutex<Index>,
}

impl MemoryActivityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActivityStore for MemoryActivityStore {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    async fn append(&self, activity: Activity) -> Result<()> {
        self.state.lock().await.record(activity);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Activity>> {
        Ok(self.state.lock().await.by_id.get(id).cloned())
    }

    async fn latest(&self) -> Result<Option<Activity>> {
        let index = self.state.lock().await;
        Ok(index
            .order
            .last()
            .and_then(|id| index.by_id.get(id))
            .cloned())
    }

    async fn scan(&self) -> Result<Vec<Activity>> {
        let index = self.state.lock().await;
        Ok(index
            .order
            .iter()
            .filter_map(|id| index.by_id.get(id).cloned())
            .collect())
    }

    async fn latest_activities(&self, n: usize) -> Result<Vec<Activity>> {
        let index = self.state.lock().await;
        let start = index.order.len().saturating_sub(n);
        Ok(index.order[start..]
            .iter()
            .filter_map(|id| index.by_id.get(id).cloned())
            .collect())
    }
}

/// Read the last `n` newline-delimited records out of `data` by scanning
/// backward in fixed-size chunks, so a recent-N query need not parse records
/// it is going to discard.
fn tail_chunk_lines(data: &[u8], n: usize) -> Vec<Vec<u8>> {
    if n == 0 || data.is_empty() {
        return Vec::new();
    }
    let trimmed = if data.ends_with(b"\n") {
        &data[..data.len() - 1]
    } else {
        data
    };
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut newline_positions = Vec::new();
    let mut end = trimmed.len();
    while newline_positions.len() <= n && end > 0 {
        let start = end.saturating_sub(TAIL_CHUNK_SIZE);
        let chunk = &trimmed[start..end];
        let mut local: Vec<usize> = chunk
            .iter()
            .enumerate()
            .filter(|&(_, &b)| b == b'\n')
            .map(|(i, _)| start + i)
            .collect();
        local.reverse();
        newline_positions.extend(local);
        if start == 0 {
            break;
        }
        end = start;
    }

    let mut lines = Vec::new();
    let mut slice_end = trimmed.len();
    for &pos in newline_positions.iter() {
        if lines.len() >= n {
            break;
        }
        lines.push(trimmed[pos + 1..slice_end].to_vec());
        slice_end = pos;
    }
    if lines.len() < n {
        lines.push(trimmed[..slice_end].to_vec());
    }
    lines.reverse();
    lines
}
