//! Per-session activity engine: incremental sync, write-through cache,
//! hot/cold stream composition, and read-through single-activity fetch.

use crate::error::Result;
use crate::model::{rehydrate_artifact, Activity, Artifact, ActivityType, Originator, parse_rfc3339_millis};
use crate::network::NetworkAdapter;
use crate::storage::ActivityStore;
use futures::stream::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Options for [`ActivityClient::select`].
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    pub after: Option<String>,
    pub before: Option<String>,
    pub activity_type: Option<ActivityType>,
    pub limit: Option<usize>,
}

fn rehydrate(mut activity: Activity) -> Activity {
    activity.artifacts = activity
        .artifacts
        .into_iter()
        .map(|a| match a {
            Artifact::Unknown(v) => rehydrate_artifact(v),
            other => other,
        })
        .collect();
    activity
}

enum UpdatesState {
    Init(Arc<ActivityClient>),
    Running {
        client: Arc<ActivityClient>,
        raw: Pin<Box<dyn Stream<Item = Result<Activity>> + Send>>,
        mark: Option<(i64, String)>,
    },
}

/// Owns the high-water-mark during a single `updates()` invocation; never
/// shared across calls.
pub struct ActivityClient {
    storage: Arc<dyn ActivityStore>,
    network: Arc<NetworkAdapter>,
    frozen_session_threshold: Duration,
}

impl ActivityClient {
    pub fn new(
        storage: Arc<dyn ActivityStore>,
        network: Arc<NetworkAdapter>,
        frozen_session_threshold: Duration,
    ) -> Self {
        Self {
            storage,
            network,
            frozen_session_threshold,
        }
    }

    /// Sync new activities from the network. Returns the count newly cached.
    ///
    /// If the latest cached activity is older than `frozen_session_threshold`
    /// this is a frozen session and the sync is skipped entirely (no HTTP
    /// calls) — the remote session is assumed to be over and immutable.
    pub async fn hydrate(&self) -> Result<usize> {
        self.storage.init().await?;
        let latest = self.storage.latest().await?;

        if let Some(latest) = &latest {
            if let Some(latest_millis) = parse_rfc3339_millis(&latest.create_time) {
                let now = now_millis();
                if now.saturating_sub(latest_millis) as u128 > self.frozen_session_threshold.as_millis()
                {
                    return Ok(0);
                }
            }
        }

        let filter = latest
            .as_ref()
            .map(|a| format!("create_time>\"{}\"", a.create_time));

        let mut newly_cached = 0usize;
        let mut page_token: Option<String> = None;
        loop {
            let page = self
                .network
                .list_activities(None, page_token.clone(), filter.clone())
                .await?;
            for activity in page.activities {
                if self.storage.get(&activity.id).await?.is_none() {
                    self.storage.append(activity).await?;
                    newly_cached += 1;
                }
            }
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(newly_cached)
    }

    /// `hydrate()` then yield every cached activity, rehydrated.
    pub async fn history(&self) -> Result<Vec<Activity>> {
        self.hydrate().await?;
        let activities = self.storage.scan().await?;
        Ok(activities.into_iter().map(rehydrate).collect())
    }

    /// Hot stream of activities newer than the high-water-mark established at
    /// call time, write-through cached as they arrive.
    pub fn updates(self: Arc<Self>) -> Pin<Box<dyn Stream<Item = Result<Activity>> + Send>> {
        Box::pin(futures::stream::unfold(
            UpdatesState::Init(self),
            |state| async move {
                let (client, mut raw, mark) = match state {
                    UpdatesState::Init(client) => match establish_mark(&client).await {
                        Ok(mark) => {
                            let raw = client.network.clone().raw_stream();
                            (client, raw, mark)
                        }
                        Err(e) => return Some((Err(e), UpdatesState::Init(client))),
                    },
                    UpdatesState::Running { client, raw, mark } => (client, raw, mark),
                };

                // Drain the raw stream one activity at a time, applying the
                // dedup rule, until we find one worth yielding.
                loop {
                    match raw.next().await {
                        Some(Ok(activity)) => {
                            let activity_millis = parse_rfc3339_millis(&activity.create_time).unwrap_or(0);
                            let skip = match &mark {
                                Some((mark_millis, mark_id)) => {
                                    activity_millis < *mark_millis
                                        || (activity_millis == *mark_millis && &activity.id == mark_id)
                                }
                                None => false,
                            };
                            if skip {
                                continue;
                            }
                            if let Err(e) = client.storage.append(activity.clone()).await {
                                return Some((Err(e), UpdatesState::Running { client, raw, mark }));
                            }
                            let new_mark = Some((activity_millis, activity.id.clone()));
                            return Some((
                                Ok(rehydrate(activity)),
                                UpdatesState::Running {
                                    client,
                                    raw,
                                    mark: new_mark,
                                },
                            ));
                        }
                        Some(Err(e)) => {
                            return Some((Err(e), UpdatesState::Running { client, raw, mark }));
                        }
                        None => return None,
                    }
                }
            },
        ))
    }

    /// `history()` followed by `updates()`, with no gap between them since
    /// `updates()` re-derives its mark at call time.
    pub fn stream(self: Arc<Self>) -> Pin<Box<dyn Stream<Item = Result<Activity>> + Send>> {
        let history = {
            let client = self.clone();
            futures::stream::once(async move { client.history().await })
                .flat_map(|result| match result {
                    Ok(activities) => futures::stream::iter(activities.into_iter().map(Ok)).boxed(),
                    Err(e) => futures::stream::iter(vec![Err(e)]).boxed(),
                })
        };
        Box::pin(history.chain(self.updates()))
    }

    /// Linear scan of cached activities with id-based cursors.
    pub async fn select(&self, options: SelectOptions) -> Result<Vec<Activity>> {
        let all = self.storage.scan().await?;
        let mut out = Vec::new();
        let mut skipping = options.after.is_some();
        for activity in all {
            if let Some(after) = &options.after {
                if skipping {
                    if &activity.id == after {
                        skipping = false;
                    }
                    continue;
                }
            }
            if let Some(before) = &options.before {
                if &activity.id == before {
                    break;
                }
            }
            if let Some(t) = options.activity_type {
                if activity.activity_type != t {
                    continue;
                }
            }
            out.push(rehydrate(activity));
            if let Some(limit) = options.limit {
                if out.len() >= limit {
                    break;
                }
            }
        }
        Ok(out)
    }

    /// Read-through single-activity fetch.
    pub async fn get(&self, id: &str) -> Result<Activity> {
        if let Some(activity) = self.storage.get(id).await? {
            return Ok(rehydrate(activity));
        }
        let activity = self.network.fetch_activity(id).await?;
        self.storage.append(activity.clone()).await?;
        Ok(rehydrate(activity))
    }
}

async fn establish_mark(client: &ActivityClient) -> Result<Option<(i64, String)>> {
    let latest = client.storage.latest().await?;
    Ok(latest.and_then(|a| parse_rfc3339_millis(&a.create_time).map(|ms| (ms, a.id))))
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

pub fn originator_is_user(activity: &Activity) -> bool {
    activity.originator == Originator::User
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::http::HttpClient;
    use crate::platform::TokioPlatform;
    use crate::storage::MemoryActivityStore;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: String, threshold: Duration) -> ActivityClient {
        let config = ClientConfig::builder()
            .api_key("key")
            .base_url(base_url)
            .build();
        let http = Arc::new(HttpClient::new(config).unwrap());
        let platform: Arc<dyn crate::platform::Platform> = Arc::new(TokioPlatform);
        let network = Arc::new(NetworkAdapter::new(
            http,
            platform,
            "s1",
            Duration::from_millis(10),
        ));
        ActivityClient::new(Arc::new(MemoryActivityStore::new()), network, threshold)
    }

    fn activity_json(id: &str, create_time: &str) -> serde_json::Value {
        json!({
            "id": id, "sessionId": "s1", "createTime": create_time,
            "originator": "agent", "type": "agentMessaged", "artifacts": []
        })
    }

    #[tokio::test]
    async fn hydrate_appends_only_new_activities() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sessions/s1/activities"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "activities": [
                    activity_json("a1", "2026-01-01T00:00:00Z"),
                    activity_json("a2", "2026-01-01T00:01:00Z"),
                ]
            })))
            .mount(&server)
            .await;

        let client = client(server.uri(), Duration::from_secs(3600 * 24 * 30));
        let count = client.hydrate().await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(client.storage.scan().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn frozen_session_skips_network_entirely() {
        let server = MockServer::start().await;
        // No mock mounted: any request would fail/panic via wiremock's strict mode.
        let client = client(server.uri(), Duration::from_millis(1));
        let stale = Activity {
            id: "old".into(),
            session_id: "s1".into(),
            create_time: "2000-01-01T00:00:00Z".into(),
            originator: Originator::Agent,
            activity_type: ActivityType::AgentMessaged,
            artifacts: vec![],
            payload: Default::default(),
        };
        client.storage.append(stale).await.unwrap();
        let count = client.hydrate().await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn select_after_cursor_is_exclusive() {
        let server = MockServer::start().await;
        let client = client(server.uri(), Duration::from_secs(3600));
        for (id, t) in [("a1", "T1"), ("a2", "T2"), ("a3", "T3")] {
            client
                .storage
                .append(Activity {
                    id: id.into(),
                    session_id: "s1".into(),
                    create_time: t.into(),
                    originator: Originator::Agent,
                    activity_type: ActivityType::AgentMessaged,
                    artifacts: vec![],
                    payload: Default::default(),
                })
                .await
                .unwrap();
        }
        let result = client
            .select(SelectOptions {
                after: Some("a1".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(
            result.iter().map(|a| a.id.clone()).collect::<Vec<_>>(),
            vec!["a2", "a3"]
        );
    }

    #[tokio::test]
    async fn updates_dedups_against_the_high_water_mark() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sessions/s1/activities"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "activities": [
                    activity_json("a1", "2026-01-01T00:00:00Z"),
                    activity_json("a2", "2026-01-01T00:01:00Z"),
                ]
            })))
            .mount(&server)
            .await;

        let client = Arc::new(client(server.uri(), Duration::from_secs(3600)));
        client
            .storage
            .append(Activity {
                id: "a1".into(),
                session_id: "s1".into(),
                create_time: "2026-01-01T00:00:00Z".into(),
                originator: Originator::Agent,
                activity_type: ActivityType::AgentMessaged,
                artifacts: vec![],
                payload: Default::default(),
            })
            .await
            .unwrap();

        let mut updates = client.updates();
        let first = updates.next().await.unwrap().unwrap();
        assert_eq!(first.id, "a2");
    }

    #[tokio::test]
    async fn get_is_read_through_on_cache_miss() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sessions/s1/activities/a9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(activity_json("a9", "T9")))
            .mount(&server)
            .await;
        let client = client(server.uri(), Duration::from_secs(3600));
        let activity = client.get("a9").await.unwrap();
        assert_eq!(activity.id, "a9");
        assert!(client.storage.get("a9").await.unwrap().is_some());
    }
}
