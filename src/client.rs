//! Top-level client: factory for sessions, bounded-parallel session fan-out,
//! and cache reconciliation (`sync`).

use crate::activity_client::ActivityClient;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestSpec};
use crate::model::{parse_rfc3339_millis, SessionResource};
use crate::network::NetworkAdapter;
use crate::platform::{Platform, TokioPlatform};
use crate::session_client::SessionClient;
use crate::storage::{
    ActivityStore, FileActivityStore, FileSessionStore, MemoryActivityStore, MemorySessionStore,
    SessionStore,
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::{Arc, OnceLock};

/// Config for creating a new remote session via [`Client::session`]/[`Client::run`].
#[derive(Debug, Clone)]
pub struct NewSessionConfig {
    pub prompt: String,
    pub owner: String,
    pub repo: String,
    pub base_branch: String,
    pub title: Option<String>,
    pub require_approval: bool,
    pub auto_pr: bool,
}

impl NewSessionConfig {
    pub fn new(prompt: impl Into<String>, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            owner: owner.into(),
            repo: repo.into(),
            base_branch: "main".to_string(),
            title: None,
            require_approval: true,
            auto_pr: false,
        }
    }

    pub fn base_branch(mut self, branch: impl Into<String>) -> Self {
        self.base_branch = branch.into();
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn require_approval(mut self, value: bool) -> Self {
        self.require_approval = value;
        self
    }

    pub fn auto_pr(mut self, value: bool) -> Self {
        self.auto_pr = value;
        self
    }
}

#[derive(Serialize)]
struct CreateSessionBody {
    prompt: String,
    #[serde(rename = "sourceContext")]
    source_context: SourceContextBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(rename = "automationMode")]
    automation_mode: &'static str,
    #[serde(rename = "requirePlanApproval")]
    require_plan_approval: bool,
}

#[derive(Serialize)]
struct SourceContextBody {
    source: String,
    #[serde(rename = "baseBranch")]
    base_branch: String,
}

/// Facade returned by [`Client::run`]: a session created with
/// `requireApproval=false, autoPr=true` baked in at creation time.
pub struct AutomatedSession {
    session: SessionClient,
}

impl AutomatedSession {
    pub fn id(&self) -> &str {
        self.session.id()
    }

    pub fn stream(&self) -> Pin<Box<dyn Stream<Item = Result<crate::model::Activity>> + Send>> {
        self.session.stream(crate::session_client::StreamOptions::default())
    }

    pub async fn result(&self, timeout: Option<std::time::Duration>) -> Result<SessionResource> {
        self.session.result(timeout).await
    }
}

/// Query parameters for [`Client::sessions`].
#[derive(Debug, Clone, Default)]
pub struct SessionsQuery {
    pub page_size: Option<u32>,
    pub page_token: Option<String>,
    pub filter: Option<String>,
    pub limit: Option<usize>,
}

/// Both awaitable (first page) and streamable (all pages, write-through
/// upserted into session storage) cursor over `GET sessions`.
pub struct SessionsCursor {
    http: Arc<HttpClient>,
    session_storage: Arc<dyn SessionStore>,
    page_size: Option<u32>,
    page_token: Option<String>,
    filter: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ListSessionsResponse {
    #[serde(default)]
    sessions: Vec<serde_json::Value>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

impl SessionsCursor {
    async fn fetch_page(
        &self,
        page_token: Option<String>,
    ) -> Result<(Vec<SessionResource>, Option<String>)> {
        let spec = RequestSpec::get("sessions")
            .with_query_opt("pageSize", self.page_size)
            .with_query_opt("pageToken", page_token)
            .with_query_opt("filter", self.filter.clone());
        let response: ListSessionsResponse = self.http.request(spec).await?;
        let mut resources = Vec::with_capacity(response.sessions.len());
        for raw in response.sessions {
            let normalized = normalize_session_state(raw)?;
            self.session_storage.upsert(normalized.clone()).await?;
            resources.push(normalized);
        }
        Ok((resources, response.next_page_token))
    }

    /// First page only, resuming from `page_token` if set.
    pub async fn page(&self) -> Result<Vec<SessionResource>> {
        let (resources, _) = self.fetch_page(self.page_token.clone()).await?;
        Ok(apply_limit(resources, self.limit))
    }

    /// All pages from `page_token` onward, honoring `limit` across the full stream.
    pub fn stream(self) -> Pin<Box<dyn Stream<Item = Result<SessionResource>> + Send>> {
        let limit = self.limit;
        let start_token = self.page_token.clone();
        let cursor = Arc::new(self);
        let pages = futures::stream::unfold(
            (cursor, start_token, 0usize, false),
            move |(cursor, page_token, emitted, done)| async move {
                if done {
                    return None;
                }
                match cursor.fetch_page(page_token).await {
                    Ok((resources, next)) => {
                        let remaining = limit.map(|l| l.saturating_sub(emitted));
                        let resources = if let Some(remaining) = remaining {
                            resources.into_iter().take(remaining).collect::<Vec<_>>()
                        } else {
                            resources
                        };
                        let emitted_now = emitted + resources.len();
                        let exhausted =
                            next.is_none() || limit.map(|l| emitted_now >= l).unwrap_or(false);
                        Some((Ok(resources), (cursor, next, emitted_now, exhausted)))
                    }
                    Err(e) => Some((Err(e), (cursor, None, emitted, true))),
                }
            },
        );
        Box::pin(pages.flat_map(|batch| match batch {
            Ok(resources) => futures::stream::iter(resources.into_iter().map(Ok)).boxed(),
            Err(e) => futures::stream::iter(vec![Err(e)]).boxed(),
        }))
    }
}

fn apply_limit(mut resources: Vec<SessionResource>, limit: Option<usize>) -> Vec<SessionResource> {
    if let Some(limit) = limit {
        resources.truncate(limit);
    }
    resources
}

fn normalize_session_state(mut raw: serde_json::Value) -> Result<SessionResource> {
    if let Some(state) = raw.get("state").and_then(|v| v.as_str()).map(str::to_string) {
        if let Some(obj) = raw.as_object_mut() {
            obj.insert(
                "state".into(),
                serde_json::Value::String(
                    crate::model::SessionState::normalize(&state).wire_value().to_string(),
                ),
            );
        }
    }
    Ok(serde_json::from_value(raw)?)
}

/// Options for [`Client::all`].
#[derive(Debug, Clone)]
pub struct AllOptions {
    pub concurrency: usize,
    pub stop_on_error: bool,
}

impl Default for AllOptions {
    fn default() -> Self {
        Self {
            concurrency: 3,
            stop_on_error: true,
        }
    }
}

/// Depth of a [`Client::sync`] pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncDepth {
    #[default]
    Metadata,
    Activities,
}

/// Progress events emitted during [`Client::sync`]; `current` is monotonic
/// within each phase.
#[derive(Debug, Clone)]
pub enum SyncProgress {
    FetchingList {
        current: usize,
        last_ingested_id: Option<String>,
    },
    HydratingRecords {
        current: usize,
        total: usize,
        last_ingested_id: Option<String>,
        activity_count: Option<usize>,
    },
}

/// Options for [`Client::sync`].
pub struct SyncOptions {
    pub depth: SyncDepth,
    pub incremental: bool,
    pub limit: Option<usize>,
    pub concurrency: usize,
    pub on_progress: Option<Box<dyn Fn(SyncProgress) + Send + Sync>>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            depth: SyncDepth::Metadata,
            incremental: true,
            limit: None,
            concurrency: 5,
            on_progress: None,
        }
    }
}

/// Stateless after construction: the factory for every session and the
/// owner of the HTTP client, platform adapter, and storage.
#[derive(Clone)]
pub struct Client {
    http: Arc<HttpClient>,
    platform: Arc<dyn Platform>,
    config: ClientConfig,
    session_storage: Arc<dyn SessionStore>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let platform: Arc<dyn Platform> = Arc::new(TokioPlatform);
        let session_storage: Arc<dyn SessionStore> = if config.force_memory_storage {
            Arc::new(MemorySessionStore::new())
        } else {
            Arc::new(FileSessionStore::new(platform.clone(), config.cache_dir.clone()))
        };
        let http = Arc::new(HttpClient::new(config.clone())?);
        Ok(Self {
            http,
            platform,
            config,
            session_storage,
        })
    }

    /// A derived client with `overrides` applied, sharing storage and
    /// platform with `self` but not configuration.
    pub fn with(&self, overrides: ClientConfig) -> Result<Self> {
        Ok(Self {
            http: Arc::new(HttpClient::new(overrides.clone())?),
            platform: self.platform.clone(),
            config: overrides,
            session_storage: self.session_storage.clone(),
        })
    }

    fn activity_store(&self, session_id: &str) -> Arc<dyn ActivityStore> {
        if self.config.force_memory_storage {
            Arc::new(MemoryActivityStore::new())
        } else {
            Arc::new(FileActivityStore::new(
                self.platform.clone(),
                self.config.cache_dir.join(session_id),
            ))
        }
    }

    async fn make_session_client(&self, session_id: &str) -> Result<SessionClient> {
        let activity_store = self.activity_store(session_id);
        activity_store.init().await?;
        let network = Arc::new(NetworkAdapter::new(
            self.http.clone(),
            self.platform.clone(),
            session_id,
            self.config.poll_interval,
        ));
        let activity_client = Arc::new(ActivityClient::new(
            activity_store,
            network,
            self.config.frozen_session_threshold,
        ));
        Ok(SessionClient::new(
            session_id,
            self.http.clone(),
            self.platform.clone(),
            self.session_storage.clone(),
            activity_client,
            self.config.poll_interval,
            self.config.session_info_cache_ttl,
        ))
    }

    /// Bind to an existing session id.
    pub async fn session(&self, id: &str) -> Result<SessionClient> {
        self.make_session_client(SessionResource::normalize_id(id)).await
    }

    /// Crate-internal accessor for the query engine, which needs to read the
    /// session index and open per-session activity clients itself.
    pub(crate) fn session_storage(&self) -> Arc<dyn SessionStore> {
        self.session_storage.clone()
    }

    pub(crate) async fn open_session(&self, id: &str) -> Result<SessionClient> {
        self.make_session_client(id).await
    }

    /// Create a new remote session.
    pub async fn create_session(&self, config: NewSessionConfig) -> Result<SessionClient> {
        let body = CreateSessionBody {
            prompt: config.prompt,
            source_context: SourceContextBody {
                source: format!("sources/github/{}/{}", config.owner, config.repo),
                base_branch: config.base_branch,
            },
            title: config.title,
            automation_mode: if config.auto_pr {
                "AUTO_CREATE_PR"
            } else {
                "AUTOMATION_MODE_UNSPECIFIED"
            },
            require_plan_approval: config.require_approval,
        };
        let raw: serde_json::Value = self.http.request(RequestSpec::post("sessions", body)).await?;
        let resource = normalize_session_state(raw)?;
        self.session_storage.upsert(resource.clone()).await?;
        self.make_session_client(&resource.id).await
    }

    /// Create a session with `requireApproval=false, autoPr=true` by default.
    pub async fn run(&self, mut config: NewSessionConfig) -> Result<AutomatedSession> {
        config.require_approval = false;
        config.auto_pr = true;
        let session = self.create_session(config).await?;
        Ok(AutomatedSession { session })
    }

    pub fn sessions(&self, query: SessionsQuery) -> SessionsCursor {
        SessionsCursor {
            http: self.http.clone(),
            session_storage: self.session_storage.clone(),
            page_size: query.page_size,
            page_token: query.page_token,
            filter: query.filter,
            limit: query.limit,
        }
    }

    /// Bounded-parallel `map(item) -> run(config)`, preserving result order.
    pub async fn all<T, F, Fut>(
        &self,
        items: Vec<T>,
        map: F,
        options: AllOptions,
    ) -> Result<Vec<AutomatedSession>>
    where
        T: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync,
        Fut: std::future::Future<Output = Result<NewSessionConfig>> + Send,
    {
        let concurrency = options.concurrency.max(1);
        let mut errors = Vec::new();
        let mut results = Vec::new();

        let mut stream = futures::stream::iter(items)
            .map(|item| async {
                let config = map(item).await?;
                self.run(config).await
            })
            .buffered(concurrency);

        while let Some(outcome) = stream.next().await {
            match outcome {
                Ok(session) => results.push(session),
                Err(e) => {
                    if options.stop_on_error {
                        return Err(e);
                    }
                    errors.push(e);
                }
            }
        }

        if !errors.is_empty() {
            return Err(Error::other(format!(
                "{} of {} session launches failed: {}",
                errors.len(),
                results.len() + errors.len(),
                errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ")
            )));
        }
        Ok(results)
    }

    /// Reconcile local session storage against the remote session list, and
    /// optionally hydrate each session's activities.
    pub async fn sync(&self, options: SyncOptions) -> Result<usize> {
        let index = self.session_storage.scan_index().await?;
        let hwm = index
            .iter()
            .filter_map(|e| parse_rfc3339_millis(&e.create_time))
            .max()
            .unwrap_or(0);

        let mut ingested = Vec::new();
        let mut current = 0usize;
        let mut stream = self
            .sessions(SessionsQuery {
                limit: options.limit,
                ..Default::default()
            })
            .stream();

        while let Some(resource) = stream.next().await {
            let resource = resource?;
            if options.incremental {
                let created = parse_rfc3339_millis(&resource.create_time).unwrap_or(0);
                if created <= hwm {
                    break;
                }
            }
            current += 1;
            if let Some(cb) = &options.on_progress {
                cb(SyncProgress::FetchingList {
                    current,
                    last_ingested_id: Some(resource.id.clone()),
                });
            }
            ingested.push(resource);
            if let Some(limit) = options.limit {
                if ingested.len() >= limit {
                    break;
                }
            }
        }

        if options.depth != SyncDepth::Activities {
            return Ok(ingested.len());
        }

        let total = ingested.len();
        let concurrency = options.concurrency.max(1);
        let on_progress = options.on_progress.as_ref();
        let mut hydrate_stream = futures::stream::iter(ingested.iter().cloned())
            .map(|resource| async move {
                let client = self.make_session_client(&resource.id).await?;
                let count = client.activities().hydrate().await?;
                Ok::<_, Error>((resource.id, count))
            })
            .buffered(concurrency);

        let mut current = 0usize;
        while let Some(outcome) = hydrate_stream.next().await {
            let (id, count) = outcome?;
            current += 1;
            if let Some(cb) = on_progress {
                cb(SyncProgress::HydratingRecords {
                    current,
                    total,
                    last_ingested_id: Some(id),
                    activity_count: Some(count),
                });
            }
        }
        Ok(total)
    }
}

static DEFAULT_CLIENT: OnceLock<Client> = OnceLock::new();

/// Lazily-initialised process-wide client built from environment defaults.
pub fn default_client() -> &'static Client {
    DEFAULT_CLIENT.get_or_init(|| {
        Client::new(ClientConfig::default()).expect("default client configuration is always valid")
    })
}

/// Explicit factory, equivalent to constructing a fresh [`Client`].
pub fn connect(config: ClientConfig) -> Result<Client> {
    Client::new(config)
}

#[allow(dead_code)]
fn _assert_send_sync() {
    fn assert<T: Send + Sync>() {}
    assert::<Client>();
}
