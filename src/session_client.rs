//! Per-session control surface: info caching, plan approval, messaging,
//! polling, and the activity stream.

use crate::activity_client::{originator_is_user, ActivityClient};
use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestSpec};
use crate::model::{now_millis, Activity, ActivityType, SessionResource, SessionSnapshot, SessionState};
use crate::platform::Platform;
use crate::storage::SessionStore;
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Options for [`SessionClient::stream`].
#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    pub exclude_user: bool,
}

/// Per-session client. Exclusively owns its [`ActivityClient`].
pub struct SessionClient {
    session_id: String,
    http: Arc<HttpClient>,
    platform: Arc<dyn Platform>,
    session_storage: Arc<dyn SessionStore>,
    activity_client: Arc<ActivityClient>,
    poll_interval: Duration,
    session_info_cache_ttl: Duration,
}

#[derive(Serialize)]
struct SendMessageBody<'a> {
    prompt: &'a str,
}

impl SessionClient {
    pub fn new(
        session_id: impl Into<String>,
        http: Arc<HttpClient>,
        platform: Arc<dyn Platform>,
        session_storage: Arc<dyn SessionStore>,
        activity_client: Arc<ActivityClient>,
        poll_interval: Duration,
        session_info_cache_ttl: Duration,
    ) -> Self {
        Self {
            session_id: SessionResource::normalize_id(&session_id.into()).to_string(),
            http,
            platform,
            session_storage,
            activity_client,
            poll_interval,
            session_info_cache_ttl,
        }
    }

    pub fn id(&self) -> &str {
        &self.session_id
    }

    pub fn activities(&self) -> &Arc<ActivityClient> {
        &self.activity_client
    }

    /// Read-through session info with a short cache TTL.
    pub async fn info(&self) -> Result<SessionResource> {
        if let Some(cached) = self.session_storage.get(&self.session_id).await? {
            let age = now_millis().saturating_sub(cached.last_synced_at);
            if (age as u128) < self.session_info_cache_ttl.as_millis() {
                return Ok(cached.resource);
            }
        }

        match self.fetch_resource().await {
            Ok(resource) => {
                self.session_storage.upsert(resource.clone()).await?;
                Ok(resource)
            }
            Err(Error::Api { status: 404, .. }) => {
                self.session_storage.delete(&self.session_id).await?;
                Err(Error::Api {
                    url: crate::error::sanitize_url(&self.session_id),
                    status: 404,
                    body: "session not found".into(),
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_resource(&self) -> Result<SessionResource> {
        let endpoint = format!("sessions/{}", self.session_id);
        let raw: serde_json::Value = self.http.request(RequestSpec::get(endpoint)).await?;
        parse_session_resource(raw)
    }

    /// Approve the current plan. Fails with `invalid-state` unless the
    /// session is currently `awaitingPlanApproval`.
    pub async fn approve(&self) -> Result<()> {
        let current = self.info().await?;
        if current.state != SessionState::AwaitingPlanApproval {
            return Err(Error::invalid_state("awaitingPlanApproval", current.state.state_label()));
        }
        let endpoint = format!("sessions/{}:approvePlan", self.session_id);
        let _: serde_json::Value = self
            .http
            .request(RequestSpec::post(endpoint, serde_json::json!({})))
            .await?;
        Ok(())
    }

    /// Fire-and-forget message send.
    pub async fn send(&self, prompt: &str) -> Result<()> {
        let endpoint = format!("sessions/{}:sendMessage", self.session_id);
        let _: serde_json::Value = self
            .http
            .request(RequestSpec::post(endpoint, SendMessageBody { prompt }))
            .await?;
        Ok(())
    }

    /// Send `prompt` and wait for the first agent reply that postdates it.
    pub async fn ask(&self, prompt: &str) -> Result<Activity> {
        let t0 = now_millis();
        self.send(prompt).await?;

        let mut stream = self.activity_client.clone().stream();
        while let Some(activity) = stream.next().await {
            let activity = activity?;
            if originator_is_user(&activity) {
                continue;
            }
            let created = crate::model::parse_rfc3339_millis(&activity.create_time).unwrap_or(0);
            if created <= t0 {
                continue;
            }
            if activity.activity_type == ActivityType::AgentMessaged {
                return Ok(activity);
            }
        }
        Err(Error::SessionEndedBeforeReply)
    }

    /// Poll until `target` is reached or the session terminates.
    pub async fn wait_for(&self, target: SessionState) -> Result<SessionResource> {
        loop {
            let info = self.info().await?;
            if info.state == target || info.state.is_terminal() {
                return Ok(info);
            }
            self.platform.sleep(self.poll_interval).await;
        }
    }

    /// Poll until terminal, persisting the final resource write-through.
    pub async fn result(&self, timeout: Option<Duration>) -> Result<SessionResource> {
        let deadline = timeout.map(|t| std::time::Instant::now() + t);
        loop {
            let info = self.info().await?;
            if info.state.is_terminal() {
                self.session_storage.upsert(info.clone()).await?;
                if info.state == SessionState::Failed {
                    return Err(Error::AutomatedSessionFailed {
                        session_id: self.session_id.clone(),
                        reason: info.title.clone(),
                    });
                }
                return Ok(info);
            }
            if let Some(deadline) = deadline {
                if std::time::Instant::now() >= deadline {
                    return Err(Error::Timeout);
                }
            }
            self.platform.sleep(self.poll_interval).await;
        }
    }

    /// Activity stream, optionally filtered by originator.
    pub fn stream(
        &self,
        options: StreamOptions,
    ) -> Pin<Box<dyn Stream<Item = Result<Activity>> + Send>> {
        let upstream = self.activity_client.clone().stream();
        if !options.exclude_user {
            return upstream;
        }
        Box::pin(upstream.filter(|item| {
            let keep = !matches!(item, Ok(a) if originator_is_user(a));
            async move { keep }
        }))
    }

    /// Fetch `info()` and drain `history()` in parallel, then derive the
    /// composed snapshot.
    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (info, activities) = tokio::try_join!(self.info(), self.activity_client.history())?;
        Ok(SessionSnapshot::build(info, activities))
    }
}

fn parse_session_resource(mut raw: serde_json::Value) -> Result<SessionResource> {
    if let Some(state) = raw.get("state").and_then(|v| v.as_str()).map(str::to_string) {
        if let Some(obj) = raw.as_object_mut() {
            obj.insert(
                "state".into(),
                serde_json::Value::String(SessionState::normalize(&state).wire_value().to_string()),
            );
        }
    }
    Ok(serde_json::from_value(raw)?)
}

impl SessionState {
    /// Inverse of [`SessionState::normalize`]: the camelCase wire value this
    /// type deserializes from, used when re-encoding after normalisation.
    pub fn wire_value(&self) -> &'static str {
        match self {
            SessionState::Unspecified => "unspecified",
            SessionState::Queued => "queued",
            SessionState::Planning => "planning",
            SessionState::InProgress => "inProgress",
            SessionState::AwaitingPlanApproval => "awaitingPlanApproval",
            SessionState::AwaitingUserFeedback => "awaitingUserFeedback",
            SessionState::Paused => "paused",
            SessionState::Completed => "completed",
            SessionState::Failed => "failed",
        }
    }

    pub fn state_label(&self) -> String {
        self.wire_value().to_string()
    }
}
