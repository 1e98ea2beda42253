//! Agent-API-specific endpoints layered over the generic [`HttpClient`].

use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestSpec};
use crate::model::Activity;
use crate::platform::Platform;
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// One page of `listActivities`.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityPage {
    #[serde(default, rename = "activities")]
    pub activities: Vec<Activity>,
    #[serde(default, rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

/// Short fixed backoff used for the transient-404-after-creation retry.
const CREATION_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Per-session wrapper around [`HttpClient`] exposing the Agent API's
/// activities sub-resource.
pub struct NetworkAdapter {
    http: Arc<HttpClient>,
    platform: Arc<dyn Platform>,
    session_id: String,
    poll_interval: Duration,
}

impl NetworkAdapter {
    pub fn new(
        http: Arc<HttpClient>,
        platform: Arc<dyn Platform>,
        session_id: impl Into<String>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            http,
            platform,
            session_id: session_id.into(),
            poll_interval,
        }
    }

    pub async fn fetch_activity(&self, id: &str) -> Result<Activity> {
        let endpoint = format!("sessions/{}/activities/{}", self.session_id, id);
        self.http.request(RequestSpec::get(endpoint)).await
    }

    pub async fn list_activities(
        &self,
        page_size: Option<u32>,
        page_token: Option<String>,
        filter: Option<String>,
    ) -> Result<ActivityPage> {
        match self
            .list_activities_once(page_size, page_token.clone(), filter.clone())
            .await
        {
            Err(Error::Api { status: 404, .. }) => {
                self.platform.sleep(CREATION_RETRY_DELAY).await;
                self.list_activities_once(page_size, page_token, filter)
                    .await
            }
            other => other,
        }
    }

    async fn list_activities_once(
        &self,
        page_size: Option<u32>,
        page_token: Option<String>,
        filter: Option<String>,
    ) -> Result<ActivityPage> {
        let endpoint = format!("sessions/{}/activities", self.session_id);
        let spec = RequestSpec::get(endpoint)
            .with_query_opt("pageSize", page_size)
            .with_query_opt("pageToken", page_token)
            .with_query_opt("filter", filter);
        self.http.request(spec).await
    }

    /// Hot, potentially-infinite source of activities: page through
    /// `listActivities` while a `nextPageToken` is present, otherwise sleep
    /// `poll_interval` and re-list from the start. Deduplication is the
    /// consumer's responsibility (see `ActivityClient::updates`).
    pub fn raw_stream(self: Arc<Self>) -> Pin<Box<dyn Stream<Item = Result<Activity>> + Send>> {
        let batches = futures::stream::unfold(
            (self, None::<String>),
            |(adapter, page_token)| async move {
                match adapter.list_activities(None, page_token, None).await {
                    Ok(page) => {
                        let next_state = if page.next_page_token.is_some() {
                            page.next_page_token
                        } else {
                            adapter.platform.sleep(adapter.poll_interval).await;
                            None
                        };
                        Some((Ok(page.activities), (adapter, next_state)))
                    }
                    Err(e) => Some((Err(e), (adapter, None))),
                }
            },
        );

        Box::pin(batches.flat_map(|batch| match batch {
            Ok(activities) => futures::stream::iter(activities.into_iter().map(Ok)).boxed(),
            Err(e) => futures::stream::iter(vec![Err(e)]).boxed(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::platform::TokioPlatform;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(base_url: String, session_id: &str) -> NetworkAdapter {
        let config = ClientConfig::builder()
            .api_key("key")
            .base_url(base_url)
            .build();
        let http = Arc::new(HttpClient::new(config).unwrap());
        NetworkAdapter::new(
            http,
            Arc::new(TokioPlatform),
            session_id,
            Duration::from_millis(10),
        )
    }

    #[tokio::test]
    async fn fetch_activity_hits_the_single_activity_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sessions/s1/activities/a1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "a1",
                "sessionId": "s1",
                "createTime": "2026-01-01T00:00:00Z",
                "originator": "agent",
                "type": "agentMessaged",
                "artifacts": []
            })))
            .mount(&server)
            .await;

        let adapter = adapter(server.uri(), "s1");
        let activity = adapter.fetch_activity("a1").await.unwrap();
        assert_eq!(activity.id, "a1");
    }

    #[tokio::test]
    async fn transient_404_is_retried_exactly_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sessions/s1/activities"))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sessions/s1/activities"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"activities": []})))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = adapter(server.uri(), "s1");
        let page = adapter.list_activities(None, None, None).await.unwrap();
        assert!(page.activities.is_empty());
    }

    #[tokio::test]
    async fn raw_stream_follows_next_page_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(wiremock::matchers::query_param("pageToken", "next"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "activities": [{
                    "id": "a2", "sessionId": "s1", "createTime": "2026-01-01T00:00:01Z",
                    "originator": "agent", "type": "agentMessaged", "artifacts": []
                }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sessions/s1/activities"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "activities": [{
                    "id": "a1", "sessionId": "s1", "createTime": "2026-01-01T00:00:00Z",
                    "originator": "agent", "type": "agentMessaged", "artifacts": []
                }],
                "nextPageToken": "next"
            })))
            .mount(&server)
            .await;

        let adapter = Arc::new(adapter(server.uri(), "s1"));
        let mut stream = adapter.raw_stream();
        let first = stream.next().await.unwrap().unwrap();
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(first.id, "a1");
        assert_eq!(second.id, "a2");
    }
}
