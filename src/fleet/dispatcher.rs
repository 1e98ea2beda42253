//! Abstraction over the SDK so `analyze` and `dispatch` can launch
//! worker/analyzer sessions without hard-depending on the concrete [`Client`].

use super::result::FleetResult;
use crate::client::{Client, NewSessionConfig};
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub prompt: String,
    pub owner: String,
    pub repo: String,
    pub base_branch: String,
    pub require_approval: bool,
    pub auto_pr: bool,
}

#[derive(Debug, Clone)]
pub struct DispatchedSession {
    pub session_id: String,
    pub url: String,
}

#[async_trait]
pub trait SessionDispatcher: Send + Sync {
    async fn dispatch(&self, request: DispatchRequest) -> FleetResult<DispatchedSession>;
}

/// Adapter over the top-level [`Client`].
pub struct ClientSessionDispatcher {
    client: Client,
}

impl ClientSessionDispatcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SessionDispatcher for ClientSessionDispatcher {
    async fn dispatch(&self, request: DispatchRequest) -> FleetResult<DispatchedSession> {
        let config = NewSessionConfig::new(request.prompt, request.owner, request.repo)
            .base_branch(request.base_branch)
            .require_approval(request.require_approval)
            .auto_pr(request.auto_pr);
        let session = self.client.run(config).await?;
        Ok(DispatchedSession {
            session_id: session.id().to_string(),
            url: format!("sessions/{}", session.id()),
        })
    }
}

/// In-memory fake used by handler tests: records every dispatch request and
/// hands back a deterministic, incrementing session id.
#[derive(Default)]
pub struct MockSessionDispatcher {
    next_id: Mutex<u64>,
    pub requests: Mutex<Vec<DispatchRequest>>,
}

impl MockSessionDispatcher {
    pub fn new() -> Self {
        Self {
            next_id: Mutex::new(1),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SessionDispatcher for MockSessionDispatcher {
    async fn dispatch(&self, request: DispatchRequest) -> FleetResult<DispatchedSession> {
        let mut id = self.next_id.lock().unwrap();
        let session_id = format!("mock-session-{id}");
        *id += 1;
        self.requests.lock().unwrap().push(request);
        Ok(DispatchedSession {
            url: format!("sessions/{session_id}"),
            session_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_dispatcher_records_requests_and_returns_distinct_ids() {
        let dispatcher = MockSessionDispatcher::new();
        let a = dispatcher
            .dispatch(DispatchRequest {
                prompt: "do x".into(),
                owner: "acme".into(),
                repo: "widgets".into(),
                base_branch: "main".into(),
                require_approval: false,
                auto_pr: true,
            })
            .await
            .unwrap();
        let b = dispatcher
            .dispatch(DispatchRequest {
                prompt: "do y".into(),
                owner: "acme".into(),
                repo: "widgets".into(),
                base_branch: "main".into(),
                require_approval: false,
                auto_pr: true,
            })
            .await
            .unwrap();
        assert_ne!(a.session_id, b.session_id);
        assert_eq!(dispatcher.requests.lock().unwrap().len(), 2);
    }
}
