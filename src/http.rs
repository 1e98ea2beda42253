//! Authenticated JSON transport for the Agent API: timeout, capped
//! exponential backoff with full jitter, and bounded in-flight concurrency.

use crate::config::ClientConfig;
use crate::error::{Error, Result, sanitize_url};
use crate::retry::RetryState;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// HTTP method for [`HttpClient::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One outbound request, built up with the `with_*` methods.
#[derive(Debug, Clone)]
pub struct RequestSpec<B: Serialize> {
    pub method: Method,
    pub endpoint: String,
    pub query: Vec<(String, String)>,
    pub body: Option<B>,
    pub headers: HashMap<String, String>,
}

impl RequestSpec<()> {
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            endpoint: endpoint.into(),
            query: Vec::new(),
            body: None,
            headers: HashMap::new(),
        }
    }
}

impl<B: Serialize> RequestSpec<B> {
    pub fn post(endpoint: impl Into<String>, body: B) -> Self {
        Self {
            method: Method::Post,
            endpoint: endpoint.into(),
            query: Vec::new(),
            body: Some(body),
            headers: HashMap::new(),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl std::fmt::Display) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn with_query_opt(
        mut self,
        key: impl Into<String>,
        value: Option<impl std::fmt::Display>,
    ) -> Self {
        if let Some(v) = value {
            self.query.push((key.into(), v.to_string()));
        }
        self
    }
}

/// Rate-limited, retrying JSON transport.
///
/// One `HttpClient` is shared (via `Arc`) across every session and network
/// adapter created by a [`crate::client::Client`]; the semaphore it holds
/// bounds concurrency process-wide, not per-session.
pub struct HttpClient {
    http: reqwest::Client,
    config: ClientConfig,
    semaphore: Arc<Semaphore>,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| Error::Network {
                url: sanitize_url(&config.base_url),
                source,
            })?;
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_requests.max(1)));
        Ok(Self {
            http,
            config,
            semaphore,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Issue `spec` against the Agent API, retrying on 429/5xx with full
    /// jitter until `maxRetryTimeMs` elapses, and deserializing the JSON
    /// response body into `T` (an empty body deserializes as `{}`).
    pub async fn request<B: Serialize, T: DeserializeOwned>(
        &self,
        spec: RequestSpec<B>,
    ) -> Result<T> {
        let api_key = self
            .config
            .api_key
            .clone()
            .ok_or(Error::MissingCredentials)?;

        let url = self.build_url(&spec.endpoint, &spec.query);
        let safe_url = sanitize_url(&url);
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("semaphore is never closed");

        let mut retry = RetryState::new(self.config.retry);

        loop {
            let mut builder = match spec.method {
                Method::Get => self.http.get(&url),
                Method::Post => self.http.post(&url),
            };
            builder = builder.header("X-Goog-Api-Key", &api_key);
            builder = builder.header("Content-Type", "application/json");
            for (k, v) in &spec.headers {
                builder = builder.header(k, v);
            }
            if let Some(body) = &spec.body {
                builder = builder.json(body);
            } else if spec.method == Method::Post {
                builder = builder.json(&serde_json::json!({}));
            }

            let response = builder.send().await;

            let response = match response {
                Ok(r) => r,
                Err(source) => {
                    return Err(Error::Network {
                        url: safe_url,
                        source,
                    });
                }
            };

            let status = response.status().as_u16();

            if (200..300).contains(&status) {
                let bytes = response.bytes().await.map_err(|source| Error::Network {
                    url: safe_url.clone(),
                    source,
                })?;
                if bytes.is_empty() {
                    return Ok(serde_json::from_value(serde_json::json!({}))?);
                }
                return Ok(serde_json::from_slice(&bytes)?);
            }

            if status == 401 || status == 403 {
                return Err(Error::Authentication { url: safe_url });
            }

            if status == 429 || matches!(status, 500 | 502 | 503 | 504) {
                match retry.next_delay() {
                    Some(delay) => {
                        debug!(
                            endpoint = %spec.endpoint,
                            attempt = retry.attempt(),
                            delay_ms = delay.as_millis() as u64,
                            status,
                            "retrying Agent API request"
                        );
                        self.config_sleep(delay).await;
                        continue;
                    }
                    None => {
                        warn!(endpoint = %spec.endpoint, attempts = retry.attempt(), "retries exhausted");
                        return Err(Error::RateLimitExhausted {
                            url: safe_url,
                            attempts: retry.attempt(),
                        });
                    }
                }
            }

            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(Error::Api {
                url: safe_url,
                status,
                body,
            });
        }
    }

    async fn config_sleep(&self, delay: std::time::Duration) {
        tokio::time::sleep(delay).await;
    }

    fn build_url(&self, endpoint: &str, query: &[(String, String)]) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let endpoint = endpoint.trim_start_matches('/');
        let mut url = format!("{base}/{endpoint}");
        if !query.is_empty() {
            let qs: Vec<String> = query
                .iter()
                .map(|(k, v)| format!("{}={}", urlencode(k), urlencode(v)))
                .collect();
            url.push('?');
            url.push_str(&qs.join("&"));
        }
        url
    }
}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> ClientConfig {
        ClientConfig::builder()
            .api_key("test-key")
            .base_url(base_url)
            .retry(crate::config::RateLimitRetryConfig {
                max_retry_time: std::time::Duration::from_millis(5000),
                base_delay: std::time::Duration::from_millis(50),
                max_delay: std::time::Duration::from_millis(200),
            })
            .build()
    }

    #[tokio::test]
    async fn retries_503_then_succeeds() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new(test_config(server.uri())).unwrap();
        let result: serde_json::Value = client.request(RequestSpec::get("ping")).await.unwrap();
        assert_eq!(result, json!({"success": true}));
    }

    #[tokio::test]
    async fn missing_api_key_fails_fast_without_a_request() {
        let server = MockServer::start().await;
        let mut config = test_config(server.uri());
        config.api_key = None;
        let client = HttpClient::new(config).unwrap();
        let result: Result<serde_json::Value> = client.request(RequestSpec::get("ping")).await;
        assert!(matches!(result, Err(Error::MissingCredentials)));
    }

    #[tokio::test]
    async fn authentication_error_on_401() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/secure"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = HttpClient::new(test_config(server.uri())).unwrap();
        let result: Result<serde_json::Value> =
            client.request(RequestSpec::get("secure")).await;
        assert!(matches!(result, Err(Error::Authentication { .. })));
    }

    #[tokio::test]
    async fn exhausts_retries_and_surfaces_rate_limit_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/always-busy"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let mut config = test_config(server.uri());
        config.retry.max_retry_time = std::time::Duration::from_millis(120);
        config.retry.base_delay = std::time::Duration::from_millis(30);
        let client = HttpClient::new(config).unwrap();
        let result: Result<serde_json::Value> =
            client.request(RequestSpec::get("always-busy")).await;
        assert!(matches!(result, Err(Error::RateLimitExhausted { .. })));
    }

    #[tokio::test]
    async fn sanitizes_url_in_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(418).set_body_string("teapot"))
            .mount(&server)
            .await;

        let client = HttpClient::new(test_config(server.uri())).unwrap();
        let result: Result<serde_json::Value> = client
            .request(RequestSpec::get("broken").with_query("secret", "shh"))
            .await;
        let err = result.unwrap_err();
        let msg = err.to_string();
        assert!(!msg.contains("secret"));
        assert!(!msg.contains('?'));
    }

    #[tokio::test]
    async fn concurrency_is_bounded_by_semaphore() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})).set_delay(
                std::time::Duration::from_millis(50),
            ))
            .mount(&server)
            .await;

        let mut config = test_config(server.uri());
        config.max_concurrent_requests = 2;
        let client = Arc::new(HttpClient::new(config).unwrap());

        let start = std::time::Instant::now();
        let mut handles = Vec::new();
        for _ in 0..4 {
            let client = client.clone();
            handles.push(tokio::spawn(async move {
                let _: serde_json::Value = client.request(RequestSpec::get("slow")).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        // With concurrency capped at 2 and 4 requests of 50ms each, this must
        // take at least two serialized batches.
        assert!(start.elapsed() >= std::time::Duration::from_millis(90));
    }
}
