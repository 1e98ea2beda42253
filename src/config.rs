//! Configuration resolution for the Agent API client and fleet handlers.
//!
//! Mirrors the priority-based env-var resolution pattern used throughout this
//! codebase: an explicit value always wins, an environment variable is the
//! fallback, and a hard-coded default closes out the chain.

use std::env;
use std::time::Duration;

/// Default Agent API base URL (overridden by `JULES_BASE_URL` or
/// [`ClientConfigBuilder::base_url`]).
pub const DEFAULT_BASE_URL: &str = "https://jules.googleapis.com/v1alpha";

/// Default on-disk cache root, relative to the process working directory.
pub const DEFAULT_CACHE_DIR: &str = ".jules/cache";

/// Retry behavior for rate-limited / transiently-failing HTTP calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitRetryConfig {
    pub max_retry_time: Duration,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RateLimitRetryConfig {
    fn default() -> Self {
        Self {
            max_retry_time: Duration::from_millis(300_000),
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(30_000),
        }
    }
}

/// Top-level client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub cache_dir: std::path::PathBuf,
    pub request_timeout: Duration,
    pub max_concurrent_requests: usize,
    pub retry: RateLimitRetryConfig,
    /// Activities older than this are considered frozen; `hydrate()` skips
    /// the network call entirely (see the frozen-session optimisation).
    pub frozen_session_threshold: Duration,
    /// Polling interval for `waitFor`/`result` and the raw activity stream.
    pub poll_interval: Duration,
    /// TTL for the session-info read-through cache.
    pub session_info_cache_ttl: Duration,
    pub force_memory_storage: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: env::var("JULES_API_KEY").ok(),
            base_url: get_base_url(None),
            cache_dir: get_cache_dir(None),
            request_timeout: Duration::from_secs(30),
            max_concurrent_requests: 50,
            retry: RateLimitRetryConfig::default(),
            frozen_session_threshold: Duration::from_secs(30 * 24 * 3600),
            poll_interval: Duration::from_secs(3),
            session_info_cache_ttl: Duration::from_secs(5),
            force_memory_storage: env::var("JULES_FORCE_MEMORY_STORAGE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for [`ClientConfig`]; every field falls back to [`ClientConfig::default`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    cache_dir: Option<std::path::PathBuf>,
    request_timeout: Option<Duration>,
    max_concurrent_requests: Option<usize>,
    retry: Option<RateLimitRetryConfig>,
    force_memory_storage: Option<bool>,
}

impl ClientConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn cache_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn max_concurrent_requests(mut self, n: usize) -> Self {
        self.max_concurrent_requests = Some(n);
        self
    }

    pub fn retry(mut self, retry: RateLimitRetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn force_memory_storage(mut self, force: bool) -> Self {
        self.force_memory_storage = Some(force);
        self
    }

    pub fn build(self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            api_key: self.api_key.or(defaults.api_key),
            base_url: self.base_url.unwrap_or(defaults.base_url),
            cache_dir: self.cache_dir.unwrap_or(defaults.cache_dir),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            max_concurrent_requests: self
                .max_concurrent_requests
                .unwrap_or(defaults.max_concurrent_requests),
            retry: self.retry.unwrap_or(defaults.retry),
            force_memory_storage: self
                .force_memory_storage
                .unwrap_or(defaults.force_memory_storage),
            ..defaults
        }
    }
}

/// Resolve the Agent API base URL: `JULES_BASE_URL` env var, then `fallback`,
/// then [`DEFAULT_BASE_URL`].
pub fn get_base_url(fallback: Option<&str>) -> String {
    if let Ok(url) = env::var("JULES_BASE_URL") {
        return url;
    }
    fallback.unwrap_or(DEFAULT_BASE_URL).to_string()
}

/// Resolve the on-disk cache root: `JULES_CACHE_DIR` env var, then `fallback`,
/// then [`DEFAULT_CACHE_DIR`].
pub fn get_cache_dir(fallback: Option<&std::path::Path>) -> std::path::PathBuf {
    if let Ok(dir) = env::var("JULES_CACHE_DIR") {
        return std::path::PathBuf::from(dir);
    }
    fallback
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| std::path::PathBuf::from(DEFAULT_CACHE_DIR))
}

/// Fleet-side repository coordinates, resolved from `GITHUB_REPOSITORY`
/// (`owner/repo` shape) or explicit overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoCoordinates {
    pub owner: String,
    pub repo: String,
}

impl RepoCoordinates {
    pub fn from_env() -> Option<Self> {
        env::var("GITHUB_REPOSITORY")
            .ok()
            .and_then(|s| Self::parse(&s))
    }

    pub fn parse(owner_repo: &str) -> Option<Self> {
        let (owner, repo) = owner_repo.split_once('/')?;
        if owner.is_empty() || repo.is_empty() {
            return None;
        }
        Some(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }
}

/// Base branch for fleet operations: `FLEET_BASE_BRANCH` env var, then `fallback`, then `"main"`.
pub fn get_base_branch(fallback: Option<&str>) -> String {
    if let Ok(branch) = env::var("FLEET_BASE_BRANCH") {
        return branch;
    }
    fallback.unwrap_or("main").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn repo_coordinates_parse() {
        let coords = RepoCoordinates::parse("owner/repo").unwrap();
        assert_eq!(coords.owner, "owner");
        assert_eq!(coords.repo, "repo");
        assert!(RepoCoordinates::parse("no-slash").is_none());
        assert!(RepoCoordinates::parse("/repo").is_none());
    }

    #[test]
    fn base_url_falls_back_through_chain() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe {
            env::remove_var("JULES_BASE_URL");
        }
        assert_eq!(get_base_url(Some("https://custom/v1")), "https://custom/v1");
        assert_eq!(get_base_url(None), DEFAULT_BASE_URL);
    }

    #[test]
    fn builder_overrides_individual_fields() {
        let _guard = ENV_LOCK.lock().unwrap();
        let config = ClientConfig::builder()
            .api_key("key-123")
            .base_url("https://example.test")
            .max_concurrent_requests(10)
            .build();
        assert_eq!(config.api_key.as_deref(), Some("key-123"));
        assert_eq!(config.base_url, "https://example.test");
        assert_eq!(config.max_concurrent_requests, 10);
    }

    #[test]
    fn base_branch_defaults_to_main() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe {
            env::remove_var("FLEET_BASE_BRANCH");
        }
        assert_eq!(get_base_branch(None), "main");
        assert_eq!(get_base_branch(Some("develop")), "develop");
    }
}
