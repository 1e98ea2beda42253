//! Platform adapter: abstracts the host so the activity/session engine can
//! run unmodified against a real filesystem+clock or a fully in-memory host.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;

/// Host capability surface required by the storage and HTTP layers.
///
/// Implementations must be `Send + Sync` so a single adapter instance can be
/// shared across concurrent sessions via `Arc<dyn Platform>`.
#[async_trait]
pub trait Platform: Send + Sync {
    async fn sleep(&self, duration: Duration);

    async fn read_file(&self, path: &std::path::Path) -> std::io::Result<Vec<u8>>;
    async fn write_file(&self, path: &std::path::Path, data: &[u8]) -> std::io::Result<()>;
    async fn delete_file(&self, path: &std::path::Path) -> std::io::Result<()>;
    async fn file_exists(&self, path: &std::path::Path) -> bool;
    async fn create_dir_all(&self, path: &std::path::Path) -> std::io::Result<()>;

    fn random_uuid(&self) -> String;

    fn get_env(&self, key: &str) -> Option<String>;

    /// HMAC-SHA256 over `text` keyed by `secret`, base64url (no padding) encoded.
    fn sign(&self, text: &str, secret: &str) -> String;

    /// Constant-time verification of a signature produced by [`Platform::sign`].
    fn verify(&self, text: &str, signature: &str, secret: &str) -> bool;

    fn base64url_encode(&self, data: &[u8]) -> String;
    fn base64url_decode(&self, data: &str) -> std::io::Result<Vec<u8>>;
}

/// Default host adapter: real filesystem, real clock, real crypto.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPlatform;

type HmacSha256 = Hmac<Sha256>;

#[async_trait]
impl Platform for TokioPlatform {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn read_file(&self, path: &std::path::Path) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    async fn write_file(&self, path: &std::path::Path, data: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, data).await
    }

    async fn delete_file(&self, path: &std::path::Path) -> std::io::Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn file_exists(&self, path: &std::path::Path) -> bool {
        tokio::fs::metadata(path).await.is_ok()
    }

    async fn create_dir_all(&self, path: &std::path::Path) -> std::io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }

    fn random_uuid(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn get_env(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn sign(&self, text: &str, secret: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
        mac.update(text.as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    fn verify(&self, text: &str, signature: &str, secret: &str) -> bool {
        let Ok(expected) = URL_SAFE_NO_PAD.decode(signature) else {
            return false;
        };
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
        mac.update(text.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }

    fn base64url_encode(&self, data: &[u8]) -> String {
        URL_SAFE_NO_PAD.encode(data)
    }

    fn base64url_decode(&self, data: &str) -> std::io::Result<Vec<u8>> {
        URL_SAFE_NO_PAD
            .decode(data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
