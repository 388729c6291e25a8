//! Short-lived session credential cache.
//!
//! One instance is shared by every concurrent exchange. Expiry is checked
//! lazily on `get`; there is no background refresh. The slot is a plain
//! overwrite-last-writer-wins cell and the lock is never held across an
//! await, so simultaneous cache misses may each fetch — duplicate fetches
//! just overwrite the slot with equivalent values.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use secrecy::SecretString;

use crate::config::Config;
use crate::error::{BridgeError, CoreResult};
use crate::http_client::HttpClient;
use crate::model::SessionResponse;

#[derive(Debug)]
struct CachedToken {
    token: SecretString,
    fetched_at: Instant,
}

#[derive(Debug)]
pub struct TokenCache {
    http: HttpClient,
    session_url: String,
    ttl: Duration,
    slot: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(http: HttpClient, session_url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            http,
            session_url: session_url.into(),
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub fn from_config(http: HttpClient, cfg: &Config) -> Self {
        Self::new(
            http,
            cfg.endpoints.session_url.clone(),
            Duration::from_secs(cfg.token.ttl_seconds),
        )
    }

    /// Cached credential if fresh, otherwise one fetch from the identity
    /// endpoint. Every failure shape — transport error, bad status, bad
    /// body, missing or empty token field — degrades to `Unauthorized`.
    pub async fn get(&self) -> CoreResult<SecretString> {
        if let Some(token) = self.cached() {
            return Ok(token);
        }

        tracing::debug!("session credential missing or expired, fetching");
        let resp: SessionResponse = self
            .http
            .get_json(&self.session_url, &[])
            .await
            .map_err(|_| BridgeError::Unauthorized)?;
        let token = resp
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(BridgeError::Unauthorized)?;

        let token = SecretString::from(token);
        *self.slot.lock().expect("token slot lock poisoned") = Some(CachedToken {
            token: token.clone(),
            fetched_at: Instant::now(),
        });
        Ok(token)
    }

    /// Drop the cached credential; the next `get` always refetches.
    /// Called after a downstream request proves the credential unusable.
    pub fn invalidate(&self) {
        self.slot.lock().expect("token slot lock poisoned").take();
    }

    /// True only while a non-expired credential is cached.
    pub fn has_fresh(&self) -> bool {
        self.cached().is_some()
    }

    fn cached(&self) -> Option<SecretString> {
        let slot = self.slot.lock().expect("token slot lock poisoned");
        slot.as_ref()
            .filter(|c| c.fetched_at.elapsed() < self.ttl)
            .map(|c| c.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::GET;
    use httpmock::MockServer;
    use secrecy::ExposeSecret;
    use serde_json::json;

    fn cache_for(server: &MockServer, ttl: Duration) -> TokenCache {
        TokenCache::new(
            HttpClient::new_default().unwrap(),
            format!("{}/api/auth/session", server.base_url()),
            ttl,
        )
    }

    #[tokio::test]
    async fn second_get_within_ttl_hits_cache() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/api/auth/session");
            then.status(200).json_body(json!({"accessToken": "tok-1"}));
        });

        let cache = cache_for(&server, Duration::from_secs(10));
        let first = cache.get().await.unwrap();
        let second = cache.get().await.unwrap();
        assert_eq!(first.expose_secret(), "tok-1");
        assert_eq!(second.expose_secret(), "tok-1");
        m.assert_hits(1);
        assert!(cache.has_fresh());
    }

    #[tokio::test]
    async fn expired_ttl_forces_refetch() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/api/auth/session");
            then.status(200).json_body(json!({"accessToken": "tok-1"}));
        });

        let cache = cache_for(&server, Duration::from_millis(20));
        cache.get().await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!cache.has_fresh());
        cache.get().await.unwrap();
        m.assert_hits(2);
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/api/auth/session");
            then.status(200).json_body(json!({"accessToken": "tok-1"}));
        });

        let cache = cache_for(&server, Duration::from_secs(10));
        cache.get().await.unwrap();
        cache.invalidate();
        assert!(!cache.has_fresh());
        cache.get().await.unwrap();
        m.assert_hits(2);
    }

    #[tokio::test]
    async fn invalidate_is_idempotent() {
        let server = MockServer::start();
        let cache = cache_for(&server, Duration::from_secs(10));
        cache.invalidate();
        cache.invalidate();
        assert!(!cache.has_fresh());
    }

    #[tokio::test]
    async fn missing_token_field_is_unauthorized() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(GET).path("/api/auth/session");
            then.status(200).json_body(json!({"user": {"id": "u1"}}));
        });

        let cache = cache_for(&server, Duration::from_secs(10));
        let err = cache.get().await.unwrap_err();
        assert!(matches!(err, BridgeError::Unauthorized));
        assert!(!cache.has_fresh());
    }

    #[tokio::test]
    async fn empty_token_field_is_unauthorized() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(GET).path("/api/auth/session");
            then.status(200).json_body(json!({"accessToken": ""}));
        });

        let cache = cache_for(&server, Duration::from_secs(10));
        let err = cache.get().await.unwrap_err();
        assert!(matches!(err, BridgeError::Unauthorized));
    }

    #[tokio::test]
    async fn network_failure_is_unauthorized() {
        let cache = TokenCache::new(
            HttpClient::new_default().unwrap(),
            "http://127.0.0.1:9/api/auth/session",
            Duration::from_secs(10),
        );
        let err = cache.get().await.unwrap_err();
        assert!(matches!(err, BridgeError::Unauthorized));
        assert!(!cache.has_fresh());
    }
}
