//! Access token acquisition
//!
//! Tokens come from the OAuth client-credentials grant. Token failures are
//! the one place where the transport fails soft: the error is logged and the
//! placeholder [`SENTINEL_ACCESS_TOKEN`] is used instead, so the following
//! request is sent anyway and the service's 401 becomes the visible error.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::AuthConfig;

/// Placeholder bearer token used when acquisition fails
pub const SENTINEL_ACCESS_TOKEN: &str = "dummy-access-token";

/// Tokens are treated as expired this long before the service says so
const EXPIRY_SKEW: Duration = Duration::from_secs(30);

/// When a cached token may be reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenPolicy {
    /// Reuse the token until shortly before `expires_in` runs out
    #[default]
    Cached,
    /// Fetch a new token for every request
    Refetch,
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    audience: &'a str,
    grant_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    #[allow(dead_code)]
    token_type: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    /// `None` when the service gave no lifetime
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |expires_at| now < expires_at)
    }
}

/// Fetches and caches bearer tokens
pub struct TokenProvider {
    client: reqwest::Client,
    auth: AuthConfig,
    policy: TokenPolicy,
    cached: RwLock<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(client: reqwest::Client, auth: AuthConfig, policy: TokenPolicy) -> Self {
        Self {
            client,
            auth,
            policy,
            cached: RwLock::new(None),
        }
    }

    pub fn policy(&self) -> TokenPolicy {
        self.policy
    }

    /// Bearer token for the next request
    ///
    /// Never fails; see the module docs for the fallback.
    pub async fn access_token(&self) -> String {
        if self.policy == TokenPolicy::Cached {
            if let Some(cached) = self.cached.read().await.as_ref() {
                if cached.is_fresh(Instant::now()) {
                    return cached.token.clone();
                }
            }
        }

        match self.fetch_token().await {
            Ok(fresh) => {
                let token = fresh.token.clone();
                if self.policy == TokenPolicy::Cached {
                    *self.cached.write().await = Some(fresh);
                }
                token
            }
            Err(e) => {
                tracing::error!("Failed to fetch access token: {}", e);
                SENTINEL_ACCESS_TOKEN.to_string()
            }
        }
    }

    /// Drop the cached token, e.g. after the service rejected it
    pub async fn invalidate(&self) {
        if self.cached.write().await.take().is_some() {
            tracing::debug!("Discarded cached access token");
        }
    }

    async fn fetch_token(&self) -> Result<CachedToken, String> {
        let request = TokenRequest {
            client_id: &self.auth.client_id,
            client_secret: &self.auth.client_secret,
            audience: &self.auth.audience,
            grant_type: "client_credentials",
        };

        let response = self
            .client
            .post(self.auth.token_endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("Auth failed: {}", status));
        }

        let body: TokenResponse = response.json().await.map_err(|e| e.to_string())?;
        if body.access_token.is_empty() {
            return Err("Auth response carried an empty access token".to_string());
        }

        let expires_at = body
            .expires_in
            .map(|secs| Instant::now() + Duration::from_secs(secs).saturating_sub(EXPIRY_SKEW));

        tracing::debug!(
            "Fetched access token (expires in {:?}s)",
            body.expires_in
        );
        Ok(CachedToken {
            token: body.access_token,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_freshness() {
        let now = Instant::now();
        let unbounded = CachedToken {
            token: "t".to_string(),
            expires_at: None,
        };
        assert!(unbounded.is_fresh(now));

        let expired = CachedToken {
            token: "t".to_string(),
            expires_at: Some(now),
        };
        assert!(!expired.is_fresh(now));

        let valid = CachedToken {
            token: "t".to_string(),
            expires_at: Some(now + Duration::from_secs(60)),
        };
        assert!(valid.is_fresh(now));
    }

    #[test]
    fn test_token_request_wire_shape() {
        let request = TokenRequest {
            client_id: "id",
            client_secret: "secret",
            audience: "aud",
            grant_type: "client_credentials",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["client_id"], "id");
        assert_eq!(json["grant_type"], "client_credentials");
    }

    #[tokio::test]
    async fn test_unreachable_auth_falls_back_to_sentinel() {
        let auth = AuthConfig {
            // Port 9 (discard) on loopback refuses connections
            domain: "http://127.0.0.1:9".to_string(),
            ..AuthConfig::default()
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let provider = TokenProvider::new(client, auth, TokenPolicy::Cached);

        assert_eq!(provider.access_token().await, SENTINEL_ACCESS_TOKEN);
        // The sentinel is never cached
        assert!(provider.cached.read().await.is_none());
    }
}
