//! HTTP implementation of [`GraphStore`] against the Mew sync API
//!
//! Every request carries `Authorization: Bearer <token>` and the configured
//! timeout. Failures are logged together with the request payload and then
//! returned as [`TransportError`].

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::auth::{TokenPolicy, TokenProvider};
use super::{GraphStore, TransportError};
use crate::config::MewConfig;
use crate::models::{DataEnvelope, LayerData, SyncSnapshot, Transaction};

/// Mew sync API client
pub struct HttpGraphStore {
    client: reqwest::Client,
    api_base_url: String,
    tokens: TokenProvider,
}

impl HttpGraphStore {
    /// Client with cached tokens
    pub fn new(config: &MewConfig) -> Result<Self, TransportError> {
        Self::with_token_policy(config, TokenPolicy::Cached)
    }

    pub fn with_token_policy(
        config: &MewConfig,
        policy: TokenPolicy,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TransportError::network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            tokens: TokenProvider::new(client.clone(), config.auth.clone(), policy),
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn tokens(&self) -> &TokenProvider {
        &self.tokens
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path)
    }

    /// Send with a bearer token; a non-2xx answer becomes an error carrying
    /// the status and response text
    async fn send(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<reqwest::Response, TransportError> {
        let token = self.tokens.access_token().await;
        let response = request.bearer_auth(token).send().await.map_err(|e| {
            let err = TransportError::from(e);
            tracing::error!("{} failed: {}", what, err);
            err
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
        }
        let body = response.text().await.unwrap_or_default();
        let detail = if body.is_empty() {
            status.canonical_reason().unwrap_or("").to_string()
        } else {
            body
        };
        let err = TransportError::http_status(status.as_u16(), detail);
        tracing::error!("{} failed: {}", what, err);
        Err(err)
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
        what: &str,
    ) -> Result<T, TransportError> {
        let text = response.text().await.map_err(TransportError::from)?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!("{} returned an undecodable body: {}", what, e);
            TransportError::decode(format!("{}: {}", what, e))
        })
    }
}

#[async_trait]
impl GraphStore for HttpGraphStore {
    async fn submit_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<serde_json::Value, TransportError> {
        tracing::debug!(
            "Submitting transaction {} ({})",
            transaction.transaction_id,
            transaction.operation_names().join(", ")
        );

        let request = self.client.post(self.endpoint("sync")).json(transaction);
        let response = match self.send(request, "Sync transaction").await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    "Request payload was: {}",
                    serde_json::to_string(transaction).unwrap_or_default()
                );
                return Err(e);
            }
        };

        // The body is not schema-checked; non-JSON answers are kept as text
        let text = response.text().await.map_err(TransportError::from)?;
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
    }

    async fn fetch_sync_snapshot(&self) -> Result<SyncSnapshot, TransportError> {
        let request = self.client.get(self.endpoint("sync"));
        let response = self.send(request, "Sync snapshot").await?;
        let envelope: DataEnvelope<SyncSnapshot> = Self::decode(response, "Sync snapshot").await?;
        Ok(envelope.data)
    }

    async fn fetch_layer(&self, object_ids: &[String]) -> Result<LayerData, TransportError> {
        tracing::debug!("Fetching layer for {:?}", object_ids);

        let request = self
            .client
            .post(self.endpoint("layer"))
            .json(&json!({ "objectIds": object_ids }));
        let response = self.send(request, "Layer query").await?;
        let envelope: DataEnvelope<LayerData> = Self::decode(response, "Layer query").await?;
        Ok(envelope.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let mut config = MewConfig::default();
        config.api_base_url = "http://localhost:9000/api/".to_string();
        let store = HttpGraphStore::new(&config).unwrap();

        assert_eq!(store.api_base_url(), "http://localhost:9000/api");
        assert_eq!(store.endpoint("sync"), "http://localhost:9000/api/sync");
        assert_eq!(store.tokens().policy(), TokenPolicy::Cached);
    }
}
