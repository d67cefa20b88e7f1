//! Proxy client implementation using reqwest.

use std::sync::Arc;
use std::time::Instant;

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::ProxyConfig;
use crate::error::{Error, Result};
use crate::generate::{GenerateReply, GenerateRequest};
use crate::retrieve::{RagDocument, RetrieveRequest};

/// Tracing target for proxy client operations.
pub const TRACING_TARGET: &str = "tutor_proxy::client";

/// Inner client that holds the HTTP client and configuration.
struct ProxyClientInner {
    http: Client,
    config: ProxyConfig,
}

impl std::fmt::Debug for ProxyClientInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyClientInner")
            .field("endpoint", &self.config.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

/// Client for the upstream LLM proxy.
///
/// Every operation posts to the same endpoint; the `request_type` header
/// selects between generation (`call`), retrieval (`retrieve`) and model
/// metadata (`model_info`).
///
/// This type is cheap to clone and can be shared across threads.
#[derive(Clone, Debug)]
pub struct ProxyClient {
    inner: Arc<ProxyClientInner>,
}

impl ProxyClient {
    /// Creates a new proxy client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn new(config: ProxyConfig) -> Result<Self> {
        config.validate()?;

        tracing::debug!(
            target: TRACING_TARGET,
            endpoint = %config.endpoint,
            timeout_ms = config.timeout.as_millis(),
            "Creating proxy client"
        );

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let inner = ProxyClientInner { http, config };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ProxyConfig {
        &self.inner.config
    }

    /// Requests a generated answer from the proxy.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerateReply> {
        let started_at = Instant::now();

        tracing::debug!(
            target: TRACING_TARGET,
            session_id = %request.session_id,
            model = %request.model,
            lastk = request.lastk,
            "Dispatching generation request"
        );

        let reply: GenerateReply = self.post("call", request).await?;

        tracing::debug!(
            target: TRACING_TARGET,
            session_id = %request.session_id,
            response_len = reply.response.len(),
            elapsed_ms = started_at.elapsed().as_millis(),
            "Generation request completed"
        );

        Ok(reply)
    }

    /// Retrieves course-material context for a query.
    pub async fn retrieve(&self, request: &RetrieveRequest) -> Result<Vec<RagDocument>> {
        let started_at = Instant::now();

        tracing::debug!(
            target: TRACING_TARGET,
            session_id = %request.session_id,
            rag_k = request.rag_k,
            "Dispatching retrieval request"
        );

        let documents: Vec<RagDocument> = self.post("retrieve", request).await?;

        tracing::debug!(
            target: TRACING_TARGET,
            session_id = %request.session_id,
            document_count = documents.len(),
            elapsed_ms = started_at.elapsed().as_millis(),
            "Retrieval request completed"
        );

        Ok(documents)
    }

    /// Fetches upstream model metadata.
    pub async fn model_info(&self) -> Result<serde_json::Value> {
        self.post("model_info", &serde_json::json!({})).await
    }

    /// Posts a request body to the proxy endpoint under the given request type.
    async fn post<B, R>(&self, request_type: &'static str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .inner
            .http
            .post(self.inner.config.endpoint.clone())
            .header("x-api-key", &self.inner.config.api_key)
            .header("request_type", request_type)
            .json(body)
            .send()
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    target: TRACING_TARGET,
                    request_type,
                    error = %e,
                    timed_out = e.is_timeout(),
                    "Proxy request failed"
                );
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                target: TRACING_TARGET,
                request_type,
                status = status.as_u16(),
                "Proxy returned non-success status"
            );
            return Err(Error::Status(status));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::warn!(
                target: TRACING_TARGET,
                request_type,
                error = %e,
                "Proxy reply could not be decoded"
            );
            Error::Decode(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;

    #[test]
    fn client_creation() {
        let endpoint = Url::parse("https://proxy.example.edu/api").unwrap();
        let client = ProxyClient::new(ProxyConfig::new(endpoint, "key"));
        assert!(client.is_ok());
    }

    #[test]
    fn client_creation_rejects_invalid_config() {
        let endpoint = Url::parse("https://proxy.example.edu/api").unwrap();
        let client = ProxyClient::new(ProxyConfig::new(endpoint, ""));
        assert!(client.is_err());
    }
}
