//! Provider trait, observable service wrapper and test mock.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::generate::{GenerateReply, GenerateRequest};
use crate::retrieve::{RagDocument, RetrieveRequest};

/// Tracing target for proxy service operations.
const TRACING_TARGET: &str = "tutor_proxy::service";

/// The opaque text-generation and retrieval backend.
///
/// [`ProxyClient`] is the production implementation; [`MockProxy`] backs
/// tests. Consumers hold the trait object through [`ProxyService`].
///
/// [`ProxyClient`]: crate::client::ProxyClient
#[async_trait::async_trait]
pub trait ChatProxy: Send + Sync {
    /// Requests a generated answer.
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateReply>;

    /// Retrieves course-material context for a query.
    async fn retrieve(&self, request: &RetrieveRequest) -> Result<Vec<RagDocument>>;
}

#[async_trait::async_trait]
impl ChatProxy for crate::client::ProxyClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateReply> {
        Self::generate(self, request).await
    }

    async fn retrieve(&self, request: &RetrieveRequest) -> Result<Vec<RagDocument>> {
        Self::retrieve(self, request).await
    }
}

/// Proxy service with observability.
///
/// Wraps any [`ChatProxy`] provider and adds structured logging for both
/// arms of every operation.
#[derive(Clone)]
pub struct ProxyService {
    provider: Arc<dyn ChatProxy>,
}

impl fmt::Debug for ProxyService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyService").finish_non_exhaustive()
    }
}

impl ProxyService {
    /// Creates a new proxy service from a provider.
    pub fn from_provider<P>(provider: P) -> Self
    where
        P: ChatProxy + 'static,
    {
        Self {
            provider: Arc::new(provider),
        }
    }

    /// Requests a generated answer.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerateReply> {
        let started_at = Instant::now();
        let result = self.provider.generate(request).await;
        let elapsed = started_at.elapsed();

        match &result {
            Ok(reply) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    session_id = %request.session_id,
                    response_len = reply.response.len(),
                    elapsed_ms = elapsed.as_millis(),
                    "Generation successful"
                );
            }
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    session_id = %request.session_id,
                    error = %error,
                    elapsed_ms = elapsed.as_millis(),
                    "Generation failed"
                );
            }
        }

        result
    }

    /// Retrieves course-material context for a query.
    pub async fn retrieve(&self, request: &RetrieveRequest) -> Result<Vec<RagDocument>> {
        let started_at = Instant::now();
        let result = self.provider.retrieve(request).await;
        let elapsed = started_at.elapsed();

        match &result {
            Ok(documents) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    session_id = %request.session_id,
                    document_count = documents.len(),
                    elapsed_ms = elapsed.as_millis(),
                    "Retrieval successful"
                );
            }
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    session_id = %request.session_id,
                    error = %error,
                    elapsed_ms = elapsed.as_millis(),
                    "Retrieval failed"
                );
            }
        }

        result
    }
}

/// Canned-response proxy for tests.
///
/// Returns a configurable answer and document set, can be made to fail
/// either operation, and can delay generation to exercise timeout paths.
#[derive(Clone, Debug, Default)]
pub struct MockProxy {
    reply: Option<String>,
    documents: Vec<RagDocument>,
    fail_generate: bool,
    fail_retrieve: bool,
    generate_delay: Option<Duration>,
}

impl MockProxy {
    /// Creates a mock that answers every query with the given text.
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            ..Self::default()
        }
    }

    /// Sets the documents returned by retrieval.
    pub fn with_documents(mut self, documents: Vec<RagDocument>) -> Self {
        self.documents = documents;
        self
    }

    /// Makes every generation call fail.
    pub fn failing_generation(mut self) -> Self {
        self.fail_generate = true;
        self
    }

    /// Makes every retrieval call fail.
    pub fn failing_retrieval(mut self) -> Self {
        self.fail_retrieve = true;
        self
    }

    /// Delays every generation call by the given duration.
    pub fn with_generate_delay(mut self, delay: Duration) -> Self {
        self.generate_delay = Some(delay);
        self
    }

    /// Converts this mock into a [`ProxyService`].
    pub fn into_service(self) -> ProxyService {
        ProxyService::from_provider(self)
    }
}

#[async_trait::async_trait]
impl ChatProxy for MockProxy {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateReply> {
        if let Some(delay) = self.generate_delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_generate {
            return Err(Error::Status(reqwest::StatusCode::BAD_GATEWAY));
        }

        let response = self
            .reply
            .clone()
            .unwrap_or_else(|| format!("Mock answer to: {}", request.query));

        Ok(GenerateReply {
            response,
            rag_context: serde_json::Value::Null,
        })
    }

    async fn retrieve(&self, _request: &RetrieveRequest) -> Result<Vec<RagDocument>> {
        if self.fail_retrieve {
            return Err(Error::Status(reqwest::StatusCode::BAD_GATEWAY));
        }

        Ok(self.documents.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerateRequest {
        GenerateRequest::new("4o-mini", "system", "What is a linked list?", "c1")
    }

    #[tokio::test]
    async fn mock_returns_canned_reply() -> anyhow::Result<()> {
        let service = MockProxy::with_reply("A linked list is a chain of nodes.").into_service();
        let reply = service.generate(&request()).await?;

        assert_eq!(reply.response, "A linked list is a chain of nodes.");
        Ok(())
    }

    #[tokio::test]
    async fn mock_echoes_query_without_canned_reply() -> anyhow::Result<()> {
        let service = MockProxy::default().into_service();
        let reply = service.generate(&request()).await?;

        assert!(reply.response.contains("What is a linked list?"));
        Ok(())
    }

    #[tokio::test]
    async fn failing_mock_surfaces_errors() {
        let service = MockProxy::default().failing_generation().into_service();
        let result = service.generate(&request()).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn mock_retrieval_returns_documents() -> anyhow::Result<()> {
        let documents = vec![RagDocument::new("Handout", vec!["chunk".into()])];
        let service = MockProxy::default()
            .with_documents(documents.clone())
            .into_service();

        let retrieved = service
            .retrieve(&RetrieveRequest::course_material("metrosim"))
            .await?;
        assert_eq!(retrieved, documents);
        Ok(())
    }
}
