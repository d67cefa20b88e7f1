//! Generation request and reply types for the upstream proxy.

use serde::{Deserialize, Serialize};

/// A text-generation request (`request_type: call`).
///
/// The proxy keeps its own per-session history; `lastk` tells it how many
/// prior user/assistant pairs to replay before the current query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use = "requests do nothing unless sent"]
pub struct GenerateRequest {
    /// Upstream model identifier.
    pub model: String,

    /// System instruction, including any accumulated retrieval context.
    pub system: String,

    /// The user's query text.
    pub query: String,

    /// Sampling temperature.
    pub temperature: f64,

    /// Number of prior user/assistant pairs the proxy should replay.
    pub lastk: usize,

    /// Proxy-side session identifier (the conversation id).
    pub session_id: String,

    /// Whether the proxy should run its own retrieval step.
    pub rag_usage: bool,

    /// Proxy-side retrieval similarity threshold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rag_threshold: Option<f64>,

    /// Proxy-side retrieval result count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rag_k: Option<u32>,
}

impl GenerateRequest {
    /// Default sampling temperature.
    pub const DEFAULT_TEMPERATURE: f64 = 0.7;

    /// Creates a new generation request.
    ///
    /// Proxy-side retrieval is disabled; retrieval is performed explicitly
    /// with [`RetrieveRequest`] and folded into `system` by the caller.
    ///
    /// [`RetrieveRequest`]: crate::retrieve::RetrieveRequest
    pub fn new(
        model: impl Into<String>,
        system: impl Into<String>,
        query: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            system: system.into(),
            query: query.into(),
            temperature: Self::DEFAULT_TEMPERATURE,
            lastk: 0,
            session_id: session_id.into(),
            rag_usage: false,
            rag_threshold: None,
            rag_k: None,
        }
    }

    /// Sets the number of prior user/assistant pairs to replay.
    pub fn with_lastk(mut self, lastk: usize) -> Self {
        self.lastk = lastk;
        self
    }

    /// Overrides the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

/// A successful generation reply.
///
/// The proxy wraps the answer as `{"result": …, "rag_context": …}`;
/// `rag_context` is only populated when proxy-side retrieval is enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateReply {
    /// The generated answer text.
    #[serde(rename = "result")]
    pub response: String,

    /// Retrieval context the proxy used, if any.
    #[serde(default)]
    pub rag_context: serde_json::Value,
}

impl GenerateReply {
    /// Returns `true` if the proxy attached its own retrieval context.
    #[must_use]
    pub fn has_rag_context(&self) -> bool {
        !self.rag_context.is_null()
            && self.rag_context != serde_json::Value::String(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_without_optional_rag_fields() {
        let request = GenerateRequest::new("4o-mini", "system", "query", "c1").with_lastk(2);
        let json = serde_json::to_string(&request).unwrap();

        assert!(json.contains(r#""model":"4o-mini""#));
        assert!(json.contains(r#""lastk":2"#));
        assert!(!json.contains("rag_threshold"));
        assert!(!json.contains("rag_k"));
    }

    #[test]
    fn reply_unwraps_result_field() {
        let reply: GenerateReply =
            serde_json::from_str(r#"{"result":"An answer","rag_context":""}"#).unwrap();

        assert_eq!(reply.response, "An answer");
        assert!(!reply.has_rag_context());
    }
}
