//! Response bodies and the server→client stream protocol.

use serde::{Deserialize, Serialize};

/// A unit of the server→client stream protocol.
///
/// A turn emits any number of `loading`/`thinking` updates followed by
/// exactly one `complete` or `error`; nothing follows the terminal event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Retrieval over course material has started.
    Loading {
        /// Human-readable progress note.
        message: String,
    },

    /// Generation has been dispatched.
    Thinking {
        /// Human-readable progress note.
        message: String,
    },

    /// The turn finished with an answer.
    Complete {
        /// The assistant's answer.
        response: String,
        /// Rendered retrieval context accumulated for the conversation.
        rag_context: String,
        /// The conversation this turn belongs to.
        conversation_id: String,
    },

    /// The turn failed.
    Error {
        /// Short human-readable failure description.
        error: String,
    },
}

impl StreamEvent {
    /// Creates a `loading` status update.
    pub fn loading(message: impl Into<String>) -> Self {
        Self::Loading {
            message: message.into(),
        }
    }

    /// Creates a `thinking` status update.
    pub fn thinking(message: impl Into<String>) -> Self {
        Self::Thinking {
            message: message.into(),
        }
    }

    /// Creates the terminal `complete` event.
    pub fn complete(
        response: impl Into<String>,
        rag_context: impl Into<String>,
        conversation_id: impl Into<String>,
    ) -> Self {
        Self::Complete {
            response: response.into(),
            rag_context: rag_context.into(),
            conversation_id: conversation_id.into(),
        }
    }

    /// Creates the terminal `error` event.
    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }

    /// Returns `true` for the events that end a turn.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}

/// Terminal payload of the non-streaming chat endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    /// The assistant's answer.
    pub response: String,
    /// Rendered retrieval context accumulated for the conversation.
    pub rag_context: String,
    /// The conversation this turn belongs to.
    pub conversation_id: String,
}

/// Reply to a fresh login handshake request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginUrlReply {
    /// The handshake session to poll.
    pub session_id: String,
    /// Browser URL that completes the login.
    pub login_url: String,
}

/// Reply shown to a browser that opened a pending login link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginPendingReply {
    /// Human-readable status note.
    pub message: String,
    /// The handshake session this page belongs to.
    pub session_id: String,
    /// What the user should do next.
    pub instructions: String,
}

/// Reply to the browser login callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCallbackReply {
    /// The issued bearer token.
    pub token: String,
    /// The authenticated username.
    pub utln: String,
}

/// Reply to the login status polling endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginStatusReply {
    /// `pending`, `completed`, `error` or `not_found`.
    pub status: String,
    /// The issued token, once completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// The authenticated username, once completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utln: Option<String>,
}

impl LoginStatusReply {
    /// Creates a bare status reply.
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            token: None,
            utln: None,
        }
    }

    /// Creates a `completed` reply carrying the issued credential.
    pub fn completed(token: impl Into<String>, utln: impl Into<String>) -> Self {
        Self {
            status: "completed".to_owned(),
            token: Some(token.into()),
            utln: Some(utln.into()),
        }
    }
}

/// Reply to the development direct-credential login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectLoginReply {
    /// Whether the login succeeded.
    pub success: bool,
    /// The issued bearer token on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// The authenticated username on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Human-readable success note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Short failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DirectLoginReply {
    /// Creates a successful login reply.
    pub fn success(token: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            success: true,
            token: Some(token.into()),
            username: Some(username.into()),
            message: Some("Authentication successful".to_owned()),
            error: None,
        }
    }

    /// Creates a failed login reply.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            token: None,
            username: None,
            message: None,
            error: Some(error.into()),
        }
    }
}

/// Static liveness payload of the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReply {
    /// Always `healthy` while the process serves requests.
    pub status: String,
}

impl HealthReply {
    /// Creates the static healthy payload.
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_event_serializes_on_status_tag() {
        let event = StreamEvent::loading("Looking at course content...");
        let json = serde_json::to_string(&event).unwrap();

        assert!(json.contains(r#""status":"loading""#));
        assert!(json.contains("Looking at course content..."));
    }

    #[test]
    fn complete_event_carries_the_original_wire_fields() {
        let event = StreamEvent::complete("answer", "context", "c1");
        let json = serde_json::to_string(&event).unwrap();

        assert!(json.contains(r#""status":"complete""#));
        assert!(json.contains(r#""response":"answer""#));
        assert!(json.contains(r#""rag_context":"context""#));
        assert!(json.contains(r#""conversation_id":"c1""#));
    }

    #[test]
    fn terminal_events_are_flagged() {
        assert!(StreamEvent::complete("a", "", "c").is_terminal());
        assert!(StreamEvent::error("boom").is_terminal());
        assert!(!StreamEvent::loading("x").is_terminal());
        assert!(!StreamEvent::thinking("x").is_terminal());
    }

    #[test]
    fn status_reply_omits_absent_credential() {
        let json = serde_json::to_string(&LoginStatusReply::status("pending")).unwrap();
        assert!(!json.contains("token"));

        let json = serde_json::to_string(&LoginStatusReply::completed("t", "u")).unwrap();
        assert!(json.contains(r#""token":"t""#));
        assert!(json.contains(r#""utln":"u""#));
    }
}
