//! Request bodies and query parameters.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Conversation id used when the client does not supply one.
fn default_conversation_id() -> String {
    "default".to_owned()
}

/// Body of a chat turn request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChatRequest {
    /// The user's question.
    #[validate(length(min = 1, max = 8192))]
    pub message: String,

    /// Client-generated opaque conversation identifier.
    #[serde(rename = "conversationId", default = "default_conversation_id")]
    #[validate(length(min = 1, max = 128))]
    pub conversation_id: String,
}

/// Query parameters of the login handshake entry endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginSessionQuery {
    /// Present when a browser follows an issued login link.
    pub session_id: Option<String>,
}

/// Query parameters of the login status polling endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginStatusQuery {
    /// The handshake session to inspect.
    pub session_id: String,
}

/// Body of the browser login callback.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginCallbackRequest {
    /// The handshake session to complete.
    #[validate(length(min = 1, max = 128))]
    pub session_id: String,
}

/// Body of the development direct-credential login.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DirectLoginRequest {
    /// Username to log in as.
    #[validate(length(min = 1, max = 64))]
    pub username: String,

    /// Password; only checked syntactically on the development path.
    #[validate(length(min = 1, max = 256))]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_defaults_conversation_id() {
        let request: ChatRequest = serde_json::from_str(r#"{"message":"hello"}"#).unwrap();
        assert_eq!(request.conversation_id, "default");
    }

    #[test]
    fn chat_request_accepts_camel_case_id() {
        let request: ChatRequest =
            serde_json::from_str(r#"{"message":"hello","conversationId":"c42"}"#).unwrap();
        assert_eq!(request.conversation_id, "c42");
    }

    #[test]
    fn empty_message_fails_validation() {
        let request = ChatRequest {
            message: String::new(),
            conversation_id: "c1".to_owned(),
        };
        assert!(request.validate().is_err());
    }
}
