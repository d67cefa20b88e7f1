//! Application state and dependency injection.

mod config;
mod conversation;
mod login;
mod prompt;
mod relevance;
mod roster;
mod state;
mod transcript;

pub use crate::service::config::{ChatOptions, LoginOptions, ServiceConfig};
pub use crate::service::conversation::{ConversationStore, TurnSnapshot};
pub use crate::service::login::{
    LOGIN_SESSION_TTL, LoginSessionStore, LoginState, Transition,
};
pub use crate::service::prompt::{DEFAULT_SYSTEM_PROMPT, SystemPrompt};
pub use crate::service::relevance::{COURSE_TERMS, is_course_related};
pub use crate::service::roster::CourseRoster;
pub use crate::service::state::ServiceState;
pub use crate::service::transcript::{
    JsonlSink, TranscriptEntry, TranscriptLogger, TranscriptSink, anonymize,
};
// Re-export error types from crate root for convenience
pub use crate::{Error, ErrorKind, Result};
