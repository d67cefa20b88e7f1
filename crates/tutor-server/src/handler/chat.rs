//! Chat turn handlers: the streaming exchange controller.
//!
//! One turn moves through `Unauthenticated → Authenticated →
//! ContextLoaded → Generating → Terminated`: the caller's credential is
//! checked first, retrieval optionally enriches the conversation context,
//! generation runs under a fixed ceiling, and the turn ends with exactly
//! one `complete` or `error` event. Interim `loading`/`thinking` events
//! stream back over SSE in emission order.
//!
//! Clients can cancel generation by closing the connection; the first
//! failed channel send stops the turn task.

use std::convert::Infallible;
use std::time::Instant;

use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::response::sse::{Event, KeepAlive, KeepAliveStream, Sse};
use axum::routing::post;
use axum::{Json, Router};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tutor_proxy::{GenerateRequest, ProxyService, RetrieveRequest};
use validator::Validate;

use crate::extract::auth::{AuthClaims, AuthHeader, AuthKeys, IdentityVerifier};
use crate::handler::request::ChatRequest;
use crate::handler::response::{ChatReply, StreamEvent};
use crate::handler::{ErrorKind, Result};
use crate::service::{
    ChatOptions, ConversationStore, CourseRoster, ServiceState, TranscriptEntry,
    TranscriptLogger, is_course_related,
};

/// Tracing target for chat turn operations.
const TRACING_TARGET: &str = "tutor_server::handler::chat";

/// User-visible failure strings. Internal details never reach the client.
const AUTH_REQUIRED: &str = "Authentication required";
const ACCESS_DENIED: &str = "Access denied. You must be enrolled in the course";
const MESSAGE_REQUIRED: &str = "Message is required";
const GENERATION_FAILED: &str = "Sorry, an error occurred while processing your request.";
const GENERATION_TIMED_OUT: &str = "The tutor took too long to respond. Please try again.";

/// Interim status notes.
const LOADING_MESSAGE: &str = "Looking at course content...";
const THINKING_MESSAGE: &str = "Thinking...";

/// Returns a [`Router`] with all chat routes.
///
/// [`Router`]: axum::routing::Router
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .route("/api", post(chat))
        .route("/api/stream", post(chat_stream))
}

/// Everything a running turn needs, detached from the request lifetime.
#[derive(Clone)]
struct TurnDeps {
    proxy: ProxyService,
    conversations: ConversationStore,
    transcripts: TranscriptLogger,
    options: ChatOptions,
}

/// Why a turn ended without a `complete` event.
enum TurnError {
    /// The client disconnected mid-stream.
    Canceled,
    /// Generation failed or timed out; carries the user-visible message.
    Failed(&'static str),
}

/// Interim event emitter: streaming for SSE turns, silent otherwise.
struct Progress {
    tx: Option<mpsc::Sender<Result<Event, Infallible>>>,
}

impl Progress {
    fn streaming(tx: mpsc::Sender<Result<Event, Infallible>>) -> Self {
        Self { tx: Some(tx) }
    }

    fn silent() -> Self {
        Self { tx: None }
    }

    /// Sends one event; returns `false` once the client is gone.
    async fn send(&self, event: &StreamEvent) -> bool {
        let Some(tx) = &self.tx else { return true };
        let Some(sse) = sse_event(event) else { return true };
        tx.send(Ok(sse)).await.is_ok()
    }
}

fn sse_event(event: &StreamEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().data(json)),
        Err(error) => {
            tracing::error!(
                target: TRACING_TARGET,
                error = %error,
                "Failed to serialize stream event"
            );
            None
        }
    }
}

/// Extracts and verifies the Bearer token, if one was presented.
fn bearer_username(headers: &HeaderMap, auth_keys: &AuthKeys) -> Result<Option<String>> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| {
            ErrorKind::MalformedAuthToken
                .with_message(AUTH_REQUIRED)
                .with_resource("authentication")
        })?;

    AuthClaims::decode(token, auth_keys).map(|claims| Some(claims.username))
}

/// Authorizes a chat turn for the resolved credential.
///
/// Bearer identities take precedence, then the trusted upstream header.
/// When authentication is required and neither is present, the turn
/// fails before any generation work; the legacy implicitly-trusted mode
/// maps absent credentials to an anonymous caller instead. Identified
/// users must additionally be on the course roster.
fn authorize(
    bearer_username: Option<String>,
    headers: &HeaderMap,
    identity: &IdentityVerifier,
    roster: &CourseRoster,
    require_auth: bool,
) -> Result<Option<String>> {
    let username = bearer_username.or_else(|| identity.verify_header(headers).ok());

    let Some(username) = username else {
        if require_auth {
            tracing::warn!(
                target: TRACING_TARGET,
                "Rejected chat turn: no credential presented"
            );
            return Err(ErrorKind::MissingAuthToken
                .with_message(AUTH_REQUIRED)
                .with_resource("authentication"));
        }
        return Ok(None);
    };

    if !roster.is_authorized(&username) {
        return Err(ErrorKind::Forbidden
            .with_message(ACCESS_DENIED)
            .with_resource("roster"));
    }

    Ok(Some(username))
}

/// Runs one question/answer turn.
///
/// Retrieval failures degrade silently; generation failures and the
/// ceiling timeout are the only errors that reach the user. History is
/// only mutated after a successful generation, so a failed turn leaves
/// the conversation exactly as it was.
async fn run_turn(
    deps: &TurnDeps,
    username: Option<&str>,
    message: &str,
    conversation_id: &str,
    progress: &Progress,
) -> Result<ChatReply, TurnError> {
    let started_at = Instant::now();

    if is_course_related(message) {
        if !progress.send(&StreamEvent::loading(LOADING_MESSAGE)).await {
            return Err(TurnError::Canceled);
        }

        match deps
            .proxy
            .retrieve(&RetrieveRequest::course_material(message))
            .await
        {
            Ok(documents) if !documents.is_empty() => {
                deps.conversations.push_context(conversation_id, documents);
            }
            Ok(_) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    conversation_id = %conversation_id,
                    "No new retrieval context found"
                );
            }
            Err(error) => {
                // Degradation only: the turn continues ungrounded.
                tracing::warn!(
                    target: TRACING_TARGET,
                    conversation_id = %conversation_id,
                    error = %error,
                    "Retrieval failed; continuing without context"
                );
            }
        }
    }

    let snapshot = deps.conversations.snapshot(conversation_id);

    if !progress.send(&StreamEvent::thinking(THINKING_MESSAGE)).await {
        return Err(TurnError::Canceled);
    }

    let request = GenerateRequest::new(
        &deps.options.model,
        snapshot.system,
        message,
        conversation_id,
    )
    .with_lastk(snapshot.lastk)
    .with_temperature(deps.options.temperature);

    let reply = match tokio::time::timeout(
        deps.options.generation_timeout,
        deps.proxy.generate(&request),
    )
    .await
    {
        Err(_) => {
            tracing::warn!(
                target: TRACING_TARGET,
                conversation_id = %conversation_id,
                ceiling_ms = deps.options.generation_timeout.as_millis(),
                "Generation exceeded the turn ceiling"
            );
            return Err(TurnError::Failed(GENERATION_TIMED_OUT));
        }
        Ok(Err(_)) => return Err(TurnError::Failed(GENERATION_FAILED)),
        Ok(Ok(reply)) => reply,
    };

    deps.conversations
        .append_turn(conversation_id, message, &reply.response);
    let rag_context = deps.conversations.rag_context(conversation_id);

    deps.transcripts.record(TranscriptEntry::new(
        username.unwrap_or("anonymous"),
        conversation_id,
        message,
        &reply.response,
        &rag_context,
        &deps.options.model,
        started_at.elapsed().as_millis() as u64,
    ));

    tracing::info!(
        target: TRACING_TARGET,
        conversation_id = %conversation_id,
        response_len = reply.response.len(),
        elapsed_ms = started_at.elapsed().as_millis(),
        "Turn completed"
    );

    Ok(ChatReply {
        response: reply.response,
        rag_context,
        conversation_id: conversation_id.to_owned(),
    })
}

/// Handles a chat turn and streams events back via SSE.
///
/// The stream always terminates with exactly one `complete` or `error`
/// record; authentication and validation failures become that single
/// terminal event rather than an HTTP error.
#[tracing::instrument(skip_all, fields(conversation_id = %request.conversation_id))]
async fn chat_stream(
    State(proxy): State<ProxyService>,
    State(conversations): State<ConversationStore>,
    State(transcripts): State<TranscriptLogger>,
    State(options): State<ChatOptions>,
    State(auth_keys): State<AuthKeys>,
    State(identity): State<IdentityVerifier>,
    State(roster): State<CourseRoster>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Sse<KeepAliveStream<ReceiverStream<Result<Event, Infallible>>>> {
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(32);

    let precheck = bearer_username(&headers, &auth_keys)
        .map_err(|error| {
            tracing::warn!(
                target: TRACING_TARGET,
                error = %error,
                "Rejected chat turn: invalid bearer token"
            );
            ErrorKind::Unauthorized
                .with_message(AUTH_REQUIRED)
                .with_resource("authentication")
        })
        .and_then(|bearer| authorize(bearer, &headers, &identity, &roster, options.require_auth))
        .and_then(|username| {
            if request.message.trim().is_empty() {
                Err(ErrorKind::BadRequest.with_message(MESSAGE_REQUIRED))
            } else {
                Ok(username)
            }
        });

    match precheck {
        Err(error) => {
            let message = error
                .message()
                .unwrap_or_else(|| error.kind().default_message())
                .to_owned();
            if let Some(sse) = sse_event(&StreamEvent::error(message)) {
                let _ = tx.try_send(Ok(sse));
            }
        }
        Ok(username) => {
            let deps = TurnDeps {
                proxy,
                conversations,
                transcripts,
                options,
            };
            let ChatRequest {
                message,
                conversation_id,
            } = request;

            tokio::spawn(async move {
                let progress = Progress::streaming(tx);
                match run_turn(
                    &deps,
                    username.as_deref(),
                    &message,
                    &conversation_id,
                    &progress,
                )
                .await
                {
                    Ok(reply) => {
                        let event = StreamEvent::complete(
                            reply.response,
                            reply.rag_context,
                            reply.conversation_id,
                        );
                        let _ = progress.send(&event).await;
                    }
                    Err(TurnError::Canceled) => {
                        tracing::info!(
                            target: TRACING_TARGET,
                            "Client disconnected, canceling turn"
                        );
                    }
                    Err(TurnError::Failed(message)) => {
                        let _ = progress.send(&StreamEvent::error(message)).await;
                    }
                }
            });
        }
    }

    Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default())
}

/// Handles a chat turn without streaming.
///
/// Returns the terminal payload as a single JSON object; interim status
/// events are skipped entirely.
#[tracing::instrument(skip_all, fields(conversation_id = %request.conversation_id))]
async fn chat(
    State(proxy): State<ProxyService>,
    State(conversations): State<ConversationStore>,
    State(transcripts): State<TranscriptLogger>,
    State(options): State<ChatOptions>,
    State(identity): State<IdentityVerifier>,
    State(roster): State<CourseRoster>,
    auth_header: Option<AuthHeader>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>> {
    let bearer = auth_header.map(|header| header.into_auth_claims().username);
    let username = authorize(bearer, &headers, &identity, &roster, options.require_auth)?;

    request
        .validate()
        .map_err(|e| ErrorKind::BadRequest.with_message(MESSAGE_REQUIRED).with_context(e.to_string()))?;
    if request.message.trim().is_empty() {
        return Err(ErrorKind::BadRequest.with_message(MESSAGE_REQUIRED));
    }

    let deps = TurnDeps {
        proxy,
        conversations,
        transcripts,
        options,
    };

    match run_turn(
        &deps,
        username.as_deref(),
        &request.message,
        &request.conversation_id,
        &Progress::silent(),
    )
    .await
    {
        Ok(reply) => Ok(Json(reply)),
        Err(TurnError::Canceled) => Err(ErrorKind::InternalServerError.into_error()),
        Err(TurnError::Failed(message)) => {
            Err(ErrorKind::UpstreamUnavailable.with_message(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;
    use crate::extract::auth::TRUSTED_USER_HEADER;

    fn keys() -> AuthKeys {
        AuthKeys::from_secret("test-secret")
    }

    fn roster() -> CourseRoster {
        CourseRoster::new(&["student01".to_owned()], false)
    }

    #[test]
    fn missing_credentials_fail_when_auth_is_required() {
        let error = authorize(
            None,
            &HeaderMap::new(),
            &IdentityVerifier::TrustedHeader,
            &roster(),
            true,
        )
        .unwrap_err();

        assert_eq!(error.message(), Some(AUTH_REQUIRED));
    }

    #[test]
    fn missing_credentials_are_anonymous_in_legacy_mode() {
        let username = authorize(
            None,
            &HeaderMap::new(),
            &IdentityVerifier::TrustedHeader,
            &roster(),
            false,
        )
        .unwrap();

        assert_eq!(username, None);
    }

    #[test]
    fn garbage_bearer_token_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer garbage"),
        );

        let result = bearer_username(&headers, &keys());
        assert!(result.is_err());
    }

    #[test]
    fn valid_token_resolves_the_username() {
        let keys = keys();
        let token = AuthClaims::new("student01").encode(&keys).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );

        let bearer = bearer_username(&headers, &keys).unwrap();
        let username = authorize(
            bearer,
            &headers,
            &IdentityVerifier::TrustedHeader,
            &roster(),
            true,
        )
        .unwrap();

        assert_eq!(username.as_deref(), Some("student01"));
    }

    #[test]
    fn trusted_header_user_outside_roster_is_denied() {
        let mut headers = HeaderMap::new();
        headers.insert(TRUSTED_USER_HEADER, HeaderValue::from_static("outsider"));

        let error = authorize(
            None,
            &headers,
            &IdentityVerifier::TrustedHeader,
            &roster(),
            true,
        )
        .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Forbidden);
    }
}
