//! Login handshake and token issuance handlers.
//!
//! The web app never calls these: its identity arrives on every request
//! from the reverse proxy. The editor extension does not sit behind that
//! proxy, so it obtains a bearer token through the browser handshake
//! (login-url issuance, browser callback, status polling) or, in
//! development setups only, through the direct-credential endpoint.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use validator::Validate;

use crate::extract::auth::{AuthClaims, AuthKeys, IdentityVerifier};
use crate::handler::request::{DirectLoginRequest, LoginCallbackRequest, LoginSessionQuery, LoginStatusQuery};
use crate::handler::response::{
    DirectLoginReply, LoginCallbackReply, LoginPendingReply, LoginStatusReply, LoginUrlReply,
};
use crate::handler::{ErrorKind, Result};
use crate::service::{CourseRoster, LoginOptions, LoginSessionStore, LoginState, ServiceState, Transition};

/// Tracing target for login handshake operations.
const TRACING_TARGET: &str = "tutor_server::handler::authentication";

/// Returns a [`Router`] with all authentication routes.
///
/// The direct-credential endpoint is only routed when the development
/// login path was enabled at startup; otherwise it does not exist.
///
/// [`Router`]: axum::routing::Router
pub fn routes(state: &ServiceState) -> Router<ServiceState> {
    let mut router = Router::new()
        .route("/vscode-auth", get(login_session).post(login_callback))
        .route("/vscode-auth-status", get(login_status));

    if state.dev_login_enabled() {
        router = router.route("/vscode-direct-auth", post(direct_login));
    }

    router
}

/// Starts a login handshake, or shows the pending page for an existing one.
///
/// Without a `session_id` this issues a fresh handshake session and the
/// login URL the extension should open in a browser. With a `session_id`
/// it serves the payload the browser shows while authentication is
/// pending.
#[tracing::instrument(skip_all)]
async fn login_session(
    State(login_sessions): State<LoginSessionStore>,
    State(login_options): State<LoginOptions>,
    Query(query): Query<LoginSessionQuery>,
) -> Result<impl IntoResponse> {
    if let Some(session_id) = query.session_id {
        return Ok(Json(LoginPendingReply {
            message: "Editor authentication pending".to_owned(),
            session_id,
            instructions: "Please authenticate via the web interface".to_owned(),
        })
        .into_response());
    }

    let session_id = login_sessions.create();
    let login_url = login_options.login_url(&session_id);

    tracing::info!(
        target: TRACING_TARGET,
        session_id = %session_id,
        "Issued login handshake session"
    );

    Ok(Json(LoginUrlReply {
        session_id,
        login_url,
    })
    .into_response())
}

/// Completes a handshake from the browser callback.
///
/// The browser sits behind the reverse proxy, so the trusted header
/// carries the verified username. The issued token is attached to the
/// handshake session for the polling extension to collect; a session that
/// already completed stays as the first writer left it.
#[tracing::instrument(skip_all)]
async fn login_callback(
    State(identity): State<IdentityVerifier>,
    State(roster): State<CourseRoster>,
    State(auth_keys): State<AuthKeys>,
    State(login_sessions): State<LoginSessionStore>,
    headers: HeaderMap,
    Json(request): Json<LoginCallbackRequest>,
) -> Result<Json<LoginCallbackReply>> {
    request
        .validate()
        .map_err(|e| ErrorKind::BadRequest.with_context(e.to_string()))?;

    let Ok(username) = identity.verify_header(&headers) else {
        return Err(ErrorKind::MissingAuthToken
            .with_message("Authentication required")
            .with_resource("authentication"));
    };

    if !roster.is_authorized(&username) {
        let _ = login_sessions.fail(&request.session_id);
        return Err(ErrorKind::Forbidden
            .with_message("Access denied. You must be enrolled in the course")
            .with_resource("roster"));
    }

    let token = AuthClaims::new(&username).encode(&auth_keys)?;

    match login_sessions.complete(&request.session_id, &token, &username) {
        Transition::Applied => {
            tracing::info!(
                target: TRACING_TARGET,
                session_id = %request.session_id,
                username = %username,
                "Login handshake completed"
            );
            Ok(Json(LoginCallbackReply {
                token,
                utln: username,
            }))
        }
        Transition::NotFound => Err(ErrorKind::Unauthorized
            .with_message("Authentication failed")
            .with_context("Login session expired or does not exist")
            .with_resource("login_session")),
        Transition::AlreadyTerminal => Err(ErrorKind::Conflict
            .with_message("Authentication failed")
            .with_context("Login session was already completed")
            .with_resource("login_session")),
    }
}

/// Reports the state of a handshake to the polling extension.
#[tracing::instrument(skip_all)]
async fn login_status(
    State(login_sessions): State<LoginSessionStore>,
    Query(query): Query<LoginStatusQuery>,
) -> Json<LoginStatusReply> {
    let reply = match login_sessions.status(&query.session_id) {
        None => LoginStatusReply::status("not_found"),
        Some(LoginState::Pending) => LoginStatusReply::status("pending"),
        Some(LoginState::Failed) => LoginStatusReply::status("error"),
        Some(LoginState::Completed { token, username }) => {
            LoginStatusReply::completed(token, username)
        }
    };

    Json(reply)
}

/// Direct-credential login for development setups.
///
/// Applies the deliberately weak syntactic check only; unreachable in
/// production because the route is not registered there.
#[tracing::instrument(skip_all)]
async fn direct_login(
    State(identity): State<IdentityVerifier>,
    State(roster): State<CourseRoster>,
    State(auth_keys): State<AuthKeys>,
    Json(request): Json<DirectLoginRequest>,
) -> impl IntoResponse {
    if request.validate().is_err() {
        return (
            StatusCode::BAD_REQUEST,
            Json(DirectLoginReply::failure("Username and password are required")),
        );
    }

    let Ok(username) = identity.verify_credentials(&request.username, &request.password) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(DirectLoginReply::failure(
                "Invalid credentials or user not authorized for the course",
            )),
        );
    };

    if !roster.is_authorized(&username) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(DirectLoginReply::failure(
                "Invalid credentials or user not authorized for the course",
            )),
        );
    }

    match AuthClaims::new(&username).encode(&auth_keys) {
        Ok(token) => {
            tracing::info!(
                target: TRACING_TARGET,
                username = %username,
                "Development credential login issued a token"
            );
            (StatusCode::OK, Json(DirectLoginReply::success(token, username)))
        }
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(DirectLoginReply::failure("Authentication error")),
        ),
    }
}
