//! End-to-end tests of the streaming chat exchange.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{dev_config, parse_events, server_with_state};
use serde_json::json;
use tutor_proxy::{MessageRole, MockProxy, RagDocument};
use tutor_server::service::ServiceConfig;

#[tokio::test]
async fn course_related_turn_streams_loading_thinking_complete() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let proxy = MockProxy::with_reply("PassengerQueue orders arrivals by time.").with_documents(
        vec![RagDocument::new("MetroSim spec", vec!["arrival ordering".into()])],
    );
    let (server, _state) = server_with_state(dev_config(&tmp), proxy)?;

    let response = server
        .post("/api/stream")
        .add_header("x-remote-user", "testuser")
        .json(&json!({
            "message": "How does the metrosim PassengerQueue work?",
            "conversationId": "c2",
        }))
        .await;
    response.assert_status_ok();

    let events = parse_events(&response.text());
    let statuses: Vec<_> = events
        .iter()
        .map(|e| e["status"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(statuses, vec!["loading", "thinking", "complete"]);

    let complete = events.last().unwrap();
    assert!(!complete["response"].as_str().unwrap().is_empty());
    assert!(
        complete["rag_context"]
            .as_str()
            .unwrap()
            .contains("MetroSim spec")
    );
    assert_eq!(complete["conversation_id"], "c2");
    Ok(())
}

#[tokio::test]
async fn missing_token_yields_a_single_error_event_and_no_side_effects() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let (server, state) = server_with_state(dev_config(&tmp), MockProxy::with_reply("hi"))?;

    let response = server
        .post("/api/stream")
        .json(&json!({"message": "hello", "conversationId": "c1"}))
        .await;
    response.assert_status_ok();

    let events = parse_events(&response.text());
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["status"], "error");
    assert_eq!(events[0]["error"], "Authentication required");

    // No generation happened and no turn was appended.
    assert!(state.conversations().is_empty());
    Ok(())
}

#[tokio::test]
async fn non_course_turn_skips_the_loading_event() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let (server, _state) = server_with_state(dev_config(&tmp), MockProxy::with_reply("hello!"))?;

    let response = server
        .post("/api/stream")
        .add_header("x-remote-user", "testuser")
        .json(&json!({"message": "hello", "conversationId": "c1"}))
        .await;

    let events = parse_events(&response.text());
    let statuses: Vec<_> = events
        .iter()
        .map(|e| e["status"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(statuses, vec!["thinking", "complete"]);
    Ok(())
}

#[tokio::test]
async fn empty_message_is_rejected_in_the_stream() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let (server, _state) = server_with_state(dev_config(&tmp), MockProxy::default())?;

    let response = server
        .post("/api/stream")
        .add_header("x-remote-user", "testuser")
        .json(&json!({"message": "   ", "conversationId": "c1"}))
        .await;

    let events = parse_events(&response.text());
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["status"], "error");
    assert_eq!(events[0]["error"], "Message is required");
    Ok(())
}

#[tokio::test]
async fn generation_timeout_emits_error_and_leaves_history_unchanged() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let config = ServiceConfig {
        generation_timeout_secs: 1,
        ..dev_config(&tmp)
    };
    let proxy = MockProxy::with_reply("too slow").with_generate_delay(Duration::from_secs(3));
    let (server, state) = server_with_state(config, proxy)?;

    let response = server
        .post("/api/stream")
        .add_header("x-remote-user", "testuser")
        .json(&json!({"message": "hello", "conversationId": "c9"}))
        .await;

    let events = parse_events(&response.text());
    let statuses: Vec<_> = events
        .iter()
        .map(|e| e["status"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(statuses, vec!["thinking", "error"]);

    // The failed turn appended nothing.
    assert!(state.conversations().is_empty());
    Ok(())
}

#[tokio::test]
async fn generation_failure_emits_exactly_one_error_event() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let (server, _state) =
        server_with_state(dev_config(&tmp), MockProxy::default().failing_generation())?;

    let response = server
        .post("/api/stream")
        .add_header("x-remote-user", "testuser")
        .json(&json!({"message": "hello", "conversationId": "c1"}))
        .await;

    let events = parse_events(&response.text());
    let errors: Vec<_> = events.iter().filter(|e| e["status"] == "error").collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(events.last().unwrap()["status"], "error");
    Ok(())
}

#[tokio::test]
async fn retrieval_failure_degrades_to_an_ungrounded_answer() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let proxy = MockProxy::with_reply("Gerp indexes words.").failing_retrieval();
    let (server, _state) = server_with_state(dev_config(&tmp), proxy)?;

    let response = server
        .post("/api/stream")
        .add_header("x-remote-user", "testuser")
        .json(&json!({"message": "how does gerp index?", "conversationId": "c1"}))
        .await;

    let events = parse_events(&response.text());
    let complete = events.last().unwrap();
    assert_eq!(complete["status"], "complete");
    assert_eq!(complete["rag_context"], "");
    Ok(())
}

#[tokio::test]
async fn two_turns_round_trip_in_order() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let (server, state) = server_with_state(dev_config(&tmp), MockProxy::default())?;

    for message in ["turn one", "turn two"] {
        let response = server
            .post("/api")
            .add_header("x-remote-user", "testuser")
            .json(&json!({"message": message, "conversationId": "c1"}))
            .await;
        response.assert_status_ok();
    }

    let history = state.conversations().history("c1");
    let roles: Vec<_> = history.iter().map(|m| m.role()).collect();
    assert_eq!(roles, vec![
        MessageRole::System,
        MessageRole::User,
        MessageRole::Assistant,
        MessageRole::User,
        MessageRole::Assistant,
    ]);
    assert_eq!(history[1].content(), "turn one");
    assert_eq!(history[3].content(), "turn two");
    Ok(())
}

#[tokio::test]
async fn non_streaming_endpoint_requires_authentication() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let (server, _state) = server_with_state(dev_config(&tmp), MockProxy::default())?;

    let response = server
        .post("/api")
        .json(&json!({"message": "hello", "conversationId": "c1"}))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn legacy_mode_serves_anonymous_turns() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let config = ServiceConfig {
        require_auth: false,
        ..dev_config(&tmp)
    };
    let (server, _state) = server_with_state(config, MockProxy::with_reply("hi there"))?;

    let response = server
        .post("/api")
        .json(&json!({"message": "hello", "conversationId": "legacy"}))
        .await;
    response.assert_status_ok();

    let reply: serde_json::Value = response.json();
    assert_eq!(reply["response"], "hi there");
    assert_eq!(reply["conversation_id"], "legacy");
    Ok(())
}
