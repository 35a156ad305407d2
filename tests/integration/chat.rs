//! Non-streaming relay and request validation tests

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{constants::TEST_API_KEY, test_server};
use crate::mocks::upstream::MockUpstream;

#[tokio::test]
async fn non_streaming_relays_reply_and_provider_payload() {
    let upstream = MockUpstream::start().await;
    upstream
        .mock_completion(json!({
            "choices": [ { "message": { "role": "assistant", "content": "hello" } } ]
        }))
        .await;
    let server = test_server(&upstream.uri(), Some(TEST_API_KEY));

    let response = server
        .post("/api/chat")
        .json(&json!({
            "messages": [ { "role": "user", "content": "hi" } ],
            "stream": false
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["reply"], "hello");
    assert_eq!(
        body["providerResponse"]["choices"][0]["message"]["content"],
        "hello"
    );
}

#[tokio::test]
async fn non_streaming_includes_usage_when_upstream_reports_it() {
    let upstream = MockUpstream::start().await;
    upstream.mock_completion_content("ok").await;
    let server = test_server(&upstream.uri(), Some(TEST_API_KEY));

    let response = server
        .post("/api/chat")
        .json(&json!({
            "messages": [ { "role": "user", "content": "hi" } ],
            "stream": false
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["usage"]["total_tokens"], 10);
}

#[tokio::test]
async fn empty_completion_content_becomes_placeholder() {
    let upstream = MockUpstream::start().await;
    upstream
        .mock_completion(json!({
            "choices": [ { "message": { "role": "assistant", "content": "" } } ]
        }))
        .await;
    let server = test_server(&upstream.uri(), Some(TEST_API_KEY));

    let response = server
        .post("/api/chat")
        .json(&json!({
            "messages": [ { "role": "user", "content": "hi" } ],
            "stream": false
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["reply"], "(no reply received)");
}

#[tokio::test]
async fn empty_history_is_rejected_before_any_upstream_call() {
    let upstream = MockUpstream::start().await;
    let server = test_server(&upstream.uri(), Some(TEST_API_KEY));

    let response = server
        .post("/api/chat")
        .json(&json!({ "messages": [], "stream": false }))
        .await;

    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("messages"));
    assert_eq!(upstream.received_requests().await, 0);
}

#[tokio::test]
async fn missing_messages_field_is_rejected() {
    let upstream = MockUpstream::start().await;
    let server = test_server(&upstream.uri(), Some(TEST_API_KEY));

    let response = server
        .post("/api/chat")
        .json(&json!({ "stream": false }))
        .await;

    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(upstream.received_requests().await, 0);
}

#[tokio::test]
async fn missing_credential_fails_fast_with_500() {
    let upstream = MockUpstream::start().await;
    let server = test_server(&upstream.uri(), None);

    let response = server
        .post("/api/chat")
        .json(&json!({
            "messages": [ { "role": "user", "content": "hi" } ]
        }))
        .await;

    response.assert_status(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("API key"));
    assert_eq!(upstream.received_requests().await, 0);
}

#[tokio::test]
async fn placeholder_credential_fails_fast_with_500() {
    let upstream = MockUpstream::start().await;
    let server = test_server(&upstream.uri(), Some("sk-replace-me"));

    let response = server
        .post("/api/chat")
        .json(&json!({
            "messages": [ { "role": "user", "content": "hi" } ]
        }))
        .await;

    response.assert_status(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(upstream.received_requests().await, 0);
}

#[tokio::test]
async fn upstream_http_error_propagates_status_and_detail() {
    let upstream = MockUpstream::start().await;
    upstream
        .mock_error(402, json!({ "error": { "message": "insufficient balance" } }))
        .await;
    let server = test_server(&upstream.uri(), Some(TEST_API_KEY));

    let response = server
        .post("/api/chat")
        .json(&json!({
            "messages": [ { "role": "user", "content": "hi" } ],
            "stream": false
        }))
        .await;

    response.assert_status(axum::http::StatusCode::PAYMENT_REQUIRED);
    let body: Value = response.json();
    assert_eq!(body["detail"]["error"]["message"], "insufficient balance");
}

#[tokio::test]
async fn upstream_error_before_streaming_is_a_plain_json_error() {
    let upstream = MockUpstream::start().await;
    upstream
        .mock_error(503, json!({ "error": "overloaded" }))
        .await;
    let server = test_server(&upstream.uri(), Some(TEST_API_KEY));

    // Even with stream=true, a pre-stream upstream failure arrives as an
    // ordinary error response because no headers were committed yet.
    let response = server
        .post("/api/chat")
        .json(&json!({
            "messages": [ { "role": "user", "content": "hi" } ],
            "stream": true
        }))
        .await;

    response.assert_status(axum::http::StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["detail"]["error"], "overloaded");
}

#[tokio::test]
async fn forwarded_request_carries_model_and_sampling_defaults() {
    let upstream = MockUpstream::start().await;
    upstream.mock_completion_content("ok").await;
    let server = test_server(&upstream.uri(), Some(TEST_API_KEY));

    server
        .post("/api/chat")
        .json(&json!({
            "messages": [ { "role": "user", "content": "hi" } ],
            "stream": false
        }))
        .await
        .assert_status_ok();

    let forwarded = upstream.last_request_body().await.expect("upstream call");
    assert_eq!(forwarded["model"], "deepseek-chat");
    assert_eq!(forwarded["stream"], false);
    assert_eq!(forwarded["temperature"], 0.7);
    assert_eq!(forwarded["top_p"], 0.9);
    assert_eq!(forwarded["messages"][0]["content"], "hi");
}
