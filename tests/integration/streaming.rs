//! Streaming relay pass-through tests

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::{constants::TEST_API_KEY, test_server, test_server_with_provider};
use crate::mocks::provider::FailingStreamProvider;
use crate::mocks::upstream::MockUpstream;

#[tokio::test]
async fn streaming_relays_frames_and_terminal_token() {
    let upstream = MockUpstream::start().await;
    upstream.mock_stream_deltas(&["Hel", "lo"]).await;
    let server = test_server(&upstream.uri(), Some(TEST_API_KEY));

    let response = server
        .post("/api/chat")
        .json(&json!({
            "messages": [ { "role": "user", "content": "hi" } ],
            "stream": true
        }))
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );
    assert_eq!(response.headers().get("cache-control").unwrap(), "no-cache");

    let body = response.text();
    let frames: Vec<&str> = body.split("\n\n").filter(|f| !f.is_empty()).collect();
    assert_eq!(
        frames,
        vec![
            r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#,
            r#"data: {"choices":[{"delta":{"content":"lo"}}]}"#,
            "data: [DONE]",
        ]
    );
}

#[tokio::test]
async fn frame_payloads_are_relayed_byte_for_byte() {
    let upstream = MockUpstream::start().await;
    // Payloads the relay cannot parse must still pass through untouched
    let raw = "data: {\"choices\":[{\"delta\":{\"content\":\"你好\"}}]}\n\n\
               data: not json at all\n\n\
               data: [DONE]\n\n";
    upstream.mock_stream_raw(raw.to_string()).await;
    let server = test_server(&upstream.uri(), Some(TEST_API_KEY));

    let response = server
        .post("/api/chat")
        .json(&json!({
            "messages": [ { "role": "user", "content": "hi" } ],
            "stream": true
        }))
        .await;

    response.assert_status_ok();
    let body = response.text();
    assert!(body.contains(r#"data: {"choices":[{"delta":{"content":"你好"}}]}"#));
    assert!(body.contains("data: not json at all"));
    assert!(body.ends_with("data: [DONE]\n\n"));
}

#[tokio::test]
async fn relay_stops_at_terminal_token() {
    let upstream = MockUpstream::start().await;
    let raw = "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n\
               data: [DONE]\n\n\
               data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n\n";
    upstream.mock_stream_raw(raw.to_string()).await;
    let server = test_server(&upstream.uri(), Some(TEST_API_KEY));

    let response = server
        .post("/api/chat")
        .json(&json!({
            "messages": [ { "role": "user", "content": "hi" } ],
            "stream": true
        }))
        .await;

    let body = response.text();
    assert!(body.ends_with("data: [DONE]\n\n"));
    assert!(!body.contains("late"));
}

#[tokio::test]
async fn non_data_lines_are_relayed_without_reframing() {
    let upstream = MockUpstream::start().await;
    // SSE comment and field lines carry no `data: ` prefix and must not
    // gain one in transit
    let raw = ": keep-alive\n\n\
               event: message\n\
               data: {\"choices\":[{\"delta\":{\"content\":\"hi\"}}]}\n\n\
               data: [DONE]\n\n";
    upstream.mock_stream_raw(raw.to_string()).await;
    let server = test_server(&upstream.uri(), Some(TEST_API_KEY));

    let response = server
        .post("/api/chat")
        .json(&json!({
            "messages": [ { "role": "user", "content": "hi" } ],
            "stream": true
        }))
        .await;

    response.assert_status_ok();
    let body = response.text();
    assert!(body.contains(": keep-alive\n\n"));
    assert!(body.contains("event: message\n\n"));
    assert!(!body.contains("data: : keep-alive"));
    assert!(!body.contains("data: event: message"));
    assert!(body.ends_with("data: [DONE]\n\n"));
}

#[tokio::test]
async fn mid_stream_upstream_failure_becomes_one_error_frame() {
    let server = test_server_with_provider(Arc::new(FailingStreamProvider));

    let response = server
        .post("/api/chat")
        .json(&json!({
            "messages": [ { "role": "user", "content": "hi" } ],
            "stream": true
        }))
        .await;

    // Headers were already committed when the upstream died, so the
    // status stays 200 and the failure is signaled in-band
    response.assert_status_ok();
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );

    let body = response.text();
    let error_frame = "data: {\"error\":\"upstream stream failed\"}\n\n";
    assert!(body.starts_with("data: {\"choices\":[{\"delta\":{\"content\":\"par\"}}]}\n\n"));
    assert!(body.ends_with(error_frame));
    assert_eq!(body.matches(error_frame).count(), 1);
    assert!(!body.contains("[DONE]"));
}

#[tokio::test]
async fn streaming_is_the_default_mode() {
    let upstream = MockUpstream::start().await;
    upstream.mock_stream_deltas(&["hi"]).await;
    let server = test_server(&upstream.uri(), Some(TEST_API_KEY));

    // No `stream` field: defaults to streaming
    let response = server
        .post("/api/chat")
        .json(&json!({
            "messages": [ { "role": "user", "content": "hi" } ]
        }))
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );
    let forwarded = upstream.last_request_body().await.expect("upstream call");
    assert_eq!(forwarded["stream"], true);
}
