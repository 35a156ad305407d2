//! Chat relay endpoint
//!
//! `POST /api/chat` forwards the conversation to the upstream completion
//! API. Streaming mode re-frames the upstream SSE stream line by line
//! without ever holding the full reply; non-streaming mode waits for the
//! complete upstream payload and answers with a single JSON object.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::{
    config::EMPTY_REPLY_PLACEHOLDER,
    error::AppError,
    proxy::ChatProvider,
    streaming::SseLineBuffer,
    AppState,
};

/// Literal marker the upstream sends when a stream is finished; relayed
/// downstream unchanged.
pub const DONE_TOKEN: &str = "[DONE]";

/// Conversation turn role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message of the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

/// Chat relay request body
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ConversationTurn>,
    #[serde(default = "default_stream")]
    pub stream: bool,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
}

fn default_stream() -> bool {
    true
}

fn default_temperature() -> f64 {
    0.7
}

fn default_top_p() -> f64 {
    0.9
}

/// Non-streaming relay response
#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
    #[serde(rename = "providerResponse")]
    pub provider_response: Value,
}

/// Handle chat relay requests
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, AppError> {
    let start_time = Instant::now();

    if request.messages.is_empty() {
        return Err(AppError::BadRequest(
            "messages must be a non-empty array".to_string(),
        ));
    }

    // Fail fast on a missing or placeholder credential, before any
    // upstream traffic.
    let provider = state
        .provider
        .clone()
        .ok_or(AppError::MissingCredential)?;

    info!(
        model = %state.config.upstream_model,
        stream = %request.stream,
        messages = %request.messages.len(),
        "Processing chat relay request"
    );

    let upstream_request = json!({
        "model": state.config.upstream_model,
        "messages": request.messages,
        "stream": request.stream,
        "temperature": request.temperature,
        "top_p": request.top_p,
    });

    if request.stream {
        handle_streaming_chat(provider, upstream_request).await
    } else {
        handle_non_streaming_chat(provider, upstream_request, start_time).await
    }
}

/// Handle non-streaming relay: one upstream call, one JSON response.
async fn handle_non_streaming_chat(
    provider: Arc<dyn ChatProvider>,
    upstream_request: Value,
    start_time: Instant,
) -> Result<Response, AppError> {
    let provider_response = provider.chat_completions(&upstream_request).await?;

    let content = provider_response
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let reply = if content.is_empty() {
        EMPTY_REPLY_PLACEHOLDER.to_string()
    } else {
        content.to_string()
    };
    let usage = provider_response.get("usage").cloned();

    info!(
        duration_ms = %start_time.elapsed().as_millis(),
        reply_chars = %reply.chars().count(),
        "Chat relay request completed"
    );

    Ok((
        StatusCode::OK,
        Json(ChatReply {
            reply,
            usage,
            provider_response,
        }),
    )
        .into_response())
}

/// Handle streaming relay: re-frame the upstream SSE stream downstream.
///
/// Two-phase commitment: until the provider call returns, failures become
/// ordinary error responses. Once the body below starts, headers are
/// committed and any upstream failure is signaled as one in-band error
/// frame before the stream closes.
async fn handle_streaming_chat(
    provider: Arc<dyn ChatProvider>,
    upstream_request: Value,
) -> Result<Response, AppError> {
    let mut upstream = provider.chat_completions_stream(&upstream_request).await?;

    let relay = async_stream::stream! {
        let mut buffer = SseLineBuffer::new();
        let mut malformed_frames: u64 = 0;

        'read: while let Some(chunk) = upstream.next().await {
            let chunk = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(error = %e, "Upstream stream failed mid-relay");
                    let frame = format!(
                        "data: {}\n\n",
                        json!({ "error": "upstream stream failed" })
                    );
                    yield Ok::<_, std::convert::Infallible>(frame.into_bytes());
                    break 'read;
                }
            };

            for line in buffer.feed(&chunk) {
                let Some(payload) = line.strip_prefix("data: ") else {
                    // Comment and field lines are relayed verbatim
                    yield Ok(format!("{}\n\n", line).into_bytes());
                    continue;
                };
                if payload.is_empty() {
                    continue;
                }
                if payload == DONE_TOKEN {
                    yield Ok(format!("data: {}\n\n", DONE_TOKEN).into_bytes());
                    break 'read;
                }
                if serde_json::from_str::<Value>(payload).is_err() {
                    // Still relayed untouched, but counted for the
                    // end-of-stream log
                    malformed_frames += 1;
                }
                // Pass-through: frame payloads are relayed untouched
                yield Ok(format!("data: {}\n\n", payload).into_bytes());
            }
        }

        if malformed_frames > 0 {
            warn!(count = %malformed_frames, "Relayed frames with unparsable payloads");
        }
        if buffer.has_incomplete() {
            debug!(remaining = %buffer.remaining(), "Upstream stream ended mid-line");
        }
    };

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("X-Accel-Buffering", "no")
        .body(Body::from_stream(relay))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build response: {}", e)))?;

    Ok(response)
}
