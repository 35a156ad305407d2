//! Stream chat client
//!
//! The counterpart of the relay server: holds an explicit conversation
//! session, issues chat requests with streaming enabled, incrementally
//! decodes the relayed SSE stream, and hands the complete reply to the
//! caller exactly once. Nothing is rendered mid-stream.

pub mod decoder;

use futures::StreamExt;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::config::{DEFAULT_SYSTEM_PROMPT, EMPTY_REPLY_PLACEHOLDER};
use crate::routes::chat::{ConversationTurn, Role};

pub use decoder::StreamAccumulator;

/// Fixed, non-technical reply rendered in the conversation when an
/// exchange fails. Raw errors go to the status line and the log only.
pub const FAILURE_FALLBACK_REPLY: &str =
    "Sorry, the chat service could not be reached. Please try again later.";

/// Phase of one chat exchange.
///
/// `Streaming` is only entered after response headers indicate success;
/// any transport error while streaming moves to `Failed`, never to a
/// partial render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangePhase {
    Idle,
    Sending,
    Streaming,
    Rendering,
    Failed,
}

/// Rendering pipeline contract: receives the complete assistant text once
/// per exchange. Markdown/diagram/math handling lives behind this seam.
pub trait Renderer {
    fn render(&mut self, content: &str);
}

/// Errors surfaced by the chat client
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("chat request failed ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// One conversation's ordered, append-only turn history.
///
/// An explicit object rather than ambient state, so independent sessions
/// can coexist; the system turn is injected once at construction.
#[derive(Debug, Clone)]
pub struct ChatSession {
    turns: Vec<ConversationTurn>,
}

impl ChatSession {
    /// Start a session seeded with the system prompt
    pub fn new(system_prompt: &str) -> Self {
        Self {
            turns: vec![ConversationTurn {
                role: Role::System,
                content: system_prompt.to_string(),
            }],
        }
    }

    /// Append a user turn
    pub fn push_user(&mut self, content: &str) {
        self.turns.push(ConversationTurn {
            role: Role::User,
            content: content.to_string(),
        });
    }

    /// Append an assistant turn
    pub fn push_assistant(&mut self, content: &str) {
        self.turns.push(ConversationTurn {
            role: Role::Assistant,
            content: content.to_string(),
        });
    }

    /// The ordered turn history
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }
}

/// HTTP client for the relay server
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
}

impl ChatClient {
    /// Create a client for a relay at `base_url`
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the configured system prompt, falling back to the built-in
    /// default on any failure.
    pub async fn fetch_system_prompt(&self) -> String {
        let url = format!("{}/api/system-prompt", self.base_url);
        let fetched = async {
            let response = self.client.get(&url).send().await.ok()?;
            let body: Value = response.json().await.ok()?;
            body.get("systemPrompt")
                .and_then(Value::as_str)
                .map(str::to_string)
        }
        .await;

        fetched.unwrap_or_else(|| {
            debug!("System prompt fetch failed; using built-in default");
            DEFAULT_SYSTEM_PROMPT.to_string()
        })
    }

    /// Send the session's history and return the complete assistant reply.
    pub async fn send_chat(&self, session: &ChatSession) -> Result<String, ClientError> {
        self.send_chat_observed(session, |_| {}).await
    }

    /// Like [`send_chat`](Self::send_chat), reporting each phase transition
    /// to `on_phase` so a front end can drive its status line.
    pub async fn send_chat_observed(
        &self,
        session: &ChatSession,
        mut on_phase: impl FnMut(ExchangePhase),
    ) -> Result<String, ClientError> {
        let url = format!("{}/api/chat", self.base_url);

        on_phase(ExchangePhase::Sending);
        let response = match self
            .client
            .post(&url)
            .json(&json!({ "messages": session.turns(), "stream": true }))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                on_phase(ExchangePhase::Failed);
                return Err(e.into());
            }
        };

        let status = response.status();
        if !status.is_success() {
            // Prefer the server's { "error": ... } body, else the status text
            let message = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|body| {
                    body.get("error")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            on_phase(ExchangePhase::Failed);
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        // Headers committed successfully: now streaming
        on_phase(ExchangePhase::Streaming);
        let mut body = response.bytes_stream();
        let mut accumulator = StreamAccumulator::new();

        // The read loop drains the transport even after the terminal token;
        // the accumulator ignores whatever follows it.
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => accumulator.feed(&bytes),
                Err(e) => {
                    on_phase(ExchangePhase::Failed);
                    return Err(e.into());
                }
            }
        }

        if accumulator.parse_failures() > 0 {
            debug!(
                count = %accumulator.parse_failures(),
                "Some stream frames were dropped as unparsable"
            );
        }

        let text = accumulator.finish();
        on_phase(ExchangePhase::Rendering);
        if text.trim().is_empty() {
            Ok(EMPTY_REPLY_PLACEHOLDER.to_string())
        } else {
            Ok(text)
        }
    }
}
