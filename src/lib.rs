//! chat-relay - streaming chat relay for an OpenAI-compatible API
//!
//! This library provides the relay server (accepts a conversation, forwards
//! it upstream, re-frames the streamed reply as its own SSE stream) and the
//! stream client (issues chat requests and incrementally decodes the SSE
//! reply across chunk boundaries).

pub mod client;
pub mod config;
pub mod error;
pub mod proxy;
pub mod routes;
pub mod streaming;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

pub use crate::client::{ChatClient, ChatSession};
pub use crate::config::Config;
pub use crate::proxy::{ChatProvider, OpenAIProvider};
pub use crate::streaming::SseLineBuffer;

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    pub start_time: Instant,
    /// Upstream provider; `None` while no usable credential is configured,
    /// in which case every `/api/chat` call fails fast.
    pub provider: Option<Arc<dyn ChatProvider>>,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config) -> Result<Self> {
        // HTTP client with connection pooling, shared by all relay requests.
        // The timeout caps the whole exchange, streaming included, matching
        // the transport-level limit the upstream itself enforces.
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(100)
            .timeout(std::time::Duration::from_secs(config.upstream_timeout_seconds))
            .build()?;

        let provider: Option<Arc<dyn ChatProvider>> = config.usable_api_key().map(|key| {
            Arc::new(OpenAIProvider::new(http_client, &config, key.to_string()))
                as Arc<dyn ChatProvider>
        });

        Ok(Self {
            config,
            start_time: Instant::now(),
            provider,
        })
    }
}
