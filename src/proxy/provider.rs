//! Chat provider abstraction
//!
//! Defines the trait interface for the upstream chat-completion backend.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde_json::Value;
use std::pin::Pin;

use crate::error::AppResult;

/// Stream type for streaming responses from the upstream provider
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// Trait defining the interface to the upstream chat-completion API.
///
/// Implementations MUST authenticate with their own credential and never
/// forward anything from the incoming browser request beyond the payload.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Chat completion (non-streaming): returns the full provider payload.
    async fn chat_completions(&self, request: &Value) -> AppResult<Value>;

    /// Chat completion (streaming): returns the raw SSE byte stream.
    ///
    /// HTTP-level failures surface as errors before any bytes are yielded,
    /// so the caller is still free to answer with a normal error response.
    async fn chat_completions_stream(&self, request: &Value) -> AppResult<ByteStream>;
}
