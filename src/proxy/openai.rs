//! OpenAI-compatible upstream client
//!
//! Sends chat-completion requests to any API speaking the OpenAI wire
//! shape (DeepSeek, OpenAI, compatible gateways) with bearer auth.

use async_trait::async_trait;
use axum::http::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use tracing::{debug, error};

use crate::{
    config::Config,
    error::{AppError, AppResult},
    proxy::provider::{ByteStream, ChatProvider},
};

/// Client for an OpenAI-compatible chat-completion API
pub struct OpenAIProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAIProvider {
    /// Create a new provider client.
    ///
    /// `api_key` must already have passed the config's usability check;
    /// the credential gate lives in the route handler, not here.
    pub fn new(client: reqwest::Client, config: &Config, api_key: String) -> Self {
        Self {
            client,
            base_url: config.upstream_api_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Build default headers for upstream requests
    fn default_headers(&self) -> AppResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid API key: {}", e)))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// Turn a non-success upstream response into an error carrying the
    /// upstream status and body.
    async fn upstream_failure(response: reqwest::Response) -> AppError {
        let status = StatusCode::from_u16(response.status().as_u16())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.text().await.unwrap_or_default();
        error!(status = %status, "Upstream chat API returned an error");
        AppError::upstream(status, &body)
    }
}

#[async_trait]
impl ChatProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai-compatible"
    }

    async fn chat_completions(&self, request: &Value) -> AppResult<Value> {
        let url = self.completions_url();
        debug!(url = %url, "Sending non-streaming chat completion request");

        let response = self
            .client
            .post(&url)
            .headers(self.default_headers()?)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::upstream_failure(response).await);
        }

        Ok(response.json().await?)
    }

    async fn chat_completions_stream(&self, request: &Value) -> AppResult<ByteStream> {
        let url = self.completions_url();
        debug!(url = %url, "Opening streaming chat completion request");

        let response = self
            .client
            .post(&url)
            .headers(self.default_headers()?)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::upstream_failure(response).await);
        }

        Ok(Box::pin(response.bytes_stream()))
    }
}
