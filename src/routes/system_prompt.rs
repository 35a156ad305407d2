//! System prompt endpoint
//!
//! Clients fetch the configured system turn text at session start and fall
//! back to a built-in default if this call fails.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

/// System prompt response
#[derive(Debug, Serialize)]
pub struct SystemPromptResponse {
    #[serde(rename = "systemPrompt")]
    pub system_prompt: String,
}

/// `GET /api/system-prompt`
pub async fn system_prompt(State(state): State<Arc<AppState>>) -> Json<SystemPromptResponse> {
    Json(SystemPromptResponse {
        system_prompt: state.config.system_prompt.clone(),
    })
}
