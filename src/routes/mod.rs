//! HTTP routes for the chat relay
//!
//! This module defines all HTTP endpoints exposed by the relay server.

pub mod chat;
pub mod health;
pub mod system_prompt;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    // The original front end is served from the same origin in production,
    // but the API stays permissive for local development setups.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(chat::chat))
        .route("/api/system-prompt", get(system_prompt::system_prompt))
        .route("/health", get(health::health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
