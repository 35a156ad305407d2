//! Configuration management for the chat relay
//!
//! Configuration is loaded from environment variables; the system prompt
//! is loaded from an optional file on disk.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::env;
use std::path::Path;

/// Fallback system prompt used when no prompt file is configured.
/// The client uses the same string when `/api/system-prompt` is unreachable.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a professional, friendly AI assistant. Answer clearly and concisely.";

/// Shown in place of an assistant reply that arrived empty.
pub const EMPTY_REPLY_PLACEHOLDER: &str = "(no reply received)";

/// Text an unedited sample config would still contain in the key slot.
static PLACEHOLDER_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"replace-me|your-api-key").expect("valid regex"));

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Upstream chat-completion API base URL
    pub upstream_api_url: String,
    /// Upstream bearer credential (may be absent or a sample placeholder)
    pub upstream_api_key: Option<String>,
    /// Model name sent with every upstream request
    pub upstream_model: String,
    /// Upstream request timeout in seconds
    pub upstream_timeout_seconds: u64,

    /// System prompt served to clients at session start
    pub system_prompt: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let prompt_path = env::var("SYSTEM_PROMPT_PATH")
            .unwrap_or_else(|_| "config/systemprompt.md".to_string());

        Ok(Self {
            host: env::var("CHAT_RELAY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("CHAT_RELAY_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("Invalid CHAT_RELAY_PORT")?,

            upstream_api_url: env::var("UPSTREAM_API_URL")
                .unwrap_or_else(|_| "https://api.deepseek.com/v1".to_string()),
            upstream_api_key: env::var("UPSTREAM_API_KEY").ok(),
            upstream_model: env::var("UPSTREAM_MODEL")
                .unwrap_or_else(|_| "deepseek-chat".to_string()),
            // Generous: the same client serves streaming responses, and the
            // timeout spans the whole exchange.
            upstream_timeout_seconds: env::var("UPSTREAM_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("Invalid UPSTREAM_TIMEOUT_SECONDS")?,

            system_prompt: load_system_prompt(&prompt_path),
        })
    }

    /// Returns the credential if it is actually usable: present, non-blank,
    /// and not the sample-config placeholder.
    pub fn usable_api_key(&self) -> Option<&str> {
        self.upstream_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && !PLACEHOLDER_KEY.is_match(key))
    }
}

/// Read the system prompt file, falling back to the built-in default.
fn load_system_prompt(path: &str) -> String {
    match std::fs::read_to_string(Path::new(path)) {
        Ok(contents) => {
            let trimmed = contents.trim();
            if trimmed.is_empty() {
                DEFAULT_SYSTEM_PROMPT.to_string()
            } else {
                trimmed.to_string()
            }
        }
        Err(_) => DEFAULT_SYSTEM_PROMPT.to_string(),
    }
}
