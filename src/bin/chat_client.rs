//! Terminal chat client
//!
//! Interactive front end for the relay: fetches the system prompt, keeps
//! the conversation in an explicit session, and renders each assistant
//! reply exactly once after its stream completes. The prompt loop is
//! sequential, so only one request is ever in flight.

use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use chat_relay::client::{
    ChatClient, ChatSession, ExchangePhase, Renderer, FAILURE_FALLBACK_REPLY,
};
use chat_relay::config::EMPTY_REPLY_PLACEHOLDER;

/// Renders assistant replies to stdout
struct TerminalRenderer;

impl Renderer for TerminalRenderer {
    fn render(&mut self, content: &str) {
        println!("assistant> {}\n", content);
    }
}

fn status_line(phase: ExchangePhase) {
    let text = match phase {
        ExchangePhase::Idle => "",
        ExchangePhase::Sending => "sending...",
        ExchangePhase::Streaming => "streaming reply...",
        ExchangePhase::Rendering => "",
        ExchangePhase::Failed => "request failed",
    };
    eprint!("\r\x1b[2K{}", text);
    let _ = std::io::stderr().flush();
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_relay=warn".into()),
        )
        .with_target(false)
        .init();

    let base_url =
        std::env::var("CHAT_RELAY_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let client = ChatClient::new(&base_url);
    let system_prompt = client.fetch_system_prompt().await;
    debug!(prompt_chars = %system_prompt.chars().count(), "Session system prompt loaded");

    let mut session = ChatSession::new(&system_prompt);
    let mut renderer = TerminalRenderer;

    println!("Connected to {} (Ctrl+D to quit)", base_url);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let content = line.trim();
        if content.is_empty() {
            continue;
        }

        session.push_user(content);

        match client.send_chat_observed(&session, status_line).await {
            Ok(reply) => {
                status_line(ExchangePhase::Idle);
                if reply != EMPTY_REPLY_PLACEHOLDER {
                    session.push_assistant(&reply);
                }
                renderer.render(&reply);
            }
            Err(e) => {
                // Fixed fallback in the conversation; details on the status line
                eprintln!("\r\x1b[2K{}", e);
                renderer.render(FAILURE_FALLBACK_REPLY);
            }
        }
    }

    Ok(())
}
