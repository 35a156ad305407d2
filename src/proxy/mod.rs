//! Upstream chat-completion API access
//!
//! The relay talks to one OpenAI-compatible upstream. The `ChatProvider`
//! trait is the seam that lets tests point the relay at a stub server.

pub mod openai;
pub mod provider;

pub use openai::OpenAIProvider;
pub use provider::{ByteStream, ChatProvider};
