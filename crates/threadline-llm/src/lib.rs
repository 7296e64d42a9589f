//! LLM client abstractions for OpenAI-compatible and Anthropic APIs.
//!
//! - [`UnifiedLlmClient`] — Recommended: picks the wire format from the provider
//! - [`LlmClient`] — OpenAI-compatible client (OpenAI, Gemini, Ollama)
//! - [`AnthropicClient`] — Claude models via the Messages API
//! - [`ChatModel`] — The seam the agent calls through
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use threadline_core::Message;
//! use threadline_llm::{ChatModel, UnifiedLlmClient};
//!
//! let model = config.resolve_model(|k| std::env::var(k).ok())?;
//! let client = UnifiedLlmClient::new(&model);
//! let reply = client.chat(Some("You are helpful."), &[Message::user("Hello!")]).await?;
//! println!("{}", reply.content);
//! ```

mod anthropic;
mod client;
mod unified;

use async_trait::async_trait;
use threadline_core::{AgentError, Message};

pub use anthropic::AnthropicClient;
pub use client::LlmClient;
pub use unified::UnifiedLlmClient;

/// Token usage and timing metrics from an LLM call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LlmMetrics {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub elapsed_ms: u64,
}

/// Complete response from an LLM call.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub metrics: LlmMetrics,
}

/// A model that answers a conversation with one reply.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Sends `history` (oldest first) after an optional system prompt.
    async fn chat(&self, system_prompt: Option<&str>, history: &[Message]) -> Result<LlmResponse, AgentError>;
}
