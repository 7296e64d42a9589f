//! Core domain types and error definitions for threadline.
//!
//! This crate provides the fundamental types shared across the workspace:
//!
//! - [`AgentError`] — Error type for agent, LLM and storage operations
//! - [`Message`] and [`MessageRole`] — Conversation message types
//! - [`ThreadId`] — Caller-chosen conversation identifier
//! - [`FinalState`] — Opaque result of one agent invocation
//! - [`ModelConfig`] and [`Provider`] — Resolved LLM model selection
//!
//! # Example
//!
//! ```rust
//! use threadline_core::{FinalState, Message, MessageRole, ThreadId};
//!
//! let msg = Message::user("Hello!");
//! assert_eq!(msg.role, MessageRole::User);
//!
//! let thread = ThreadId::from("t1");
//! assert_eq!(thread.as_str(), "t1");
//!
//! let state = FinalState::from(serde_json::json!({ "messages": [] }));
//! assert!(state.as_value().get("messages").is_some());
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while invoking the agent or standing it up.
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM API request failed.
    #[error("LLM request failed: {0}")]
    LlmError(String),

    /// Failed to parse a provider response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Reading or writing thread history failed.
    #[error("Checkpoint storage error: {0}")]
    Storage(String),

    /// The agent was handed input it cannot act on.
    #[error("Invalid agent input: {0}")]
    InvalidInput(String),

    /// The agent did not answer within the configured limit.
    #[error("Agent call timed out after {0:?}")]
    Timeout(Duration),

    /// The agent could not be constructed from its configuration.
    #[error("Agent initialization failed: {0}")]
    Initialization(String),
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::ParseError(err.to_string())
    }
}

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the user.
    User,
    /// Message from the assistant/LLM.
    Assistant,
}

/// A single message in a conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender.
    pub role: MessageRole,
    /// The content of the message.
    pub content: String,
}

impl Message {
    /// Creates a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: MessageRole::User, content: content.into() }
    }

    /// Creates a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: MessageRole::Assistant, content: content.into() }
    }
}

/// Identifier scoping which prior messages form the context of a new one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ThreadId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ThreadId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of one agent invocation.
///
/// The structure is defined by the agent. Callers pass it along without
/// looking inside, so it serializes exactly as the wrapped JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinalState(serde_json::Value);

impl FinalState {
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_inner(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for FinalState {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// Hosted model vendors reachable through the LLM clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Gemini through Google's OpenAI-compatible endpoint.
    #[default]
    Google,
    OpenAI,
    Anthropic,
    /// Local Ollama server through its `/v1` endpoint.
    Ollama,
}

impl Provider {
    /// Endpoint used when the configuration does not name one.
    pub fn default_api_base(&self) -> Option<&'static str> {
        match self {
            Provider::Google => Some("https://generativelanguage.googleapis.com/v1beta/openai"),
            Provider::OpenAI => None,
            Provider::Anthropic => Some("https://api.anthropic.com/v1"),
            Provider::Ollama => Some("http://localhost:11434/v1"),
        }
    }

    /// Environment variable conventionally holding this provider's key.
    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            Provider::Google => "GOOGLE_API_KEY",
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::Ollama => "OLLAMA_API_KEY",
        }
    }

    /// Returns `false` for local servers that accept any key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Provider::Ollama)
    }

    /// Returns `true` if requests go through the OpenAI wire format.
    pub fn is_openai_compatible(&self) -> bool {
        !matches!(self, Provider::Anthropic)
    }
}

impl FromStr for Provider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Self::Google),
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Google => "google",
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        };
        write!(f, "{}", s)
    }
}

/// Fully resolved model selection handed to an LLM client.
#[derive(Clone, PartialEq)]
pub struct ModelConfig {
    /// Vendor serving the model.
    pub provider: Provider,
    /// The model identifier (e.g., "gemini-2.0-flash", "claude-sonnet-4-5").
    pub model: String,
    /// API base URL; `None` means the provider's SDK default.
    pub api_base: Option<String>,
    /// Secret for the provider, already read from the environment.
    pub api_key: Option<String>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

// Keeps the key out of logs.
impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}
