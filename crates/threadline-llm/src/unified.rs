//! Unified LLM client that routes to the appropriate provider.

use async_trait::async_trait;
use threadline_core::{AgentError, Message, ModelConfig, Provider};

use crate::anthropic::AnthropicClient;
use crate::client::LlmClient;
use crate::{ChatModel, LlmResponse};

/// Wire format used for the configured provider.
enum Backend {
    OpenAI(LlmClient),
    Anthropic(AnthropicClient),
}

/// Client that sends requests in the OpenAI or Anthropic format depending on
/// the configured provider. Built once and reused for every call.
pub struct UnifiedLlmClient {
    provider: Provider,
    model: String,
    backend: Backend,
}

impl UnifiedLlmClient {
    /// Creates a new unified client for the resolved model selection.
    pub fn new(config: &ModelConfig) -> Self {
        let backend = match config.provider.is_openai_compatible() {
            true => Backend::OpenAI(LlmClient::new(config)),
            false => Backend::Anthropic(AnthropicClient::new(config)),
        };

        Self {
            provider: config.provider,
            model: config.model.clone(),
            backend,
        }
    }

    /// Returns true if this client is configured for Anthropic.
    pub fn is_anthropic(&self) -> bool {
        matches!(self.backend, Backend::Anthropic(_))
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatModel for UnifiedLlmClient {
    async fn chat(&self, system_prompt: Option<&str>, history: &[Message]) -> Result<LlmResponse, AgentError> {
        match &self.backend {
            Backend::OpenAI(client) => client.chat(system_prompt, history).await,
            Backend::Anthropic(client) => client.chat(system_prompt, history).await,
        }
    }
}
