//! OpenAI-compatible chat client.
//!
//! Works with the OpenAI API and any compatible endpoint, which covers
//! Google's Gemini (`/v1beta/openai`) and Ollama (`/v1`).

use std::time::Instant;

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
    Client,
};
use threadline_core::{AgentError, Message, MessageRole, ModelConfig, Provider};
use tracing::info;

use crate::{LlmMetrics, LlmResponse};

/// Converts any error into an AgentError::LlmError.
fn llm_err(e: impl ToString) -> AgentError {
    AgentError::LlmError(e.to_string())
}

/// Builds the request message list: optional system prompt, then history in order.
fn build_messages(
    system_prompt: Option<&str>,
    history: &[Message],
) -> Result<Vec<ChatCompletionRequestMessage>, AgentError> {
    let mut messages = Vec::with_capacity(history.len() + 1);

    if let Some(prompt) = system_prompt {
        messages.push(ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(llm_err)?,
        ));
    }

    for msg in history {
        let role_msg = match msg.role {
            MessageRole::User => ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(&*msg.content)
                    .build()
                    .map_err(llm_err)?,
            ),
            MessageRole::Assistant => ChatCompletionRequestMessage::Assistant(
                ChatCompletionRequestAssistantMessageArgs::default()
                    .content(&*msg.content)
                    .build()
                    .map_err(llm_err)?,
            ),
        };
        messages.push(role_msg);
    }

    Ok(messages)
}

/// Extracts content and metrics from a completion response.
fn extract_response(response: CreateChatCompletionResponse, elapsed_ms: u64) -> Result<LlmResponse, AgentError> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| AgentError::LlmError("No response content".into()))?;

    let (input_tokens, output_tokens) = response
        .usage
        .map(|u| (u.prompt_tokens, u.completion_tokens))
        .unwrap_or((0, 0));

    info!(
        "LLM: {}ms, tokens: {}/{} (in/out)",
        elapsed_ms, input_tokens, output_tokens
    );

    Ok(LlmResponse {
        content,
        metrics: LlmMetrics { input_tokens, output_tokens, elapsed_ms },
    })
}

/// Client for OpenAI-compatible chat completion APIs.
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmClient {
    /// Creates a client for the given model selection.
    pub fn new(config: &ModelConfig) -> Self {
        // Ollama ignores the key but the SDK always sends one.
        let api_key = match (config.provider, &config.api_key) {
            (_, Some(key)) => key.clone(),
            (Provider::Ollama, None) => "ollama".to_string(),
            (_, None) => String::new(),
        };

        let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base) = &config.api_base {
            openai_config = openai_config.with_api_base(base.trim_end_matches('/'));
        }

        Self {
            client: Client::with_config(openai_config),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// Sends the conversation and returns the complete reply.
    pub async fn chat(&self, system_prompt: Option<&str>, history: &[Message]) -> Result<LlmResponse, AgentError> {
        let start = Instant::now();
        let messages = build_messages(system_prompt, history)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .max_completion_tokens(self.max_tokens)
            .build()
            .map_err(llm_err)?;

        let response = self.client.chat().create(request).await.map_err(llm_err)?;
        extract_response(response, start.elapsed().as_millis() as u64)
    }
}
