//! Anthropic Claude Messages API client.

use std::time::Instant;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use threadline_core::{AgentError, Message, MessageRole, ModelConfig};
use tracing::info;

use crate::{LlmMetrics, LlmResponse};

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<AnthropicMessage<'a>>,
    stream: bool,
}

#[derive(Deserialize, Default)]
struct Usage {
    input_tokens: Option<u32>,
    output_tokens: Option<u32>,
}

/// A content block in the response. Only text blocks contribute to the reply.
#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct NonStreamResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Usage,
}

/// Client for Anthropic's Claude API.
pub struct AnthropicClient {
    client: Client,
    messages_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
}

impl AnthropicClient {
    /// Creates a new Anthropic client for the given model selection.
    pub fn new(config: &ModelConfig) -> Self {
        let base = config
            .api_base
            .as_deref()
            .unwrap_or(ANTHROPIC_API_BASE)
            .trim_end_matches('/');
        let api_key = config.api_key.clone().unwrap_or_default();
        info!("AnthropicClient: model={}, api_key_len={}", config.model, api_key.len());

        Self {
            client: Client::new(),
            messages_url: format!("{}/messages", base),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// Sends the conversation and returns the complete reply.
    pub async fn chat(&self, system_prompt: Option<&str>, history: &[Message]) -> Result<LlmResponse, AgentError> {
        let start = Instant::now();

        let messages = history
            .iter()
            .map(|msg| AnthropicMessage {
                role: match msg.role {
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                },
                content: &msg.content,
            })
            .collect();

        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: system_prompt,
            messages,
            stream: false,
        };

        let response = self
            .client
            .post(&self.messages_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::LlmError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::LlmError(format!(
                "Anthropic API error {}: {}",
                status, body
            )));
        }

        let resp: NonStreamResponse = response
            .json()
            .await
            .map_err(|e| AgentError::ParseError(e.to_string()))?;

        let content = resp
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        let metrics = LlmMetrics {
            input_tokens: resp.usage.input_tokens.unwrap_or(0),
            output_tokens: resp.usage.output_tokens.unwrap_or(0),
            elapsed_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            "LLM: {}ms, tokens: {}/{} (in/out)",
            metrics.elapsed_ms, metrics.input_tokens, metrics.output_tokens
        );

        Ok(LlmResponse { content, metrics })
    }
}
