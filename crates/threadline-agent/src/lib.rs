//! Conversational agent and the client handle the server calls it through.
//!
//! - [`Agent`] — The invocation contract: `invoke({messages}, {thread_id})`
//! - [`ChatAgent`] — Prebuilt agent backed by an LLM and a checkpointer
//! - [`Checkpointer`] — Per-thread history storage ([`MemoryCheckpointer`], [`SqliteCheckpointer`])
//! - [`AgentClient`] — Configured once at startup, shared by every request
//!
//! # Example
//!
//! ```rust,ignore
//! use threadline_agent::AgentClient;
//! use threadline_config::Config;
//!
//! let config = Config::load_from_env()?;
//! let model = config.resolve_model(|k| std::env::var(k).ok())?;
//! let client = AgentClient::from_config(&config, &model)?;
//!
//! let state = client.invoke("hello", "thread-1").await?;
//! println!("{}", serde_json::to_string_pretty(&state)?);
//! ```

mod chat_agent;
mod checkpoint;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use threadline_config::Config;
use threadline_core::{AgentError, FinalState, Message, ModelConfig, ThreadId};
use threadline_llm::UnifiedLlmClient;
use tracing::info;

pub use chat_agent::ChatAgent;
pub use checkpoint::{build_checkpointer, Checkpointer, MemoryCheckpointer, SqliteCheckpointer, ThreadMessage};

/// Messages handed to the agent for one invocation.
#[derive(Debug, Clone)]
pub struct AgentInput {
    pub messages: Vec<Message>,
}

/// Per-invocation settings; the thread id selects conversational memory.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub thread_id: ThreadId,
}

/// A conversational agent that keeps history per thread.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Processes `input` in the context of `config.thread_id` and returns the
    /// agent's final state.
    async fn invoke(&self, input: AgentInput, config: &RunConfig) -> Result<FinalState, AgentError>;
}

/// Handle to the configured agent.
///
/// Immutable after construction; share it behind an `Arc`.
pub struct AgentClient {
    agent: Arc<dyn Agent>,
    timeout: Duration,
}

impl AgentClient {
    pub fn new(agent: Arc<dyn Agent>, timeout: Duration) -> Self {
        Self { agent, timeout }
    }

    /// Builds the LLM client, checkpointer and agent described by `config`.
    pub fn from_config(config: &Config, model: &ModelConfig) -> Result<Self, AgentError> {
        if let Some(name) = config.tools.enabled.first() {
            return Err(AgentError::Initialization(format!("unknown tool '{}': no tools are registered", name)));
        }
        if config.agent.timeout_secs == 0 {
            return Err(AgentError::Initialization("agent.timeout_secs must be greater than 0".into()));
        }
        if config.agent.max_history == Some(0) {
            return Err(AgentError::Initialization("agent.max_history must be greater than 0".into()));
        }

        let checkpointer = build_checkpointer(&config.checkpoint_strategy())?;
        let llm = UnifiedLlmClient::new(model);
        let wire = if llm.is_anthropic() { "messages API" } else { "chat completions" };
        info!("Agent model: {} ({}, {})", llm.model(), llm.provider(), wire);

        let mut agent = ChatAgent::new(Arc::new(llm), checkpointer);
        if let Some(prompt) = &config.agent.system_prompt {
            agent = agent.with_system_prompt(prompt.clone());
        }
        if let Some(max) = config.agent.max_history {
            agent = agent.with_max_history(max);
        }

        Ok(Self::new(Arc::new(agent), config.agent.timeout()))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends one user message on `thread_id`.
    ///
    /// The call is abandoned after the configured timeout; dropping it cancels
    /// the outstanding provider request.
    pub async fn invoke(&self, message: &str, thread_id: &str) -> Result<FinalState, AgentError> {
        let input = AgentInput { messages: vec![Message::user(message)] };
        let config = RunConfig { thread_id: ThreadId::from(thread_id) };

        tokio::time::timeout(self.timeout, self.agent.invoke(input, &config))
            .await
            .map_err(|_| AgentError::Timeout(self.timeout))?
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use threadline_config::CheckpointType;
    use threadline_core::{MessageRole, Provider};

    use super::*;

    struct RecordingAgent {
        seen: Mutex<Vec<(Vec<Message>, ThreadId)>>,
    }

    #[async_trait]
    impl Agent for RecordingAgent {
        async fn invoke(&self, input: AgentInput, config: &RunConfig) -> Result<FinalState, AgentError> {
            self.seen
                .lock()
                .unwrap()
                .push((input.messages, config.thread_id.clone()));
            Ok(FinalState::from(serde_json::json!({ "ok": true })))
        }
    }

    struct StalledAgent;

    #[async_trait]
    impl Agent for StalledAgent {
        async fn invoke(&self, _input: AgentInput, _config: &RunConfig) -> Result<FinalState, AgentError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(FinalState::from(serde_json::Value::Null))
        }
    }

    fn ollama_model() -> ModelConfig {
        ModelConfig {
            provider: Provider::Ollama,
            model: "llama3.2".into(),
            api_base: Some("http://localhost:11434/v1".into()),
            api_key: None,
            temperature: 0.7,
            max_tokens: 1000,
        }
    }

    #[tokio::test]
    async fn invoke_sends_single_user_message_on_thread() {
        let agent = Arc::new(RecordingAgent { seen: Mutex::new(vec![]) });
        let client = AgentClient::new(agent.clone(), Duration::from_secs(5));

        let state = client.invoke("hello", "t1").await.unwrap();
        assert_eq!(state.as_value(), &serde_json::json!({ "ok": true }));

        let seen = agent.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, vec![Message { role: MessageRole::User, content: "hello".into() }]);
        assert_eq!(seen[0].1, ThreadId::from("t1"));
    }

    #[tokio::test]
    async fn invoke_times_out() {
        let client = AgentClient::new(Arc::new(StalledAgent), Duration::from_millis(20));
        let err = client.invoke("hello", "t1").await.unwrap_err();
        assert!(matches!(err, AgentError::Timeout(d) if d == Duration::from_millis(20)));
    }

    #[test]
    fn from_config_rejects_enabled_tools() {
        let mut config = Config::default();
        config.tools.enabled = vec!["web_search".into()];
        let err = AgentClient::from_config(&config, &ollama_model()).err().unwrap();
        assert!(err.to_string().contains("web_search"));
    }

    #[test]
    fn from_config_rejects_zero_limits() {
        let mut config = Config::default();
        config.agent.timeout_secs = 0;
        assert!(AgentClient::from_config(&config, &ollama_model()).is_err());

        let mut config = Config::default();
        config.agent.max_history = Some(0);
        assert!(AgentClient::from_config(&config, &ollama_model()).is_err());
    }

    #[test]
    fn from_config_builds_with_sqlite_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.checkpoint.kind = CheckpointType::Sqlite;
        config.checkpoint.sqlite.path = dir.path().join("threads.db");
        config.agent.timeout_secs = 7;

        let client = AgentClient::from_config(&config, &ollama_model()).unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(7));
        assert!(dir.path().join("threads.db").exists());
    }
}
