//! Prebuilt conversational agent: one model call per invocation, no tools.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use threadline_core::{AgentError, FinalState, Message, MessageRole};
use threadline_llm::ChatModel;
use tracing::{debug, info};

use crate::checkpoint::{Checkpointer, ThreadMessage};
use crate::{Agent, AgentInput, RunConfig};

/// Answers each input against the thread's stored history.
pub struct ChatAgent {
    model: Arc<dyn ChatModel>,
    checkpointer: Arc<dyn Checkpointer>,
    system_prompt: Option<String>,
    max_history: Option<usize>,
}

impl ChatAgent {
    pub fn new(model: Arc<dyn ChatModel>, checkpointer: Arc<dyn Checkpointer>) -> Self {
        Self {
            model,
            checkpointer,
            system_prompt: None,
            max_history: None,
        }
    }

    /// Sets the system prompt sent ahead of every conversation.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Limits how many recent messages are sent to the model.
    pub fn with_max_history(mut self, max: usize) -> Self {
        self.max_history = Some(max);
        self
    }
}

/// One history entry as it appears in the final state.
#[derive(Debug, Serialize)]
struct StateMessage<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    content: &'a str,
}

impl<'a> From<&'a ThreadMessage> for StateMessage<'a> {
    fn from(msg: &'a ThreadMessage) -> Self {
        let kind = match msg.role {
            MessageRole::User => "human",
            MessageRole::Assistant => "ai",
        };
        Self { id: &msg.id, kind, content: &msg.content }
    }
}

/// Returns the tail of `history` sent as context.
///
/// The window never opens on an assistant turn, since providers expect the
/// conversation to start with a user message.
fn context_window(history: &[ThreadMessage], max: Option<usize>) -> &[ThreadMessage] {
    let mut start = max.map_or(0, |m| history.len().saturating_sub(m));
    while start < history.len() && history[start].role == MessageRole::Assistant {
        start += 1;
    }
    &history[start..]
}

#[async_trait]
impl Agent for ChatAgent {
    async fn invoke(&self, input: AgentInput, config: &RunConfig) -> Result<FinalState, AgentError> {
        if input.messages.is_empty() {
            return Err(AgentError::InvalidInput("no input messages".into()));
        }

        let thread_id = &config.thread_id;
        let mut history = self.checkpointer.load(thread_id).await?;
        debug!("Thread {} has {} stored messages", thread_id, history.len());

        let mut pending: Vec<ThreadMessage> = input.messages.into_iter().map(ThreadMessage::new).collect();
        history.extend(pending.iter().cloned());

        let context: Vec<Message> = context_window(&history, self.max_history)
            .iter()
            .map(ThreadMessage::to_message)
            .collect();

        let reply = self.model.chat(self.system_prompt.as_deref(), &context).await?;
        info!(
            "Thread {}: replied in {}ms ({} context messages)",
            thread_id,
            reply.metrics.elapsed_ms,
            context.len()
        );

        let reply = ThreadMessage::new(Message::assistant(reply.content));
        pending.push(reply.clone());
        self.checkpointer.append(thread_id, &pending).await?;
        history.push(reply);

        let messages: Vec<StateMessage<'_>> = history.iter().map(StateMessage::from).collect();
        Ok(FinalState::from(serde_json::json!({ "messages": messages })))
    }
}
