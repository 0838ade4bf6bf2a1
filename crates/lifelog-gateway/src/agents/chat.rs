//! Chat agent implementation.
//!
//! This agent maintains conversation context across multiple interactions.

use crate::{Agent, AgentContext, AgentOutput};
use async_trait::async_trait;
use lifelog_abstraction::{ChatMessage, ModelError};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

const SYSTEM_PROMPT: &str = "You are a friendly life-logging assistant. Answer questions about \
the user's logged events and hold general conversation.";

/// A chat agent that maintains conversation context.
#[derive(Debug)]
pub struct ChatAgent {
    /// The agent's unique ID.
    id: String,
    /// The agent's description.
    description: String,
    /// Conversation history.
    history: Arc<RwLock<Vec<ChatMessage>>>,
    /// Maximum number of messages to keep in history.
    max_history: usize,
}

impl ChatAgent {
    /// Creates a new `ChatAgent` with the given ID.
    ///
    /// # Arguments
    /// * `id` - The agent ID
    #[must_use]
    pub fn new(id: String) -> Self {
        Self {
            id,
            description: "Answers questions and holds general conversation".to_string(),
            history: Arc::new(RwLock::new(Vec::new())),
            max_history: 100,
        }
    }

    /// Creates a new `ChatAgent` with a custom maximum history size.
    ///
    /// # Arguments
    /// * `id` - The agent ID
    /// * `max_history` - Maximum number of messages to keep in history
    #[must_use]
    pub fn with_max_history(id: String, max_history: usize) -> Self {
        Self {
            id,
            description: "Answers questions and holds general conversation".to_string(),
            history: Arc::new(RwLock::new(Vec::new())),
            max_history,
        }
    }

    /// Clears the conversation history.
    pub async fn clear_history(&self) {
        let mut history = self.history.write().await;
        history.clear();
        debug!(agent_id = %self.id, "ChatAgent history cleared");
    }

    /// Returns the current conversation history length.
    pub async fn history_len(&self) -> usize {
        let history = self.history.read().await;
        history.len()
    }
}

#[async_trait]
impl Agent for ChatAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(
        &self,
        input: &str,
        context: AgentContext<'_>,
    ) -> Result<AgentOutput, ModelError> {
        let history_len = self.history_len().await;
        debug!(
            agent_id = %self.id,
            input_len = input.len(),
            history_len = history_len,
            "ChatAgent executing"
        );

        // Add user message to history
        let mut history = self.history.write().await;
        history.push(ChatMessage::user(input));

        let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT)];
        messages.extend(history.iter().cloned());
        drop(history); // Release lock before async operation

        let response =
            context.model.generate_chat_completion(&messages, None).await.map_err(|e| {
                error!(agent_id = %self.id, error = %e, "Model generation failed");
                e
            })?;

        // Add assistant response to history and trim if necessary
        let mut history = self.history.write().await;
        history.push(ChatMessage::assistant(response.content.clone()));

        // Keep most recent messages
        if history.len() > self.max_history {
            let excess = history.len() - self.max_history;
            history.drain(..excess);
            warn!(
                agent_id = %self.id,
                trimmed = excess,
                "ChatAgent history trimmed"
            );
        }

        debug!(
            agent_id = %self.id,
            response_len = response.content.len(),
            history_len = history.len(),
            "ChatAgent completed"
        );

        Ok(AgentOutput::Text(response.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageContext;
    use lifelog_models::MockModel;

    #[tokio::test]
    async fn test_chat_agent_execution() {
        let agent = ChatAgent::new("chat".to_string());
        let model = MockModel::new("mock-model".to_string());
        let message = MessageContext::new("user-1", 1, "telegram");

        let context = AgentContext { model: &model, message: &message, classification: None };
        let result = agent.execute("Hello!", context).await;
        assert!(result.is_ok());
        assert_eq!(agent.history_len().await, 2); // user + assistant

        let context = AgentContext { model: &model, message: &message, classification: None };
        let result = agent.execute("What did I say?", context).await;
        assert!(result.is_ok());
        assert_eq!(agent.history_len().await, 4);
    }

    #[tokio::test]
    async fn test_chat_agent_clear_history() {
        let agent = ChatAgent::new("chat".to_string());
        let model = MockModel::new("mock-model".to_string());
        let message = MessageContext::new("user-1", 1, "telegram");

        let context = AgentContext { model: &model, message: &message, classification: None };
        agent.execute("Hello!", context).await.unwrap();
        assert_eq!(agent.history_len().await, 2);

        agent.clear_history().await;
        assert_eq!(agent.history_len().await, 0);
    }

    #[tokio::test]
    async fn test_chat_agent_max_history() {
        let agent = ChatAgent::with_max_history("chat".to_string(), 4);
        let model = MockModel::new("mock-model".to_string());
        let message = MessageContext::new("user-1", 1, "telegram");

        for i in 0..5 {
            let context = AgentContext { model: &model, message: &message, classification: None };
            agent.execute(&format!("Message {}", i), context).await.unwrap();
        }

        // Each execute adds 2 messages (user + assistant); trimmed to 4.
        assert_eq!(agent.history_len().await, 4);
    }
}
