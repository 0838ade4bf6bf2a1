//! Model implementations for the lifelog gateway.
//!
//! This crate provides concrete implementations of the `Model` trait.
//!
//! # Supported Providers
//!
//! - **Mock**: Testing and offline development
//! - **OpenAI-compatible**: Any server implementing the Chat Completions API
//!   (hosted OpenAI, vLLM, LM Studio, Ollama, etc.)

pub mod factory;
pub mod openai_compat;

use async_trait::async_trait;
use lifelog_abstraction::{
    ChatMessage, Model, ModelError, ModelParameters, ModelResponse, ModelUsage,
};
use tracing::debug;

pub use factory::{ModelConfig, ModelFactory, ModelType};
pub use openai_compat::OpenAiCompatModel;

/// A mock implementation of the `Model` trait for testing and demonstration.
#[derive(Debug, Default)]
pub struct MockModel {
    id: String,
}

impl MockModel {
    /// Creates a new `MockModel` with the given ID.
    #[must_use]
    pub const fn new(id: String) -> Self {
        Self { id }
    }
}

#[async_trait]
impl Model for MockModel {
    async fn generate_text(
        &self,
        prompt: &str,
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ModelError> {
        debug!(
            model_id = %self.id,
            prompt_len = prompt.len(),
            parameters = ?parameters,
            "MockModel generating text"
        );

        let response_content = format!("Mock response for: {prompt}");

        let prompt_tokens = count_tokens(prompt);
        let completion_tokens = count_tokens(&response_content);
        let total_tokens = prompt_tokens + completion_tokens;

        Ok(ModelResponse {
            content: response_content,
            model_id: Some(self.id.clone()),
            usage: Some(ModelUsage { prompt_tokens, completion_tokens, total_tokens }),
        })
    }

    async fn generate_chat_completion(
        &self,
        messages: &[ChatMessage],
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ModelError> {
        debug!(
            model_id = %self.id,
            message_count = messages.len(),
            parameters = ?parameters,
            "MockModel generating chat completion"
        );

        // Echo the last user turn so conversations remain inspectable in tests.
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map_or("", |m| m.content.as_str());

        let response_content = format!("Mock chat response from {}: {last_user}", self.id);

        let prompt_tokens = messages.iter().map(|m| count_tokens(&m.content)).sum::<u32>();
        let completion_tokens = count_tokens(&response_content);
        let total_tokens = prompt_tokens + completion_tokens;

        Ok(ModelResponse {
            content: response_content,
            model_id: Some(self.id.clone()),
            usage: Some(ModelUsage { prompt_tokens, completion_tokens, total_tokens }),
        })
    }

    fn model_id(&self) -> &str {
        &self.id
    }
}

/// Count tokens in a string (simplified: word count).
///
/// For a real implementation, this would use a proper tokenizer.
#[allow(clippy::cast_possible_truncation)]
fn count_tokens(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_model_generate_text() {
        let model = MockModel::new("mock-model".to_string());
        let response = model.generate_text("log coffee 4.50", None).await.unwrap();

        assert!(response.content.contains("log coffee 4.50"));
        assert_eq!(response.model_id, Some("mock-model".to_string()));
        assert!(response.usage.is_some());
    }

    #[tokio::test]
    async fn test_mock_model_chat_echoes_last_user_turn() {
        let model = MockModel::new("mock-model".to_string());
        let messages = vec![
            ChatMessage::system("You are a helpful assistant."),
            ChatMessage::user("first"),
            ChatMessage::assistant("ok"),
            ChatMessage::user("second"),
        ];

        let response = model.generate_chat_completion(&messages, None).await.unwrap();
        assert!(response.content.contains("second"));
        assert!(!response.content.contains("first\n"));
    }

    #[test]
    fn test_count_tokens() {
        assert_eq!(count_tokens(""), 0);
        assert_eq!(count_tokens("one two three"), 3);
    }
}
