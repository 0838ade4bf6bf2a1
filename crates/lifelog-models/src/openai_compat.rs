//! OpenAI-compatible model implementation.
//!
//! This module implements the `Model` trait for any server that speaks the
//! OpenAI Chat Completions API: the hosted OpenAI service, vLLM, LocalAI,
//! LM Studio, Ollama, and so on.
//!
//! # Constructor Patterns
//!
//! - `new()` - Loads the API key from the `LIFELOG_MODEL_API_KEY` or
//!   `OPENAI_API_KEY` environment variable
//! - `with_api_key()` - Explicit API key for authenticated servers
//! - `without_auth()` - No authentication (common for local servers)

use async_trait::async_trait;
use lifelog_abstraction::{
    ChatMessage, Model, ModelError, ModelParameters, ModelResponse, ModelUsage,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{debug, error};

/// OpenAI-compatible model implementation.
#[derive(Debug, Clone)]
pub struct OpenAiCompatModel {
    /// The model identifier (e.g., "gpt-4o-mini", "llama-3-8b").
    model_id: String,
    /// Base URL for the API endpoint (e.g., "https://api.openai.com/v1").
    base_url: String,
    /// Optional API key (some local servers don't require auth).
    api_key: Option<String>,
    /// HTTP client for requests.
    client: Client,
}

impl OpenAiCompatModel {
    /// Creates a new `OpenAiCompatModel` with the given model ID and base URL.
    ///
    /// The API key is loaded from the `LIFELOG_MODEL_API_KEY` or
    /// `OPENAI_API_KEY` environment variable.
    ///
    /// # Arguments
    /// * `model_id` - The model identifier
    /// * `base_url` - The base URL for the API endpoint
    ///
    /// # Errors
    /// Returns a `ModelError` if neither environment variable is set. For
    /// servers that don't require authentication, use `without_auth()`.
    pub fn new(model_id: String, base_url: String) -> Result<Self, ModelError> {
        let api_key = env::var("LIFELOG_MODEL_API_KEY")
            .or_else(|_| env::var("OPENAI_API_KEY"))
            .map_err(|_| {
                ModelError::UnsupportedModelProvider(
                    "Neither LIFELOG_MODEL_API_KEY nor OPENAI_API_KEY environment variable is set. \
                     Use without_auth() for servers that don't require authentication."
                        .to_string(),
                )
            })?;

        Ok(Self {
            model_id,
            base_url,
            api_key: Some(api_key),
            client: Client::builder().timeout(Duration::from_secs(60)).build().map_err(|e| {
                ModelError::RequestError(format!("Failed to create HTTP client: {}", e))
            })?,
        })
    }

    /// Creates a new `OpenAiCompatModel` with an explicit API key.
    ///
    /// # Arguments
    /// * `model_id` - The model identifier
    /// * `base_url` - The base URL for the API endpoint
    /// * `api_key` - The API key for authentication
    #[must_use]
    pub fn with_api_key(model_id: String, base_url: String, api_key: String) -> Self {
        Self {
            model_id,
            base_url,
            api_key: Some(api_key),
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Creates a new `OpenAiCompatModel` without authentication.
    ///
    /// Use this constructor for local servers that don't require API keys.
    ///
    /// # Arguments
    /// * `model_id` - The model identifier
    /// * `base_url` - The base URL for the API endpoint
    #[must_use]
    pub fn without_auth(model_id: String, base_url: String) -> Self {
        Self {
            model_id,
            base_url,
            api_key: None,
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Maps a non-success HTTP status to a `ModelError`.
    fn map_error_status(status: reqwest::StatusCode, error_text: String) -> ModelError {
        // Authentication errors
        if status == 401 || status == 403 {
            return ModelError::UnsupportedModelProvider(format!(
                "Authentication failed ({}): {}",
                status, error_text
            ));
        }

        // Quota / upstream rate limit errors
        if status == 402 || status == 429 {
            return ModelError::QuotaExceeded {
                provider: "openai-compat".to_string(),
                message: Some(error_text),
            };
        }

        // Server errors
        if (500..=599).contains(&status.as_u16()) {
            return ModelError::ModelResponseError(format!(
                "Server error ({}): {}",
                status, error_text
            ));
        }

        // Other errors (400, 404, etc.)
        ModelError::ModelResponseError(format!("API error ({}): {}", status, error_text))
    }
}

#[async_trait]
impl Model for OpenAiCompatModel {
    async fn generate_text(
        &self,
        prompt: &str,
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ModelError> {
        debug!(
            model_id = %self.model_id,
            prompt_len = prompt.len(),
            "OpenAiCompatModel generating text"
        );

        // Convert single prompt to chat format
        let messages = vec![ChatMessage::user(prompt)];
        self.generate_chat_completion(&messages, parameters).await
    }

    async fn generate_chat_completion(
        &self,
        messages: &[ChatMessage],
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ModelError> {
        debug!(
            model_id = %self.model_id,
            message_count = messages.len(),
            parameters = ?parameters,
            "OpenAiCompatModel generating chat completion"
        );

        let url = format!("{}/chat/completions", self.base_url);

        let wire_messages: Vec<WireMessage> = messages
            .iter()
            .map(|msg| WireMessage { role: msg.role.clone(), content: msg.content.clone() })
            .collect();

        let mut request_body = WireRequest {
            model: self.model_id.clone(),
            messages: wire_messages,
            temperature: None,
            top_p: None,
            max_tokens: None,
            stop: None,
        };

        if let Some(params) = parameters {
            request_body.temperature = params.temperature;
            request_body.top_p = params.top_p;
            request_body.max_tokens = params.max_tokens;
            request_body.stop = params.stop_sequences;
        }

        let mut request = self.client.post(&url).json(&request_body);
        if let Some(ref api_key) = self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            error!(error = %e, url = %url, "Failed to send request to OpenAI-compatible API");
            ModelError::RequestError(format!("Network error: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text =
                response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                status = %status,
                error = %error_text,
                url = %url,
                "OpenAI-compatible API returned error status"
            );
            return Err(Self::map_error_status(status, error_text));
        }

        let wire_response: WireResponse = response.json().await.map_err(|e| {
            error!(error = %e, url = %url, "Failed to parse OpenAI-compatible API response");
            ModelError::SerializationError(format!("Failed to parse response: {}", e))
        })?;

        let content = wire_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| {
                ModelError::ModelResponseError("No content in API response".to_string())
            })?;

        let usage = wire_response.usage.map(|u| ModelUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ModelResponse { content, model_id: Some(self.model_id.clone()), usage })
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::struct_field_names)] // Matches API naming
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_api_key_constructor() {
        let model = OpenAiCompatModel::with_api_key(
            "test-model".to_string(),
            "http://localhost:8000/v1".to_string(),
            "test-key".to_string(),
        );
        assert_eq!(model.model_id(), "test-model");
        assert!(model.api_key.is_some());
    }

    #[test]
    fn test_without_auth_constructor() {
        let model = OpenAiCompatModel::without_auth(
            "local-model".to_string(),
            "http://localhost:1234/v1".to_string(),
        );
        assert_eq!(model.model_id(), "local-model");
        assert!(model.api_key.is_none());
    }

    #[test]
    fn test_map_error_status() {
        let err = OpenAiCompatModel::map_error_status(
            reqwest::StatusCode::UNAUTHORIZED,
            "bad key".to_string(),
        );
        assert!(matches!(err, ModelError::UnsupportedModelProvider(_)));

        let err = OpenAiCompatModel::map_error_status(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            "rate limit".to_string(),
        );
        assert!(matches!(err, ModelError::QuotaExceeded { .. }));

        let err = OpenAiCompatModel::map_error_status(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            "boom".to_string(),
        );
        assert!(matches!(err, ModelError::ModelResponseError(_)));
    }

    #[test]
    fn test_request_serialization_skips_unset_fields() {
        let request = WireRequest {
            model: "m".to_string(),
            messages: vec![WireMessage { role: "user".to_string(), content: "hi".to_string() }],
            temperature: None,
            top_p: None,
            max_tokens: Some(64),
            stop: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("max_tokens"));
        assert!(!json.contains("temperature"));
        assert!(!json.contains("stop"));
    }
}
