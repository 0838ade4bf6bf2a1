// Error types for the gateway pipeline

use thiserror::Error;

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Gateway errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No agent registered under the routed ID.
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    /// Model error from a classifier or agent call.
    #[error("Model error: {0}")]
    Model(#[from] lifelog_abstraction::ModelError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error.
    #[error("Gateway error: {0}")]
    Other(String),
}
