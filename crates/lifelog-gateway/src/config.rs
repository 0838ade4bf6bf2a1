//! TOML configuration for the gateway.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading the file.
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("Failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error.
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Gateway configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct GatewayConfig {
    /// Admission control settings.
    #[serde(default)]
    pub rate_limit: RateLimitSection,

    /// Routing and quality-loop settings.
    #[serde(default)]
    pub routing: RoutingSection,

    /// Model provider settings.
    #[serde(default)]
    pub model: ModelSection,
}

/// `[rate_limit]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSection {
    /// Window length in milliseconds.
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    /// Maximum admitted requests per key within the window.
    #[serde(default = "default_limit")]
    pub limit: u32,
}

/// `[routing]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingSection {
    /// Classifications below this confidence route to the chat agent.
    #[serde(default = "default_confidence_floor")]
    pub confidence_floor: f64,
    /// Quality score the review loop aims for.
    #[serde(default = "default_target_quality")]
    pub target_quality: f64,
    /// Maximum refinement iterations of the quality loop.
    #[serde(default = "default_max_quality_iterations")]
    pub max_quality_iterations: u32,
}

/// `[model]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelSection {
    /// Provider name ("mock", "openai", "openai-compat", "local").
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model identifier.
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Optional base URL for OpenAI-compatible servers.
    pub base_url: Option<String>,
}

fn default_window_ms() -> u64 {
    60_000
}

fn default_limit() -> u32 {
    20
}

fn default_confidence_floor() -> f64 {
    0.5
}

fn default_target_quality() -> f64 {
    0.8
}

fn default_max_quality_iterations() -> u32 {
    2
}

fn default_provider() -> String {
    "mock".to_string()
}

fn default_model_id() -> String {
    "mock-model".to_string()
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self { window_ms: default_window_ms(), limit: default_limit() }
    }
}

impl Default for RoutingSection {
    fn default() -> Self {
        Self {
            confidence_floor: default_confidence_floor(),
            target_quality: default_target_quality(),
            max_quality_iterations: default_max_quality_iterations(),
        }
    }
}

impl Default for ModelSection {
    fn default() -> Self {
        Self { provider: default_provider(), model_id: default_model_id(), base_url: None }
    }
}

const VALID_PROVIDERS: [&str; 5] = ["mock", "openai", "openai-compat", "openai-compatible", "local"];

impl GatewayConfig {
    /// Loads gateway configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed, or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: GatewayConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns error if any setting is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.rate_limit.window_ms == 0 {
            return Err(ConfigError::Validation(
                "rate_limit.window_ms must be greater than 0".to_string(),
            ));
        }
        if self.rate_limit.limit == 0 {
            return Err(ConfigError::Validation(
                "rate_limit.limit must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.routing.confidence_floor) {
            return Err(ConfigError::Validation(format!(
                "routing.confidence_floor must be in [0.0, 1.0], got {}",
                self.routing.confidence_floor
            )));
        }
        if !(0.0..=1.0).contains(&self.routing.target_quality) {
            return Err(ConfigError::Validation(format!(
                "routing.target_quality must be in [0.0, 1.0], got {}",
                self.routing.target_quality
            )));
        }
        if self.routing.max_quality_iterations == 0 {
            return Err(ConfigError::Validation(
                "routing.max_quality_iterations must be at least 1".to_string(),
            ));
        }

        if !VALID_PROVIDERS.contains(&self.model.provider.to_lowercase().as_str()) {
            return Err(ConfigError::Validation(format!(
                "Invalid model.provider: {}. Valid options: {}",
                self.model.provider,
                VALID_PROVIDERS.join(", ")
            )));
        }

        Ok(())
    }
}
