//! Message gateway for the lifelog service.
//!
//! This crate implements the admission-control and message-routing pipeline
//! that sits between a chat transport (e.g., a Telegram webhook handler) and
//! the specialist agents that handle life-event logging and general chat:
//!
//! - sliding-window rate limiting with an injectable window store,
//! - message classification (LLM-backed or deterministic),
//! - agent routing and dispatch with a bounded quality-control loop.

pub mod agents;
pub mod classify;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod ratelimit;
pub mod registry;
pub mod router;

use async_trait::async_trait;
use lifelog_abstraction::{Model, ModelError};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use agents::{ChatAgent, EventAgent, PlannerAgent};
pub use classify::{
    Classification, Classifier, KeywordClassifier, MessageKind, ModelClassifier,
};
pub use config::{ConfigError, GatewayConfig};
pub use context::MessageContext;
pub use dispatch::{Dispatcher, ModelReviewer, ProcessOutcome, QualityReview, Reviewer};
pub use error::GatewayError;
pub use ratelimit::{
    build_rate_limit_key, KeyPart, MemoryWindowStore, RateLimitConfig, RateLimitDecision,
    RateLimiter, WindowStore,
};
pub use registry::{AgentMetadata, AgentRegistry};
pub use router::{AgentRouter, RoutingDecision, CHAT_AGENT_ID, EVENT_AGENT_ID, PLANNER_AGENT_ID};

/// Represents the context provided to an agent during its execution.
#[derive(Clone, Copy)]
pub struct AgentContext<'a> {
    /// The model to use for generation.
    pub model: &'a (dyn Model + Send + Sync),
    /// The inbound message context (identity, channel, metadata).
    pub message: &'a MessageContext,
    /// The classification the message was routed on, when available.
    pub classification: Option<&'a classify::Classification>,
}

/// Represents the output produced by an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AgentOutput {
    /// The agent produced a text response.
    Text(String),
    /// The agent produced a structured data response (e.g., JSON).
    StructuredData(serde_json::Value),
}

impl AgentOutput {
    /// Renders the output as plain text for the reply envelope.
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::StructuredData(value) => value.to_string(),
        }
    }
}

/// A trait that defines the interface for any message-handling agent.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Returns the unique ID of the agent.
    fn id(&self) -> &str;

    /// Returns a description of the agent's purpose and capabilities.
    fn description(&self) -> &str;

    /// Executes the agent with the given input and context.
    ///
    /// # Arguments
    /// * `input` - The input to process
    /// * `context` - The execution context including the model and message metadata
    ///
    /// # Errors
    /// Returns a `ModelError` if execution fails.
    async fn execute(
        &self,
        input: &str,
        context: AgentContext<'_>,
    ) -> Result<AgentOutput, ModelError>;
}

/// A simple agent that echoes its input as output. Used in tests.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EchoAgent {
    id: String,
    description: String,
}

impl EchoAgent {
    /// Creates a new `EchoAgent` with the given ID and description.
    #[must_use]
    pub const fn new(id: String, description: String) -> Self {
        Self { id, description }
    }
}

#[async_trait]
impl Agent for EchoAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(
        &self,
        input: &str,
        _context: AgentContext<'_>,
    ) -> Result<AgentOutput, ModelError> {
        debug!(agent_id = %self.id, input = %input, "EchoAgent executing");
        Ok(AgentOutput::Text(format!("Echo from {}: {input}", self.id)))
    }
}
