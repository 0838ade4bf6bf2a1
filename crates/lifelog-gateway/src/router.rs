//! Agent routing.
//!
//! Maps a classification to a target agent, falling back to general chat
//! when the classifier's confidence is below the configured floor.

use crate::classify::{Classification, MessageKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Agent handling loggable life events.
pub const EVENT_AGENT_ID: &str = "event-logger";
/// Agent handling questions and general conversation.
pub const CHAT_AGENT_ID: &str = "chat";
/// Agent handling multi-step requests, reviewed by the quality loop.
pub const PLANNER_AGENT_ID: &str = "planner";

/// Routing decision metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// ID of the selected agent.
    pub target_agent: String,
    /// Classifier confidence the decision was based on.
    pub confidence: f64,
    /// Whether the decision fell back due to low confidence.
    pub fallback: bool,
}

/// Router selecting a target agent from a classification.
#[derive(Debug, Clone)]
pub struct AgentRouter {
    /// Classifications below this confidence route to the chat agent.
    confidence_floor: f64,
}

impl AgentRouter {
    /// Creates a router with the given confidence floor.
    ///
    /// # Arguments
    /// * `confidence_floor` - Minimum confidence for specialist routing,
    ///   clamped into `[0, 1]`
    #[must_use]
    pub fn new(confidence_floor: f64) -> Self {
        Self { confidence_floor: confidence_floor.clamp(0.0, 1.0) }
    }

    /// Returns the configured confidence floor.
    #[must_use]
    pub fn confidence_floor(&self) -> f64 {
        self.confidence_floor
    }

    /// Selects the target agent for a classification.
    ///
    /// # Arguments
    /// * `classification` - The classification to route on
    #[must_use]
    pub fn route(&self, classification: &Classification) -> RoutingDecision {
        if classification.confidence < self.confidence_floor {
            debug!(
                kind = %classification.kind,
                confidence = classification.confidence,
                floor = self.confidence_floor,
                "Low-confidence classification, falling back to chat agent"
            );
            return RoutingDecision {
                target_agent: CHAT_AGENT_ID.to_string(),
                confidence: classification.confidence,
                fallback: true,
            };
        }

        let target_agent = match classification.kind {
            MessageKind::Event => EVENT_AGENT_ID,
            MessageKind::ComplexTask => PLANNER_AGENT_ID,
            MessageKind::Question | MessageKind::Chat => CHAT_AGENT_ID,
        };

        debug!(
            kind = %classification.kind,
            target_agent = %target_agent,
            confidence = classification.confidence,
            "Routing decision made"
        );

        RoutingDecision {
            target_agent: target_agent.to_string(),
            confidence: classification.confidence,
            fallback: false,
        }
    }
}

impl Default for AgentRouter {
    fn default() -> Self {
        Self::new(0.5)
    }
}
