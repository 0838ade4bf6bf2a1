//! Message classification.
//!
//! Assigns a coarse category to free-form text. The dispatcher only depends
//! on the `Classifier` trait, so the LLM-backed implementation can be swapped
//! for the deterministic keyword classifier in tests and offline operation.

use async_trait::async_trait;
use lifelog_abstraction::{Model, ModelError, ModelParameters};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// Coarse message category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// A question the user wants answered.
    Question,
    /// A life event to log (expense, task, maintenance record).
    Event,
    /// General conversation.
    Chat,
    /// A multi-step request that needs planning and review.
    ComplexTask,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Question => write!(f, "question"),
            MessageKind::Event => write!(f, "event"),
            MessageKind::Chat => write!(f, "chat"),
            MessageKind::ComplexTask => write!(f, "complex_task"),
        }
    }
}

/// Classification result for a single message. Recomputed per request, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// The assigned category.
    pub kind: MessageKind,
    /// Optional finer-grained label (e.g., "expense" under `Event`).
    pub subtype: Option<String>,
    /// Classifier confidence in `[0, 1]`.
    pub confidence: f64,
    /// Whether the message should be persisted as a logged event.
    pub needs_logging: bool,
}

impl Classification {
    /// Creates a classification, clamping confidence into `[0, 1]`.
    #[must_use]
    pub fn new(
        kind: MessageKind,
        subtype: Option<String>,
        confidence: f64,
        needs_logging: bool,
    ) -> Self {
        Self { kind, subtype, confidence: confidence.clamp(0.0, 1.0), needs_logging }
    }
}

/// A trait for assigning a `Classification` to free-form text.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classifies the given text.
    ///
    /// # Errors
    /// Returns a `ModelError` if the upstream model call fails or its reply
    /// cannot be parsed. No retry or backoff is applied.
    async fn classify(&self, text: &str) -> Result<Classification, ModelError>;
}

/// Deterministic keyword-based classifier.
///
/// Used in tests and when the gateway runs without a model provider. The
/// buckets are checked in order: explicit questions, loggable events,
/// multi-step requests, then general chat.
#[derive(Debug, Default, Clone)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    /// Creates a new keyword classifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, ModelError> {
        let lower = text.to_lowercase();
        let trimmed = lower.trim();

        // Explicit questions
        if trimmed.ends_with('?')
            || ["what ", "how ", "why ", "when ", "where ", "who "]
                .iter()
                .any(|p| trimmed.starts_with(p))
        {
            return Ok(Classification::new(MessageKind::Question, None, 0.9, false));
        }

        // Loggable events, by subtype
        if ["spent", "bought", "paid", "cost", "expense"].iter().any(|k| trimmed.contains(k)) {
            return Ok(Classification::new(
                MessageKind::Event,
                Some("expense".to_string()),
                0.8,
                true,
            ));
        }
        if ["todo", "task", "remind", "finished", "completed"].iter().any(|k| trimmed.contains(k))
        {
            return Ok(Classification::new(
                MessageKind::Event,
                Some("task".to_string()),
                0.8,
                true,
            ));
        }
        if ["repair", "replaced", "serviced", "maintenance", "oil change"]
            .iter()
            .any(|k| trimmed.contains(k))
        {
            return Ok(Classification::new(
                MessageKind::Event,
                Some("maintenance".to_string()),
                0.8,
                true,
            ));
        }

        // Multi-step requests
        if ["plan", "organize", "analyze", "summarize", "report"].iter().any(|k| trimmed.contains(k))
            || trimmed.contains(" and then ")
        {
            return Ok(Classification::new(MessageKind::ComplexTask, None, 0.7, false));
        }

        Ok(Classification::new(MessageKind::Chat, None, 0.5, false))
    }
}

/// System prompt instructing the model to emit a strict-JSON verdict.
const CLASSIFY_PROMPT: &str = "You are a message classifier for a life-logging assistant. \
Classify the user message into exactly one of: question, event, chat, complex_task. \
For events, set subtype to one of: expense, task, maintenance. \
Respond with strict JSON only, no prose: \
{\"type\": \"...\", \"subtype\": \"...\"|null, \"confidence\": 0.0-1.0, \"need_logging\": true|false}";

/// LLM-backed classifier.
///
/// Delegates to an injected model and parses its strict-JSON verdict. There
/// is no local state machine; a malformed reply surfaces as a
/// `SerializationError` and failures propagate without retry.
pub struct ModelClassifier {
    model: Arc<dyn Model + Send + Sync>,
}

impl ModelClassifier {
    /// Creates a classifier backed by the given model.
    #[must_use]
    pub fn new(model: Arc<dyn Model + Send + Sync>) -> Self {
        Self { model }
    }

    /// Parses a model reply into a classification.
    ///
    /// Tolerates surrounding whitespace and Markdown code fences, which chat
    /// models commonly wrap JSON in.
    fn parse_verdict(reply: &str) -> Result<Classification, ModelError> {
        let stripped = reply
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();

        let verdict: Verdict = serde_json::from_str(stripped).map_err(|e| {
            ModelError::SerializationError(format!("Malformed classifier verdict: {}", e))
        })?;

        Ok(Classification::new(
            verdict.kind,
            verdict.subtype,
            verdict.confidence,
            verdict.need_logging,
        ))
    }
}

#[async_trait]
impl Classifier for ModelClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, ModelError> {
        debug!(
            model_id = %self.model.model_id(),
            text_len = text.len(),
            "ModelClassifier classifying"
        );

        let prompt = format!("{CLASSIFY_PROMPT}\n\nMessage: {text}");
        let parameters =
            ModelParameters { temperature: Some(0.0), max_tokens: Some(128), ..Default::default() };

        let response = self.model.generate_text(&prompt, Some(parameters)).await.map_err(|e| {
            error!(model_id = %self.model.model_id(), error = %e, "Classifier model call failed");
            e
        })?;

        let classification = Self::parse_verdict(&response.content)?;
        debug!(
            kind = %classification.kind,
            confidence = classification.confidence,
            "Message classified"
        );
        Ok(classification)
    }
}

/// Wire shape of the model's JSON verdict.
#[derive(Debug, Deserialize)]
struct Verdict {
    #[serde(rename = "type")]
    kind: MessageKind,
    #[serde(default)]
    subtype: Option<String>,
    confidence: f64,
    #[serde(default)]
    need_logging: bool,
}
