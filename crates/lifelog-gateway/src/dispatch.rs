//! Message dispatch pipeline.
//!
//! `Dispatcher::process` is the single entry point for an inbound message:
//! admission control, classification, routing, agent execution, and the
//! bounded quality-control loop. Failures anywhere in the pipeline are
//! caught here and reported in the outcome envelope; the caller never sees
//! an `Err`.

use crate::classify::{Classification, Classifier};
use crate::context::MessageContext;
use crate::error::GatewayError;
use crate::ratelimit::{build_rate_limit_key, RateLimiter};
use crate::registry::AgentRegistry;
use crate::router::{AgentRouter, RoutingDecision};
use crate::AgentContext;
use async_trait::async_trait;
use lifelog_abstraction::{Model, ModelError, ModelParameters};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// A quality verdict on a draft reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReview {
    /// Quality score in `[0, 1]`.
    pub score: f64,
    /// Feedback fed back into the specialist on refinement.
    pub feedback: String,
}

/// A trait for scoring draft replies in the quality-control loop.
#[async_trait]
pub trait Reviewer: Send + Sync {
    /// Returns the reviewer's ID, recorded in `agents_used`.
    fn id(&self) -> &str;

    /// Scores a draft reply against the original request.
    ///
    /// # Errors
    /// Returns a `ModelError` if the review fails.
    async fn review(&self, input: &str, draft: &str) -> Result<QualityReview, ModelError>;
}

const REVIEW_PROMPT: &str = "You are a quality reviewer for a life-logging assistant. \
Score how well the draft answers the request on a 0.0-1.0 scale and give one \
sentence of feedback. Respond with strict JSON only: \
{\"score\": 0.0-1.0, \"feedback\": \"...\"}";

/// LLM-backed reviewer.
pub struct ModelReviewer {
    id: String,
    model: Arc<dyn Model + Send + Sync>,
}

impl ModelReviewer {
    /// Creates a reviewer backed by the given model.
    ///
    /// # Arguments
    /// * `id` - The reviewer ID
    /// * `model` - The model to score drafts with
    #[must_use]
    pub fn new(id: String, model: Arc<dyn Model + Send + Sync>) -> Self {
        Self { id, model }
    }

    fn parse_review(reply: &str) -> Result<QualityReview, ModelError> {
        let stripped = reply
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();

        let verdict: ReviewVerdict = serde_json::from_str(stripped).map_err(|e| {
            ModelError::SerializationError(format!("Malformed review verdict: {}", e))
        })?;

        Ok(QualityReview { score: verdict.score.clamp(0.0, 1.0), feedback: verdict.feedback })
    }
}

#[async_trait]
impl Reviewer for ModelReviewer {
    fn id(&self) -> &str {
        &self.id
    }

    async fn review(&self, input: &str, draft: &str) -> Result<QualityReview, ModelError> {
        let prompt = format!("{REVIEW_PROMPT}\n\nRequest: {input}\n\nDraft: {draft}");
        let parameters =
            ModelParameters { temperature: Some(0.0), max_tokens: Some(128), ..Default::default() };

        let response = self.model.generate_text(&prompt, Some(parameters)).await.map_err(|e| {
            error!(reviewer_id = %self.id, error = %e, "Reviewer model call failed");
            e
        })?;

        Self::parse_review(&response.content)
    }
}

/// Wire shape of the reviewer's JSON verdict.
#[derive(Debug, Deserialize)]
struct ReviewVerdict {
    score: f64,
    #[serde(default)]
    feedback: String,
}

/// The outcome envelope returned for every processed message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOutcome {
    /// Whether the message was handled to completion.
    pub success: bool,
    /// The agent's reply, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    /// The failure message, on error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether the message was denied by admission control.
    pub rate_limited: bool,
    /// On rate-limited denial, milliseconds until the key is admissible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
    /// The classification the message was routed on, when reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    /// The routed target agent, when reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_agent: Option<String>,
    /// Ordered, append-only list of agent invocations (reviewer included).
    pub agents_used: Vec<String>,
    /// Total count of agent invocations.
    pub total_steps: u32,
    /// Last reviewer score; 1.0 when no reviewer ran.
    pub quality_score: f64,
}

/// Execution bookkeeping carried through the pipeline, kept even on failure.
#[derive(Debug)]
struct DispatchTrace {
    agents_used: Vec<String>,
    total_steps: u32,
    quality_score: f64,
}

impl Default for DispatchTrace {
    fn default() -> Self {
        Self { agents_used: Vec::new(), total_steps: 0, quality_score: 1.0 }
    }
}

impl DispatchTrace {
    fn record(&mut self, agent_id: &str) {
        self.agents_used.push(agent_id.to_string());
        self.total_steps += 1;
    }
}

/// The gateway's message dispatcher.
pub struct Dispatcher {
    limiter: RateLimiter,
    classifier: Arc<dyn Classifier>,
    router: AgentRouter,
    registry: Arc<AgentRegistry>,
    model: Arc<dyn Model + Send + Sync>,
    reviewer: Option<Arc<dyn Reviewer>>,
    /// Quality score the review loop aims for.
    target_quality: f64,
    /// Maximum refinement iterations of the quality loop.
    max_quality_iterations: u32,
}

impl Dispatcher {
    /// Creates a new dispatcher.
    ///
    /// # Arguments
    /// * `limiter` - Admission control
    /// * `classifier` - Message classifier
    /// * `registry` - Agent registry; must hold the routed agent IDs
    /// * `model` - Model handed to agents at execution time
    #[must_use]
    pub fn new(
        limiter: RateLimiter,
        classifier: Arc<dyn Classifier>,
        registry: Arc<AgentRegistry>,
        model: Arc<dyn Model + Send + Sync>,
    ) -> Self {
        Self {
            limiter,
            classifier,
            router: AgentRouter::default(),
            registry,
            model,
            reviewer: None,
            target_quality: 0.8,
            max_quality_iterations: 2,
        }
    }

    /// Sets the router.
    #[must_use]
    pub fn with_router(mut self, router: AgentRouter) -> Self {
        self.router = router;
        self
    }

    /// Sets the quality reviewer, enabling the quality-control loop.
    #[must_use]
    pub fn with_reviewer(mut self, reviewer: Arc<dyn Reviewer>) -> Self {
        self.reviewer = Some(reviewer);
        self
    }

    /// Sets the quality target and iteration budget for the review loop.
    ///
    /// # Arguments
    /// * `target_quality` - Score the loop aims for, clamped into `[0, 1]`
    /// * `max_quality_iterations` - Refinement iteration budget
    #[must_use]
    pub fn with_quality_targets(
        mut self,
        target_quality: f64,
        max_quality_iterations: u32,
    ) -> Self {
        self.target_quality = target_quality.clamp(0.0, 1.0);
        self.max_quality_iterations = max_quality_iterations;
        self
    }

    /// Processes one inbound message end to end.
    ///
    /// Never returns an error: admission denials and pipeline failures are
    /// both reported in the outcome envelope.
    ///
    /// # Arguments
    /// * `text` - The raw message text
    /// * `message` - Transport context for the message
    pub async fn process(&self, text: &str, message: &MessageContext) -> ProcessOutcome {
        let key = build_rate_limit_key(&[
            Some(message.channel.as_str().into()),
            Some("message".into()),
            Some(message.chat_id.into()),
        ]);

        let decision = self.limiter.check(&key).await;
        if !decision.allowed {
            warn!(
                key = %key,
                user_id = %message.user_id,
                retry_after_ms = decision.reset_ms,
                "Message denied by rate limiter"
            );
            return ProcessOutcome {
                success: false,
                reply: None,
                error: Some(format!(
                    "Rate limit exceeded; retry in {} ms",
                    decision.reset_ms
                )),
                rate_limited: true,
                retry_after_ms: Some(decision.reset_ms),
                classification: None,
                target_agent: None,
                agents_used: Vec::new(),
                total_steps: 0,
                // No reviewer ran, same as any other outcome without one.
                quality_score: 1.0,
            };
        }

        let mut trace = DispatchTrace::default();
        match self.run_pipeline(text, message, &mut trace).await {
            Ok((reply, classification, routing)) => {
                debug!(
                    target_agent = %routing.target_agent,
                    total_steps = trace.total_steps,
                    quality_score = trace.quality_score,
                    "Message handled"
                );
                ProcessOutcome {
                    success: true,
                    reply: Some(reply),
                    error: None,
                    rate_limited: false,
                    retry_after_ms: None,
                    classification: Some(classification),
                    target_agent: Some(routing.target_agent),
                    agents_used: trace.agents_used,
                    total_steps: trace.total_steps,
                    quality_score: trace.quality_score,
                }
            }
            Err(e) => {
                error!(
                    user_id = %message.user_id,
                    chat_id = message.chat_id,
                    error = %e,
                    "Message handling failed"
                );
                ProcessOutcome {
                    success: false,
                    reply: None,
                    error: Some(e.to_string()),
                    rate_limited: false,
                    retry_after_ms: None,
                    classification: None,
                    target_agent: None,
                    agents_used: trace.agents_used,
                    total_steps: trace.total_steps,
                    quality_score: trace.quality_score,
                }
            }
        }
    }

    /// The fallible inner pipeline: classify, route, execute, review.
    async fn run_pipeline(
        &self,
        text: &str,
        message: &MessageContext,
        trace: &mut DispatchTrace,
    ) -> Result<(String, Classification, RoutingDecision), GatewayError> {
        let classification = self.classifier.classify(text).await?;
        let routing = self.router.route(&classification);

        let agent = self
            .registry
            .get_agent(&routing.target_agent)
            .await
            .ok_or_else(|| GatewayError::AgentNotFound(routing.target_agent.clone()))?;

        let context = AgentContext {
            model: self.model.as_ref(),
            message,
            classification: Some(&classification),
        };

        let output = agent.execute(text, context).await?;
        trace.record(agent.id());
        let mut reply = output.into_text();

        if let Some(reviewer) = &self.reviewer {
            let mut review = reviewer.review(text, &reply).await?;
            trace.record(reviewer.id());
            trace.quality_score = review.score;

            // Both stop conditions are monotonic; the first satisfied wins.
            let mut iterations = 0;
            while review.score < self.target_quality && iterations < self.max_quality_iterations {
                iterations += 1;
                debug!(
                    iteration = iterations,
                    score = review.score,
                    target = self.target_quality,
                    "Quality below target, refining"
                );

                let refine_input = format!(
                    "{text}\n\nReviewer feedback: {}\nRevise your answer.",
                    review.feedback
                );
                let output = agent.execute(&refine_input, context).await?;
                trace.record(agent.id());
                reply = output.into_text();

                review = reviewer.review(text, &reply).await?;
                trace.record(reviewer.id());
                trace.quality_score = review.score;
            }
        }

        Ok((reply, classification, routing))
    }
}
