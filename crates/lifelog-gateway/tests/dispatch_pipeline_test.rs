//! Integration tests for the full dispatch pipeline
//!
//! Exercises the wired-up gateway end to end: admission control, keyword
//! classification, routing to the registered specialist agents, and the
//! quality-control loop, all against the mock model.

use async_trait::async_trait;
use lifelog_abstraction::ModelError;
use lifelog_gateway::{
    AgentRegistry, ChatAgent, Dispatcher, EventAgent, MemoryWindowStore,
    MessageContext, MessageKind, PlannerAgent, QualityReview, RateLimitConfig, RateLimiter,
    Reviewer, CHAT_AGENT_ID, EVENT_AGENT_ID, PLANNER_AGENT_ID,
};
use lifelog_gateway::classify::KeywordClassifier;
use lifelog_models::MockModel;
use std::sync::Arc;
use tokio::sync::Mutex;

async fn build_dispatcher(limit: u32) -> Dispatcher {
    let registry = Arc::new(AgentRegistry::new());
    registry.register_agent(Arc::new(EventAgent::new(EVENT_AGENT_ID.to_string()))).await;
    registry.register_agent(Arc::new(ChatAgent::new(CHAT_AGENT_ID.to_string()))).await;
    registry.register_agent(Arc::new(PlannerAgent::new(PLANNER_AGENT_ID.to_string()))).await;

    let limiter = RateLimiter::new(
        Arc::new(MemoryWindowStore::new()),
        RateLimitConfig { window_ms: 60_000, limit },
    );

    Dispatcher::new(
        limiter,
        Arc::new(KeywordClassifier::new()),
        registry,
        Arc::new(MockModel::new("mock-model".to_string())),
    )
}

/// Expense messages land on the event logger and are flagged for logging.
#[tokio::test]
async fn test_expense_message_end_to_end() {
    let dispatcher = build_dispatcher(10).await;
    let message = MessageContext::new("user-7", 100, "telegram");

    let outcome = dispatcher.process("spent 12.00 on lunch today", &message).await;

    assert!(outcome.success);
    assert!(outcome.reply.is_some());
    assert_eq!(outcome.target_agent.as_deref(), Some(EVENT_AGENT_ID));
    let classification = outcome.classification.expect("classification present on success");
    assert_eq!(classification.kind, MessageKind::Event);
    assert_eq!(classification.subtype.as_deref(), Some("expense"));
    assert!(classification.needs_logging);
}

/// Questions and small talk both land on the chat agent.
#[tokio::test]
async fn test_chat_and_question_routing() {
    let dispatcher = build_dispatcher(10).await;
    let message = MessageContext::new("user-7", 100, "telegram");

    let question = dispatcher.process("how much did I spend on fuel?", &message).await;
    assert!(question.success);
    assert_eq!(question.target_agent.as_deref(), Some(CHAT_AGENT_ID));
    assert_eq!(question.classification.expect("classified").kind, MessageKind::Question);

    let chat = dispatcher.process("good morning", &message).await;
    assert!(chat.success);
    assert_eq!(chat.target_agent.as_deref(), Some(CHAT_AGENT_ID));
}

/// Multi-step requests land on the planner.
#[tokio::test]
async fn test_complex_task_routing() {
    let dispatcher = build_dispatcher(10).await;
    let message = MessageContext::new("user-7", 100, "telegram");

    let outcome =
        dispatcher.process("organize my week and then draft a budget for next month", &message).await;

    assert!(outcome.success);
    assert_eq!(outcome.target_agent.as_deref(), Some(PLANNER_AGENT_ID));
    assert_eq!(outcome.classification.expect("classified").kind, MessageKind::ComplexTask);
}

/// The limiter admits up to the configured count and then denies with a
/// retry hint, without touching the classifier or agents.
#[tokio::test]
async fn test_rate_limit_denial_and_retry_hint() {
    let dispatcher = build_dispatcher(2).await;
    let message = MessageContext::new("user-7", 100, "telegram");

    assert!(dispatcher.process("hello", &message).await.success);
    assert!(dispatcher.process("hello again", &message).await.success);

    let denied = dispatcher.process("one more", &message).await;
    assert!(!denied.success);
    assert!(denied.rate_limited);
    let retry = denied.retry_after_ms.expect("retry hint on denial");
    assert!(retry <= 60_000);
    assert!(denied.classification.is_none());
    assert!(denied.agents_used.is_empty());
}

/// `quality_score` reports 1.0 on every path where no reviewer ran,
/// denials included, so consumers can rely on a uniform envelope.
#[tokio::test]
async fn test_quality_score_uniform_without_reviewer() {
    let dispatcher = build_dispatcher(1).await;
    let message = MessageContext::new("user-7", 100, "telegram");

    let allowed = dispatcher.process("hello", &message).await;
    assert!((allowed.quality_score - 1.0).abs() < f64::EPSILON);

    let denied = dispatcher.process("hello again", &message).await;
    assert!(denied.rate_limited);
    assert!((denied.quality_score - 1.0).abs() < f64::EPSILON);
}

/// Separate chats get separate limiter windows.
#[tokio::test]
async fn test_rate_limit_isolated_per_chat() {
    let dispatcher = build_dispatcher(1).await;

    let chat_a = MessageContext::new("user-7", 1, "telegram");
    let chat_b = MessageContext::new("user-7", 2, "telegram");

    assert!(dispatcher.process("hello", &chat_a).await.success);
    assert!(!dispatcher.process("hello", &chat_a).await.success);
    assert!(dispatcher.process("hello", &chat_b).await.success);
}

struct ScriptedReviewer {
    scores: Mutex<Vec<f64>>,
}

#[async_trait]
impl Reviewer for ScriptedReviewer {
    fn id(&self) -> &str {
        "quality-reviewer"
    }

    async fn review(&self, _input: &str, _draft: &str) -> Result<QualityReview, ModelError> {
        let mut scores = self.scores.lock().await;
        let score = if scores.is_empty() { 1.0 } else { scores.remove(0) };
        Ok(QualityReview { score, feedback: "add detail".to_string() })
    }
}

/// A low first review triggers one refinement pass; the improved score ends
/// the loop and is reported in the outcome.
#[tokio::test]
async fn test_quality_loop_refinement() {
    let reviewer = Arc::new(ScriptedReviewer { scores: Mutex::new(vec![0.5, 0.9]) });
    let dispatcher =
        build_dispatcher(10).await.with_reviewer(reviewer).with_quality_targets(0.8, 2);
    let message = MessageContext::new("user-7", 100, "telegram");

    let outcome = dispatcher.process("organize my week", &message).await;

    assert!(outcome.success);
    assert_eq!(outcome.total_steps, 4);
    assert_eq!(outcome.agents_used.first().map(String::as_str), Some(PLANNER_AGENT_ID));
    assert!((outcome.quality_score - 0.9).abs() < f64::EPSILON);
}

/// When every review stays below target the loop stops at the iteration
/// budget and still returns the final draft.
#[tokio::test]
async fn test_quality_loop_budget_exhaustion() {
    let reviewer = Arc::new(ScriptedReviewer { scores: Mutex::new(vec![0.1, 0.1, 0.1]) });
    let dispatcher =
        build_dispatcher(10).await.with_reviewer(reviewer).with_quality_targets(0.8, 2);
    let message = MessageContext::new("user-7", 100, "telegram");

    let outcome = dispatcher.process("organize my week", &message).await;

    assert!(outcome.success);
    assert!(outcome.reply.is_some());
    assert_eq!(outcome.total_steps, 6);
    assert!((outcome.quality_score - 0.1).abs() < f64::EPSILON);
}

/// The outcome envelope serializes with stable field names.
#[tokio::test]
async fn test_outcome_serializes_to_json() {
    let dispatcher = build_dispatcher(10).await;
    let message = MessageContext::new("user-7", 100, "telegram");

    let outcome = dispatcher.process("spent 3.20 on coffee", &message).await;
    let json = serde_json::to_value(&outcome).expect("outcome serializes");

    assert_eq!(json["success"], true);
    assert_eq!(json["target_agent"], EVENT_AGENT_ID);
    assert_eq!(json["classification"]["kind"], "event");
    assert_eq!(json["rate_limited"], false);
    assert!(json.get("error").is_none());
}
