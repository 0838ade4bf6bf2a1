//! Lifelog CLI - Command-line interface for the lifelog message gateway
//!
//! This CLI provides a `lifelog` command for sending messages through the
//! gateway pipeline (admission control, classification, routing, dispatch)
//! and for inspecting rate-limit keys and windows from scripts.

use clap::{Parser, Subcommand};
use lifelog_gateway::{
    build_rate_limit_key, AgentRegistry, AgentRouter, ChatAgent, Classifier, Dispatcher,
    EventAgent, GatewayConfig, KeyPart, KeywordClassifier, MemoryWindowStore, MessageContext,
    ModelClassifier, ModelReviewer, PlannerAgent, RateLimitConfig, RateLimiter, CHAT_AGENT_ID,
    EVENT_AGENT_ID, PLANNER_AGENT_ID,
};
use lifelog_models::{ModelConfig, ModelFactory, ModelType};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Lifelog CLI - message gateway for life-event logging
#[derive(Parser, Debug)]
#[command(
    name = "lifelog",
    author,
    version,
    about = "Lifelog - classify and route life-event messages",
    long_about = "Lifelog routes chat messages through admission control, classification, \
and specialist agents for life-event logging.\nOutcomes are printed as JSON for scripting."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Path to a gateway configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a message through the gateway pipeline
    ///
    /// Classifies the message, routes it to a specialist agent, and prints
    /// the outcome envelope as JSON.
    Send {
        /// The message text
        text: String,

        /// Sender user ID
        #[arg(long, default_value = "cli")]
        user: String,

        /// Chat ID the message belongs to
        #[arg(long, default_value_t = 0)]
        chat: i64,

        /// Transport channel name
        #[arg(long, default_value = "cli")]
        channel: String,

        /// Run the quality-control loop over the reply
        ///
        /// Requires a model provider that returns strict JSON verdicts; the
        /// mock provider will report a review error in the envelope.
        #[arg(long)]
        review: bool,
    },

    /// List the agents the gateway routes to
    ///
    /// Prints the registered agent IDs and descriptions as JSON.
    Agents,

    /// Build a rate-limit key from parts
    ///
    /// Joins non-empty parts with ':' exactly as the gateway does, so
    /// external stores can be inspected under the same keys.
    CheckKey {
        /// Key parts in order; empty parts are skipped
        parts: Vec<String>,
    },

    /// Probe the sliding-window limiter
    ///
    /// Runs a number of checks against a fresh in-memory window using the
    /// configured limit, printing one decision per line as JSON.
    Limits {
        /// Key to check
        #[arg(long, default_value = "cli:probe")]
        key: String,

        /// Number of checks to run
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &args.config {
        Some(path) => GatewayConfig::load(path)?,
        None => GatewayConfig::default(),
    };

    match args.command {
        Command::Send { text, user, chat, channel, review } => {
            send(&config, &text, &user, chat, &channel, review).await
        }
        Command::Agents => {
            let registry = default_registry().await;
            println!("{}", serde_json::to_string_pretty(&registry.list_agents().await)?);
            Ok(())
        }
        Command::CheckKey { parts } => {
            check_key(&parts);
            Ok(())
        }
        Command::Limits { key, count } => limits(&config, &key, count).await,
    }
}

/// Wires up the dispatcher from configuration and processes one message.
async fn send(
    config: &GatewayConfig,
    text: &str,
    user: &str,
    chat: i64,
    channel: &str,
    review: bool,
) -> anyhow::Result<()> {
    let model_type = ModelType::from_str(&config.model.provider)
        .map_err(|()| anyhow::anyhow!("unrecognized model provider: {}", config.model.provider))?;
    let mut model_config = ModelConfig::new(model_type, config.model.model_id.clone());
    if let Some(base_url) = &config.model.base_url {
        model_config = model_config.with_base_url(base_url.clone());
    }
    let model = ModelFactory::create(model_config)?;

    // The mock provider cannot produce JSON verdicts, so classification
    // falls back to keyword matching there.
    let classifier: Arc<dyn Classifier> = if config.model.provider == "mock" {
        Arc::new(KeywordClassifier::new())
    } else {
        Arc::new(ModelClassifier::new(model.clone()))
    };

    let registry = default_registry().await;

    let limiter = RateLimiter::new(
        Arc::new(MemoryWindowStore::new()),
        RateLimitConfig { window_ms: config.rate_limit.window_ms, limit: config.rate_limit.limit },
    );

    let mut dispatcher = Dispatcher::new(limiter, classifier, registry, model.clone())
        .with_router(AgentRouter::new(config.routing.confidence_floor))
        .with_quality_targets(config.routing.target_quality, config.routing.max_quality_iterations);
    if review {
        dispatcher = dispatcher
            .with_reviewer(Arc::new(ModelReviewer::new("quality-reviewer".to_string(), model)));
    }

    let message = MessageContext::new(user, chat, channel);
    let outcome = dispatcher.process(text, &message).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if outcome.success { Ok(()) } else { std::process::exit(1) }
}

/// Registers the standard routing targets.
async fn default_registry() -> Arc<AgentRegistry> {
    let registry = Arc::new(AgentRegistry::new());
    registry.register_agent(Arc::new(EventAgent::new(EVENT_AGENT_ID.to_string()))).await;
    registry.register_agent(Arc::new(ChatAgent::new(CHAT_AGENT_ID.to_string()))).await;
    registry.register_agent(Arc::new(PlannerAgent::new(PLANNER_AGENT_ID.to_string()))).await;
    registry
}

fn check_key(parts: &[String]) {
    let key_parts: Vec<Option<KeyPart>> =
        parts.iter().map(|p| Some(KeyPart::Str(p.clone()))).collect();
    println!("{}", build_rate_limit_key(&key_parts));
}

/// Runs repeated checks against a fresh window and prints each decision.
async fn limits(config: &GatewayConfig, key: &str, count: u32) -> anyhow::Result<()> {
    let limiter = RateLimiter::new(
        Arc::new(MemoryWindowStore::new()),
        RateLimitConfig { window_ms: config.rate_limit.window_ms, limit: config.rate_limit.limit },
    );

    for _ in 0..count {
        let decision = limiter.check(key).await;
        println!("{}", serde_json::to_string(&decision)?);
    }
    Ok(())
}
