//! Event-logging agent.
//!
//! Turns a loggable message (expense, task, maintenance record) into a
//! one-line confirmation for the user. The classified subtype, when present
//! in the context, scopes the prompt.

use crate::{Agent, AgentContext, AgentOutput};
use async_trait::async_trait;
use lifelog_abstraction::ModelError;
use tracing::{debug, error};

/// An agent that confirms and phrases life-event log entries.
#[derive(Debug, Clone)]
pub struct EventAgent {
    /// The agent's unique ID.
    id: String,
    /// The agent's description.
    description: String,
}

impl EventAgent {
    /// Creates a new `EventAgent` with the given ID.
    ///
    /// # Arguments
    /// * `id` - The agent ID
    #[must_use]
    pub fn new(id: String) -> Self {
        Self { id, description: "Logs life events (expenses, tasks, maintenance)".to_string() }
    }

    /// Builds the logging prompt, optionally scoped to a classified subtype.
    fn build_prompt(input: &str, subtype: Option<&str>) -> String {
        let label = subtype.unwrap_or("life");
        format!(
            "The user wants to log a {label} event. Extract the key details and \
             reply with a one-line confirmation of what was recorded.\n\n\
             Message: {input}"
        )
    }
}

#[async_trait]
impl Agent for EventAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(
        &self,
        input: &str,
        context: AgentContext<'_>,
    ) -> Result<AgentOutput, ModelError> {
        let subtype = context.classification.and_then(|c| c.subtype.as_deref());
        debug!(
            agent_id = %self.id,
            user_id = %context.message.user_id,
            subtype = ?subtype,
            input_len = input.len(),
            "EventAgent executing"
        );

        let prompt = Self::build_prompt(input, subtype);
        let response = context.model.generate_text(&prompt, None).await.map_err(|e| {
            error!(agent_id = %self.id, error = %e, "Model generation failed");
            e
        })?;

        debug!(
            agent_id = %self.id,
            response_len = response.content.len(),
            "EventAgent completed"
        );

        Ok(AgentOutput::Text(response.content))
    }
}
