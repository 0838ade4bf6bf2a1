//! Planner agent for multi-step requests.
//!
//! Produces a structured draft answer for complex tasks; the dispatcher's
//! quality loop may feed reviewer feedback back into it for refinement.

use crate::{Agent, AgentContext, AgentOutput};
use async_trait::async_trait;
use lifelog_abstraction::ModelError;
use tracing::{debug, error};

/// An agent that decomposes and answers multi-step requests.
#[derive(Debug, Clone)]
pub struct PlannerAgent {
    /// The agent's unique ID.
    id: String,
    /// The agent's description.
    description: String,
}

impl PlannerAgent {
    /// Creates a new `PlannerAgent` with the given ID.
    ///
    /// # Arguments
    /// * `id` - The agent ID
    #[must_use]
    pub fn new(id: String) -> Self {
        Self { id, description: "Decomposes and answers multi-step requests".to_string() }
    }
}

#[async_trait]
impl Agent for PlannerAgent {
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
        debug!(
            agent_id = %self.id,
            user_id = %context.message.user_id,
            input_len = input.len(),
            "PlannerAgent executing"
        );

        let prompt = format!(
            "Break the following request into steps, then carry them out and \
             present the combined result.\n\nRequest: {input}"
        );

        let response = context.model.generate_text(&prompt, None).await.map_err(|e| {
            error!(agent_id = %self.id, error = %e, "Model generation failed");
            e
        })?;

        debug!(
            agent_id = %self.id,
            response_len = response.content.len(),
            "PlannerAgent completed"
        );

        Ok(AgentOutput::Text(response.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageContext;
    use lifelog_models::MockModel;

    #[tokio::test]
    async fn test_planner_agent_execution() {
        let agent = PlannerAgent::new("planner".to_string());
        let model = MockModel::new("mock-model".to_string());
        let message = MessageContext::new("user-1", 1, "telegram");

        let context = AgentContext { model: &model, message: &message, classification: None };
        let output = agent.execute("summarize my March spending", context).await.unwrap();
        assert!(output.into_text().contains("summarize my March spending"));
    }
}
