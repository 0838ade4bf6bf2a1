//! Agent lookup by routed ID.

use crate::Agent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// Identity and purpose of a registered agent, for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMetadata {
    pub id: String,
    pub description: String,
}

/// Holds the agents the router can target, keyed by agent ID.
///
/// Registration happens once at wiring time; dispatch then resolves routed
/// IDs concurrently through the read lock.
#[derive(Default)]
pub struct AgentRegistry {
    agents: RwLock<HashMap<String, Arc<dyn Agent + Send + Sync>>>,
}

impl AgentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an agent under its own ID, replacing any previous holder
    /// of that ID.
    ///
    /// # Returns
    /// `true` when the ID was new, `false` when an agent was replaced.
    pub async fn register_agent(&self, agent: Arc<dyn Agent + Send + Sync>) -> bool {
        let id = agent.id().to_string();
        let replaced = self.agents.write().await.insert(id.clone(), agent);

        if replaced.is_some() {
            warn!(agent_id = %id, "Replaced previously registered agent");
        }
        replaced.is_none()
    }

    /// Resolves a routed agent ID to its instance.
    pub async fn get_agent(&self, id: &str) -> Option<Arc<dyn Agent + Send + Sync>> {
        self.agents.read().await.get(id).cloned()
    }

    /// Returns metadata for every registered agent, sorted by ID.
    pub async fn list_agents(&self) -> Vec<AgentMetadata> {
        let agents = self.agents.read().await;
        let mut listing: Vec<AgentMetadata> = agents
            .values()
            .map(|agent| AgentMetadata {
                id: agent.id().to_string(),
                description: agent.description().to_string(),
            })
            .collect();
        listing.sort_by(|a, b| a.id.cmp(&b.id));
        listing
    }
}

impl fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agent_count", &self.agents.try_read().map(|a| a.len()).unwrap_or(0))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EchoAgent;

    fn echo(id: &str, description: &str) -> Arc<EchoAgent> {
        Arc::new(EchoAgent::new(id.to_string(), description.to_string()))
    }

    #[tokio::test]
    async fn test_resolves_registered_id() {
        let registry = AgentRegistry::new();
        assert!(registry.register_agent(echo("echo", "Echoes input")).await);

        let agent = registry.get_agent("echo").await.expect("registered agent resolves");
        assert_eq!(agent.id(), "echo");
        assert!(registry.get_agent("unrouted").await.is_none());
    }

    #[tokio::test]
    async fn test_reregistration_replaces() {
        let registry = AgentRegistry::new();
        assert!(registry.register_agent(echo("echo", "First")).await);
        assert!(!registry.register_agent(echo("echo", "Second")).await);

        let listing = registry.list_agents().await;
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].description, "Second");
    }

    #[tokio::test]
    async fn test_listing_is_sorted_by_id() {
        let registry = AgentRegistry::new();
        registry.register_agent(echo("planner", "Plans")).await;
        registry.register_agent(echo("chat", "Chats")).await;

        let listing = registry.list_agents().await;
        let ids: Vec<&str> = listing.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["chat", "planner"]);
    }
}
