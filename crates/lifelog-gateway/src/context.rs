//! Inbound message context.
//!
//! The metadata record produced by the upstream transport (e.g., a Telegram
//! webhook handler) and consumed by routing and dispatch. Its shape is the
//! only externally observable contract at this boundary.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Context accompanying an inbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageContext {
    /// Identity of the sending user.
    pub user_id: String,
    /// Chat the message arrived in.
    pub chat_id: i64,
    /// Transport channel name (e.g., "telegram", "web").
    pub channel: String,
    /// Optional conversation identifier for threaded exchanges.
    pub conversation_id: Option<String>,
    /// Arbitrary transport-specific key/value pairs.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl MessageContext {
    /// Creates a new context with the required identity fields.
    ///
    /// # Arguments
    /// * `user_id` - Identity of the sending user
    /// * `chat_id` - Chat the message arrived in
    /// * `channel` - Transport channel name
    #[must_use]
    pub fn new(user_id: impl Into<String>, chat_id: i64, channel: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            chat_id,
            channel: channel.into(),
            conversation_id: None,
            metadata: HashMap::new(),
        }
    }

    /// Sets the conversation identifier.
    #[must_use]
    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
