use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// One inbound message pulled from a platform connector.
///
/// Immutable once created — pipeline stages only read it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveMessage {
    pub id: Uuid,
    /// Platform name (e.g. "telegram", "discord", "manual").
    pub platform: String,
    /// Platform-assigned message id, unique per platform.
    pub message_id: String,
    /// Message text content.
    pub content: String,
    /// Platform-specific sender identifier.
    pub sender: String,
    /// Platform-specific recipient identifier (the monitored user).
    pub recipient: String,
    pub timestamp: DateTime<Utc>,
    /// Thread/conversation grouping, when the platform provides one.
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// Opaque platform-specific key/value pairs.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl LiveMessage {
    /// Create a message timestamped now, with a fresh internal id.
    pub fn new(platform: &str, message_id: &str, content: &str, sender: &str, recipient: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            platform: platform.to_string(),
            message_id: message_id.to_string(),
            content: content.to_string(),
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            timestamp: Utc::now(),
            conversation_id: None,
            metadata: HashMap::new(),
        }
    }
}
