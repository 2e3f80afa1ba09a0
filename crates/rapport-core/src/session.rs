use crate::error::RapportError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Configuration for one monitoring session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Platforms to monitor. At least one is required.
    pub platforms: Vec<String>,
    /// Only messages from these senders are processed. Empty = all senders.
    #[serde(default)]
    pub target_users: Vec<String>,
    /// Only messages containing one of these keywords are processed.
    /// Empty = all messages.
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl SessionConfig {
    /// Reject configurations that can never produce messages.
    pub fn validate(&self) -> Result<(), RapportError> {
        if self.platforms.is_empty() {
            return Err(RapportError::InvalidConfig(
                "at least one platform must be configured".to_string(),
            ));
        }
        Ok(())
    }
}

/// Observable lifecycle of a monitoring session.
///
/// Creation and wind-down are transient (a session is registered already
/// active, and its handle is removed in the same step that signals its
/// tasks), so only these two states are ever visible through a status
/// query. There is no way back to `Active` — a new start request creates
/// a new session with a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Active,
    Terminated,
}

/// Point-in-time view of a session, returned by status queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session_id: Uuid,
    pub user_id: String,
    pub platforms: Vec<String>,
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub message_count: u64,
    pub recommendations_sent: u64,
}
