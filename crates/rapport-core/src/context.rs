use crate::message::LiveMessage;
use serde::{Deserialize, Serialize};

/// Direction the conversation tone is moving, judged over the buffered
/// window by cheap lexical scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentTrend {
    Improving,
    Stable,
    Declining,
}

/// Read-mostly snapshot of a user's recent conversation, handed to the
/// analysis adapter and rule evaluators.
///
/// Built from the per-user context buffer by the owning session consumer;
/// never shared across users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationContext {
    pub user_id: String,
    /// Newest messages, oldest first. Capped at the analysis window (10);
    /// the full buffer (≤ 50) only feeds the derived fields below.
    pub recent: Vec<LiveMessage>,
    pub last_sender: Option<String>,
    /// Total messages currently buffered.
    pub conversation_length: usize,
    /// Share of buffered messages that pose a question.
    pub question_ratio: f64,
    pub sentiment_trend: SentimentTrend,
    /// Gap between the two newest messages, when there are at least two.
    pub seconds_since_previous: Option<i64>,
}

impl ConversationContext {
    /// Empty context for a user with no buffered history yet.
    pub fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            recent: Vec::new(),
            last_sender: None,
            conversation_length: 0,
            question_ratio: 0.0,
            sentiment_trend: SentimentTrend::Stable,
            seconds_since_previous: None,
        }
    }
}
