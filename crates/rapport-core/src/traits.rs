use crate::{
    analysis::{AnalysisResult, ProviderRecommendation},
    context::ConversationContext,
    error::RapportError,
    message::LiveMessage,
};
use async_trait::async_trait;

/// Filter handed to a connector on every poll cycle, derived from the
/// owning session's configuration.
#[derive(Debug, Clone, Default)]
pub struct PollFilter {
    /// Only messages from these senders pass. Empty = all senders.
    pub target_users: Vec<String>,
    /// Only messages containing one of these keywords pass (case
    /// insensitive). Empty = all messages.
    pub keywords: Vec<String>,
}

impl PollFilter {
    /// Whether `message` passes this filter.
    pub fn matches(&self, message: &LiveMessage) -> bool {
        if !self.target_users.is_empty() && !self.target_users.contains(&message.sender) {
            return false;
        }
        if !self.keywords.is_empty() {
            let content = message.content.to_lowercase();
            return self
                .keywords
                .iter()
                .any(|kw| content.contains(&kw.to_lowercase()));
        }
        true
    }
}

/// Platform Connector trait — an opaque producer of raw messages.
///
/// Connector failures are not fatal: callers log them and treat the poll
/// cycle as having produced no new messages.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Platform name (e.g. "telegram", "manual").
    fn name(&self) -> &str;

    /// Fetch messages that arrived since the previous poll, already
    /// filtered. Empty result means no new data.
    async fn poll_new_messages(&self, filter: &PollFilter)
        -> Result<Vec<LiveMessage>, RapportError>;
}

/// Analysis Provider trait — the external NLP/AI collaborator.
///
/// Both methods must return within a bounded time; the adapter enforces a
/// timeout and substitutes degraded results on any failure.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Score and tag one message against the user's recent context.
    async fn analyze_message(
        &self,
        user_id: &str,
        message: &LiveMessage,
        context: &ConversationContext,
    ) -> Result<AnalysisResult, RapportError>;

    /// Open-ended recommendation hints for one analyzed message.
    async fn suggest_recommendations(
        &self,
        user_id: &str,
        message: &LiveMessage,
        analysis: &AnalysisResult,
        context: &ConversationContext,
    ) -> Result<Vec<ProviderRecommendation>, RapportError>;

    /// Check if the provider is reachable and ready.
    async fn is_available(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = PollFilter::default();
        let msg = LiveMessage::new("manual", "1", "anything at all", "anyone", "u1");
        assert!(filter.matches(&msg));
    }

    #[test]
    fn test_target_user_filter() {
        let filter = PollFilter {
            target_users: vec!["alice".into()],
            keywords: Vec::new(),
        };
        let from_alice = LiveMessage::new("manual", "1", "hi", "alice", "u1");
        let from_bob = LiveMessage::new("manual", "2", "hi", "bob", "u1");
        assert!(filter.matches(&from_alice));
        assert!(!filter.matches(&from_bob));
    }

    #[test]
    fn test_keyword_filter_case_insensitive() {
        let filter = PollFilter {
            target_users: Vec::new(),
            keywords: vec!["Dinner".into()],
        };
        let hit = LiveMessage::new("manual", "1", "what about dinner tonight?", "alice", "u1");
        let miss = LiveMessage::new("manual", "2", "see you tomorrow", "alice", "u1");
        assert!(filter.matches(&hit));
        assert!(!filter.matches(&miss));
    }
}
