//! Rule-only provider — no external AI.
//!
//! Every analysis comes back as the degraded low-confidence result and no
//! hints are suggested, so the recommendation engine runs purely on its
//! deterministic rules. Useful without an API key, and as the reference
//! behavior for provider-outage scenarios.

use async_trait::async_trait;
use rapport_core::{
    analysis::{AnalysisResult, ProviderRecommendation},
    context::ConversationContext,
    error::RapportError,
    message::LiveMessage,
    traits::AnalysisProvider,
};

pub struct RuleOnlyProvider;

#[async_trait]
impl AnalysisProvider for RuleOnlyProvider {
    fn name(&self) -> &str {
        "rule-only"
    }

    async fn analyze_message(
        &self,
        _user_id: &str,
        _message: &LiveMessage,
        _context: &ConversationContext,
    ) -> Result<AnalysisResult, RapportError> {
        Ok(AnalysisResult::degraded())
    }

    async fn suggest_recommendations(
        &self,
        _user_id: &str,
        _message: &LiveMessage,
        _analysis: &AnalysisResult,
        _context: &ConversationContext,
    ) -> Result<Vec<ProviderRecommendation>, RapportError> {
        Ok(Vec::new())
    }

    async fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_always_degraded() {
        let provider = RuleOnlyProvider;
        let msg = LiveMessage::new("manual", "1", "hi", "alice", "u1");
        let ctx = ConversationContext::empty("u1");
        let result = provider.analyze_message("u1", &msg, &ctx).await.unwrap();
        assert!(result.confidence <= 0.3);
        let hints = provider
            .suggest_recommendations("u1", &msg, &result, &ctx)
            .await
            .unwrap();
        assert!(hints.is_empty());
        assert!(provider.is_available().await);
    }
}
