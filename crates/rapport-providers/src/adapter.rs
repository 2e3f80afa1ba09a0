//! Analysis adapter — the never-hard-fail seam in front of the provider.
//!
//! Any provider error, malformed payload, or timeout degrades to a
//! low-confidence neutral result instead of propagating. Downstream
//! stages always receive something usable; a persistent outage just
//! means rule-only recommendations until the provider recovers.

use rapport_core::{
    analysis::{AnalysisResult, ProviderRecommendation},
    context::ConversationContext,
    message::LiveMessage,
    traits::AnalysisProvider,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

pub struct AnalysisAdapter {
    provider: Arc<dyn AnalysisProvider>,
    budget: Duration,
}

impl AnalysisAdapter {
    pub fn new(provider: Arc<dyn AnalysisProvider>, timeout_secs: u64) -> Self {
        Self {
            provider,
            budget: Duration::from_secs(timeout_secs),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Analyze one message. Infallible by construction.
    pub async fn analyze(
        &self,
        user_id: &str,
        message: &LiveMessage,
        context: &ConversationContext,
    ) -> AnalysisResult {
        match timeout(
            self.budget,
            self.provider.analyze_message(user_id, message, context),
        )
        .await
        {
            Ok(Ok(result)) => result.normalized(),
            Ok(Err(e)) => {
                warn!("analysis provider failed, degrading: {e}");
                AnalysisResult::degraded()
            }
            Err(_) => {
                warn!(
                    "analysis provider timed out after {}s, degrading",
                    self.budget.as_secs()
                );
                AnalysisResult::degraded()
            }
        }
    }

    /// Fetch recommendation hints. Failures yield an empty list.
    pub async fn suggest(
        &self,
        user_id: &str,
        message: &LiveMessage,
        analysis: &AnalysisResult,
        context: &ConversationContext,
    ) -> Vec<ProviderRecommendation> {
        match timeout(
            self.budget,
            self.provider
                .suggest_recommendations(user_id, message, analysis, context),
        )
        .await
        {
            Ok(Ok(hints)) => hints,
            Ok(Err(e)) => {
                warn!("suggestion call failed, continuing rule-only: {e}");
                Vec::new()
            }
            Err(_) => {
                warn!(
                    "suggestion call timed out after {}s, continuing rule-only",
                    self.budget.as_secs()
                );
                Vec::new()
            }
        }
    }
}
