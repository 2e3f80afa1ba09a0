//! Merging AI-derived and rule-derived recommendations.

use crate::rules::{self, RuleInput};
use rapport_core::analysis::{AnalysisResult, ProviderRecommendation};
use rapport_core::context::ConversationContext;
use rapport_core::message::LiveMessage;
use rapport_core::recommendation::RealTimeRecommendation;
use serde_json::json;

/// Upper bound on recommendations emitted per message.
pub const MAX_RECOMMENDATIONS: usize = 5;

/// Merge provider hints and rule output into one prioritized batch.
///
/// Provider recommendations are materialized first, then the rule set is
/// evaluated; the combined list is sorted by priority descending with
/// earlier creation winning ties, and truncated to [`MAX_RECOMMENDATIONS`].
pub fn generate(
    user_id: &str,
    message: &LiveMessage,
    analysis: &AnalysisResult,
    context: &ConversationContext,
    hints: Vec<ProviderRecommendation>,
) -> Vec<RealTimeRecommendation> {
    let audit = json!({
        "message_id": message.message_id,
        "platform": message.platform,
        "sentiment": analysis.sentiment,
        "analysis_confidence": analysis.confidence,
        "conversation_length": context.conversation_length,
    });

    let mut recommendations: Vec<RealTimeRecommendation> = hints
        .into_iter()
        .map(|hint| hint.into_recommendation(user_id))
        .collect();

    recommendations.extend(rules::evaluate_all(&RuleInput {
        user_id,
        message,
        analysis,
        context,
    }));

    for rec in &mut recommendations {
        rec.context = audit.clone();
    }

    recommendations.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then(a.created_at.cmp(&b.created_at))
    });
    recommendations.truncate(MAX_RECOMMENDATIONS);
    recommendations
}
