//! Deterministic rule evaluators.
//!
//! Each rule is stateless and independent: it either abstains or emits
//! exactly one recommendation with a fixed kind/priority/expiry. Rules
//! cover known high-value patterns with zero latency, so the pipeline
//! keeps producing useful output even when the AI provider is degraded.

use crate::lexicon;
use rapport_core::analysis::AnalysisResult;
use rapport_core::context::ConversationContext;
use rapport_core::message::LiveMessage;
use rapport_core::recommendation::{RealTimeRecommendation, RecommendationKind};

/// Everything a rule may look at for one message.
pub struct RuleInput<'a> {
    pub user_id: &'a str,
    pub message: &'a LiveMessage,
    pub analysis: &'a AnalysisResult,
    pub context: &'a ConversationContext,
}

type Rule = fn(&RuleInput<'_>) -> Option<RealTimeRecommendation>;

/// Fixed evaluation order; all rules may fire on one message.
const RULES: &[Rule] = &[
    negative_sentiment,
    affectionate_keyword,
    question_present,
    response_gap,
];

const NEGATIVE_INTENSITY_THRESHOLD: f64 = 0.7;
const RESPONSE_GAP_SECS: i64 = 3600;

/// Run every rule against the input, in order.
pub fn evaluate_all(input: &RuleInput<'_>) -> Vec<RealTimeRecommendation> {
    RULES.iter().filter_map(|rule| rule(input)).collect()
}

/// Negative sentiment intensity ≥ 0.7 → Warning, priority 9, 10 min.
///
/// Intensity is the stronger of the provider's sentiment and the local
/// lexical score, so this fires even in rule-only degraded mode.
fn negative_sentiment(input: &RuleInput<'_>) -> Option<RealTimeRecommendation> {
    let local = -lexicon::score(&input.message.content);
    let provider = -input.analysis.sentiment * input.analysis.confidence;
    let intensity = local.max(provider);
    if intensity < NEGATIVE_INTENSITY_THRESHOLD {
        return None;
    }
    Some(
        RealTimeRecommendation::new(
            input.user_id,
            RecommendationKind::Warning,
            9,
            "Tension rising",
            "The conversation just turned sharply negative. Acknowledge their feelings before defending your position.",
            10,
        )
        .with_reasoning(format!("negative sentiment intensity {intensity:.2}"))
        .with_confidence(0.9),
    )
}

/// Affectionate keyword → Opportunity, priority 8, 25 min.
fn affectionate_keyword(input: &RuleInput<'_>) -> Option<RealTimeRecommendation> {
    let lower = input.message.content.to_lowercase();
    if !lexicon::kw_match(&lower, lexicon::AFFECTIONATE_KW) {
        return None;
    }
    Some(
        RealTimeRecommendation::new(
            input.user_id,
            RecommendationKind::Opportunity,
            8,
            "Affection expressed",
            "They just expressed affection. Reciprocating now lands much better than later.",
            25,
        )
        .with_suggested_response("I was just thinking about you too.")
        .with_reasoning("affectionate keyword match".to_string())
        .with_confidence(0.85),
    )
}

/// Question present → Suggested, priority 7, 15 min.
fn question_present(input: &RuleInput<'_>) -> Option<RealTimeRecommendation> {
    if !lexicon::is_question(&input.message.content) {
        return None;
    }
    Some(
        RealTimeRecommendation::new(
            input.user_id,
            RecommendationKind::Suggested,
            7,
            "Open question",
            "They asked you a direct question. Answering it first keeps the conversation moving.",
            15,
        )
        .with_reasoning("question detected in message".to_string())
        .with_confidence(0.9),
    )
}

/// Response gap > 1 hour → Opportunity, priority 6, 20 min.
fn response_gap(input: &RuleInput<'_>) -> Option<RealTimeRecommendation> {
    let gap = input.context.seconds_since_previous?;
    if gap <= RESPONSE_GAP_SECS {
        return None;
    }
    Some(
        RealTimeRecommendation::new(
            input.user_id,
            RecommendationKind::Opportunity,
            6,
            "Conversation resumed",
            "They reached out after a long silence. A warm re-engagement sets the tone for the rest of the exchange.",
            20,
        )
        .with_reasoning(format!("{gap}s since previous message"))
        .with_confidence(0.8),
    )
}
