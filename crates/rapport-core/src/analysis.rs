use crate::recommendation::{RealTimeRecommendation, RecommendationKind};
use serde::{Deserialize, Serialize};

/// Confidence assigned to results produced without the analysis provider.
pub const DEGRADED_CONFIDENCE: f64 = 0.25;

/// Result of analyzing one message, AI- or fallback-derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// −1.0 (hostile) to 1.0 (warm).
    pub sentiment: f64,
    pub topics: Vec<String>,
    /// 0.0–1.0.
    pub urgency: f64,
    /// Coarse intent label (e.g. "question", "venting", "planning").
    pub intent: String,
    /// 0.0–1.0. Degraded results never exceed [`DEGRADED_CONFIDENCE`].
    pub confidence: f64,
}

impl AnalysisResult {
    /// Low-confidence neutral result substituted when the analysis
    /// provider is unavailable or slow. Downstream stages always receive
    /// a usable result; quality degrades instead of the pipeline stalling.
    pub fn degraded() -> Self {
        Self {
            sentiment: 0.0,
            topics: Vec::new(),
            urgency: 0.0,
            intent: "unknown".to_string(),
            confidence: DEGRADED_CONFIDENCE,
        }
    }

    /// Clamp all numeric fields into their documented ranges.
    pub fn normalized(mut self) -> Self {
        self.sentiment = self.sentiment.clamp(-1.0, 1.0);
        self.urgency = self.urgency.clamp(0.0, 1.0);
        self.confidence = self.confidence.clamp(0.0, 1.0);
        self
    }
}

/// A recommendation hint supplied by the analysis provider, carrying its
/// own priority/confidence/expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRecommendation {
    pub kind: RecommendationKind,
    pub priority: u8,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub suggested_response: Option<String>,
    #[serde(default)]
    pub reasoning: String,
    pub confidence: f64,
    /// Provider's expiry hint in minutes; clamped on conversion.
    pub expiry_minutes: i64,
}

impl ProviderRecommendation {
    /// Convert into a full recommendation addressed to `user_id`.
    pub fn into_recommendation(self, user_id: &str) -> RealTimeRecommendation {
        let mut rec = RealTimeRecommendation::new(
            user_id,
            self.kind,
            self.priority,
            &self.title,
            &self.message,
            self.expiry_minutes,
        )
        .with_reasoning(self.reasoning)
        .with_confidence(self.confidence);
        rec.suggested_response = self.suggested_response;
        rec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_confidence_is_low() {
        let result = AnalysisResult::degraded();
        assert!(result.confidence <= 0.3);
        assert_eq!(result.sentiment, 0.0);
    }

    #[test]
    fn test_normalized_clamps_out_of_range_fields() {
        let result = AnalysisResult {
            sentiment: -3.0,
            topics: vec![],
            urgency: 1.7,
            intent: "question".into(),
            confidence: 2.0,
        }
        .normalized();
        assert_eq!(result.sentiment, -1.0);
        assert_eq!(result.urgency, 1.0);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_provider_hint_conversion_clamps_expiry() {
        let hint = ProviderRecommendation {
            kind: RecommendationKind::Immediate,
            priority: 10,
            title: "Reply now".into(),
            message: "They are waiting".into(),
            suggested_response: Some("On my way!".into()),
            reasoning: "urgency spike".into(),
            confidence: 0.8,
            expiry_minutes: 240,
        };
        let rec = hint.into_recommendation("u1");
        assert_eq!(rec.user_id, "u1");
        assert_eq!(rec.kind, RecommendationKind::Immediate);
        assert_eq!((rec.expires_at - rec.created_at).num_minutes(), 60);
        assert_eq!(rec.suggested_response.as_deref(), Some("On my way!"));
    }
}
