use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of recommendation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationKind {
    Immediate,
    Suggested,
    Warning,
    Opportunity,
}

/// Lower bound for recommendation lifetime, in minutes.
pub const MIN_EXPIRY_MINUTES: i64 = 1;
/// Upper bound for recommendation lifetime, in minutes.
pub const MAX_EXPIRY_MINUTES: i64 = 60;

/// A prioritized, time-bounded suggestion surfaced to a user during a
/// live conversation. Immutable once created; removed only by expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealTimeRecommendation {
    pub id: Uuid,
    pub user_id: String,
    pub kind: RecommendationKind,
    /// 1–10, 10 highest.
    pub priority: u8,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub suggested_response: Option<String>,
    #[serde(default)]
    pub reasoning: String,
    /// 0.0–1.0.
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Opaque snapshot of the triggering situation, kept for audit.
    #[serde(default)]
    pub context: serde_json::Value,
}

impl RealTimeRecommendation {
    /// Create a recommendation expiring `expiry_minutes` from now.
    ///
    /// Priority is clamped to 1–10 and the expiry window to
    /// [`MIN_EXPIRY_MINUTES`, `MAX_EXPIRY_MINUTES`], so `expires_at` is
    /// always strictly after `created_at`.
    pub fn new(
        user_id: &str,
        kind: RecommendationKind,
        priority: u8,
        title: &str,
        message: &str,
        expiry_minutes: i64,
    ) -> Self {
        let created_at = Utc::now();
        let minutes = expiry_minutes.clamp(MIN_EXPIRY_MINUTES, MAX_EXPIRY_MINUTES);
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            kind,
            priority: priority.clamp(1, 10),
            title: title.to_string(),
            message: message.to_string(),
            suggested_response: None,
            reasoning: String::new(),
            confidence: 1.0,
            created_at,
            expires_at: created_at + Duration::minutes(minutes),
            context: serde_json::Value::Null,
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_suggested_response(mut self, response: impl Into<String>) -> Self {
        self.suggested_response = Some(response.into());
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }

    /// Whether this recommendation is no longer live at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
