//! OpenAI-compatible HTTP analysis provider.
//!
//! Calls a chat-completions endpoint and asks for strict JSON, once for
//! the per-message analysis and once for open-ended recommendation hints.

use async_trait::async_trait;
use rapport_core::{
    analysis::{AnalysisResult, ProviderRecommendation},
    config::HttpProviderConfig,
    context::ConversationContext,
    error::RapportError,
    message::LiveMessage,
    recommendation::RecommendationKind,
    traits::AnalysisProvider,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const ANALYZE_SYSTEM_PROMPT: &str = "You analyze one message from a live personal conversation. \
Respond with strict JSON only: {\"sentiment\": -1.0..1.0, \"topics\": [..], \
\"urgency\": 0.0..1.0, \"intent\": \"..\", \"confidence\": 0.0..1.0}.";

const SUGGEST_SYSTEM_PROMPT: &str = "You coach someone in a live personal conversation. \
Given the latest message and its analysis, respond with strict JSON only: an array of zero to \
three objects {\"kind\": \"immediate|suggested|warning|opportunity\", \"priority\": 1..10, \
\"title\": \"..\", \"message\": \"..\", \"suggested_response\": \"..\"|null, \
\"reasoning\": \"..\", \"confidence\": 0.0..1.0, \"expiry_minutes\": 1..60}. \
Suggest nothing when nothing is worth saying.";

/// Analysis provider backed by an OpenAI-compatible chat API.
pub struct HttpAnalysisProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpAnalysisProvider {
    pub fn from_config(config: &HttpProviderConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_default(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    /// One chat-completions round trip, returning the raw content string.
    async fn complete(&self, system: &str, user: String) -> Result<String, RapportError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".into(),
                    content: user,
                },
            ],
            temperature: 0.2,
        };

        debug!("analysis provider: POST {url} model={}", self.model);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RapportError::Provider(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(RapportError::Provider(format!(
                "provider returned {status}: {text}"
            )));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| RapportError::Provider(format!("failed to parse response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| RapportError::Provider("empty choices in response".into()))
    }
}

fn context_block(context: &ConversationContext) -> String {
    let mut lines: Vec<String> = context
        .recent
        .iter()
        .map(|m| format!("{}: {}", m.sender, m.content))
        .collect();
    lines.push(format!(
        "(conversation length {}, question ratio {:.2}, trend {:?})",
        context.conversation_length, context.question_ratio, context.sentiment_trend
    ));
    lines.join("\n")
}

#[async_trait]
impl AnalysisProvider for HttpAnalysisProvider {
    fn name(&self) -> &str {
        "http"
    }

    async fn analyze_message(
        &self,
        user_id: &str,
        message: &LiveMessage,
        context: &ConversationContext,
    ) -> Result<AnalysisResult, RapportError> {
        let prompt = format!(
            "Recipient: {user_id}\nRecent context:\n{}\n\nLatest message from {}:\n{}",
            context_block(context),
            message.sender,
            message.content,
        );
        let content = self.complete(ANALYZE_SYSTEM_PROMPT, prompt).await?;
        let wire: AnalysisWire = serde_json::from_str(content.trim())
            .map_err(|e| RapportError::Provider(format!("malformed analysis JSON: {e}")))?;
        Ok(wire.into_result())
    }

    async fn suggest_recommendations(
        &self,
        user_id: &str,
        message: &LiveMessage,
        analysis: &AnalysisResult,
        context: &ConversationContext,
    ) -> Result<Vec<ProviderRecommendation>, RapportError> {
        let prompt = format!(
            "Recipient: {user_id}\nRecent context:\n{}\n\nLatest message from {}:\n{}\n\nAnalysis: {}",
            context_block(context),
            message.sender,
            message.content,
            serde_json::to_string(analysis)?,
        );
        let content = self.complete(SUGGEST_SYSTEM_PROMPT, prompt).await?;
        let wires: Vec<SuggestionWire> = serde_json::from_str(content.trim())
            .map_err(|e| RapportError::Provider(format!("malformed suggestions JSON: {e}")))?;
        Ok(wires.into_iter().map(SuggestionWire::into_hint).collect())
    }

    async fn is_available(&self) -> bool {
        if self.api_key.is_empty() {
            warn!("http analysis provider: no API key configured");
            return false;
        }
        true
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Lenient wire shape for the analysis JSON the model returns.
#[derive(Deserialize)]
struct AnalysisWire {
    #[serde(default)]
    sentiment: f64,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    urgency: f64,
    #[serde(default = "unknown_intent")]
    intent: String,
    #[serde(default = "half_confidence")]
    confidence: f64,
}

impl AnalysisWire {
    fn into_result(self) -> AnalysisResult {
        AnalysisResult {
            sentiment: self.sentiment,
            topics: self.topics,
            urgency: self.urgency,
            intent: self.intent,
            confidence: self.confidence,
        }
        .normalized()
    }
}

/// Lenient wire shape for one suggested recommendation.
#[derive(Deserialize)]
struct SuggestionWire {
    #[serde(default)]
    kind: String,
    #[serde(default = "default_priority")]
    priority: u8,
    #[serde(default)]
    title: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    suggested_response: Option<String>,
    #[serde(default)]
    reasoning: String,
    #[serde(default = "half_confidence")]
    confidence: f64,
    #[serde(default = "default_expiry")]
    expiry_minutes: i64,
}

impl SuggestionWire {
    fn into_hint(self) -> ProviderRecommendation {
        let kind = match self.kind.as_str() {
            "immediate" => RecommendationKind::Immediate,
            "warning" => RecommendationKind::Warning,
            "opportunity" => RecommendationKind::Opportunity,
            _ => RecommendationKind::Suggested,
        };
        ProviderRecommendation {
            kind,
            priority: self.priority,
            title: self.title,
            message: self.message,
            suggested_response: self.suggested_response,
            reasoning: self.reasoning,
            confidence: self.confidence,
            expiry_minutes: self.expiry_minutes,
        }
    }
}

fn unknown_intent() -> String {
    "unknown".to_string()
}
fn half_confidence() -> f64 {
    0.5
}
fn default_priority() -> u8 {
    5
}
fn default_expiry() -> i64 {
    15
}
