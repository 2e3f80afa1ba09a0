//! Per-user sliding window of recent messages.

use crate::lexicon;
use rapport_core::context::{ConversationContext, SentimentTrend};
use rapport_core::message::LiveMessage;
use std::collections::VecDeque;

/// Maximum messages retained per user.
pub const CONTEXT_WINDOW: usize = 50;
/// How many of the newest messages are handed to the analysis provider.
pub const ANALYSIS_WINDOW: usize = 10;

/// Trend delta below which the conversation tone counts as stable.
const TREND_THRESHOLD: f64 = 0.15;

/// Bounded ring of one user's recent messages, oldest evicted first.
///
/// Owned exclusively by the session consumer task for that user — no
/// locking, no cross-user sharing.
#[derive(Debug, Default)]
pub struct ContextBuffer {
    messages: VecDeque<LiveMessage>,
}

impl ContextBuffer {
    pub fn new() -> Self {
        Self {
            messages: VecDeque::with_capacity(CONTEXT_WINDOW),
        }
    }

    /// Push a message, evicting the oldest when the window is full.
    pub fn append(&mut self, message: LiveMessage) {
        if self.messages.len() == CONTEXT_WINDOW {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Immutable snapshot with derived conversation features.
    pub fn snapshot(&self, user_id: &str) -> ConversationContext {
        if self.messages.is_empty() {
            return ConversationContext::empty(user_id);
        }

        let skip = self.messages.len().saturating_sub(ANALYSIS_WINDOW);
        let recent: Vec<LiveMessage> = self.messages.iter().skip(skip).cloned().collect();

        let questions = self
            .messages
            .iter()
            .filter(|m| lexicon::is_question(&m.content))
            .count();

        let seconds_since_previous = if self.messages.len() >= 2 {
            let newest = &self.messages[self.messages.len() - 1];
            let previous = &self.messages[self.messages.len() - 2];
            Some((newest.timestamp - previous.timestamp).num_seconds())
        } else {
            None
        };

        ConversationContext {
            user_id: user_id.to_string(),
            last_sender: self.messages.back().map(|m| m.sender.clone()),
            conversation_length: self.messages.len(),
            question_ratio: questions as f64 / self.messages.len() as f64,
            sentiment_trend: self.trend(),
            seconds_since_previous,
            recent,
        }
    }

    /// Compare lexical tone of the older half against the newer half.
    fn trend(&self) -> SentimentTrend {
        if self.messages.len() < 4 {
            return SentimentTrend::Stable;
        }
        let mid = self.messages.len() / 2;
        let half_score = |msgs: &[&LiveMessage]| -> f64 {
            msgs.iter().map(|m| lexicon::score(&m.content)).sum::<f64>() / msgs.len() as f64
        };
        let all: Vec<&LiveMessage> = self.messages.iter().collect();
        let older = half_score(&all[..mid]);
        let newer = half_score(&all[mid..]);
        let delta = newer - older;
        if delta > TREND_THRESHOLD {
            SentimentTrend::Improving
        } else if delta < -TREND_THRESHOLD {
            SentimentTrend::Declining
        } else {
            SentimentTrend::Stable
        }
    }
}
