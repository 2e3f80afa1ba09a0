//! Keyword tables and cheap lexical scoring.
//!
//! Deliberately string-level and synchronous — this runs inline on the
//! event loop for every message, so it must stay trivial. Anything
//! smarter belongs to the analysis provider.

pub const POSITIVE_KW: &[&str] = &[
    "love", "great", "happy", "wonderful", "thanks", "thank you", "miss you", "excited",
    "amazing", "glad", "appreciate", "proud of you",
];

pub const NEGATIVE_KW: &[&str] = &[
    "hate", "angry", "annoyed", "upset", "terrible", "awful", "ignore", "ignoring", "worst",
    "disappointed", "frustrated", "never listen", "always ignore", "don't care", "whatever",
];

pub const AFFECTIONATE_KW: &[&str] = &[
    "love you", "miss you", "thinking of you", "can't wait to see you", "darling", "sweetheart",
    "babe", "honey", "xoxo",
];

const QUESTION_STARTERS: &[&str] = &[
    "who", "what", "when", "where", "why", "how", "do you", "did you", "are you", "can you",
    "could you", "would you", "will you",
];

/// Whether `text_lower` contains any of the given keywords.
pub fn kw_match(text_lower: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| text_lower.contains(kw))
}

/// Lexical sentiment score in −1.0..1.0. Zero when no keywords hit.
pub fn score(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let pos = POSITIVE_KW.iter().filter(|kw| lower.contains(*kw)).count() as f64;
    let neg = NEGATIVE_KW.iter().filter(|kw| lower.contains(*kw)).count() as f64;
    if pos + neg == 0.0 {
        return 0.0;
    }
    (pos - neg) / (pos + neg)
}

/// Whether `text` poses a question.
pub fn is_question(text: &str) -> bool {
    if text.contains('?') {
        return true;
    }
    let lower = text.to_lowercase();
    QUESTION_STARTERS.iter().any(|s| lower.starts_with(s))
}
