//! # rapport-engine
//!
//! The deterministic half of the pipeline: per-user context buffering,
//! rule evaluation, AI/rule merging, and the live recommendation store.

pub mod context;
pub mod engine;
pub mod lexicon;
pub mod rules;
pub mod store;

pub use context::ContextBuffer;
pub use store::RecommendationStore;
