//! # rapport-core
//!
//! Core types, traits, configuration, and error handling for the Rapport
//! monitoring pipeline.

pub mod analysis;
pub mod config;
pub mod context;
pub mod error;
pub mod message;
pub mod recommendation;
pub mod session;
pub mod traits;
