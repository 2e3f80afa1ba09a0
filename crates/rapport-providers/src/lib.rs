//! # rapport-providers
//!
//! Analysis provider implementations for Rapport, plus the adapter that
//! enforces the never-hard-fail policy at the provider seam.

pub mod adapter;
pub mod http;
pub mod rule_only;
