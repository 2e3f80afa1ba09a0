//! # rapport-connectors
//!
//! Platform connector implementations: an HTTP polling connector for
//! webhook-relay style backends and an in-memory connector for manual
//! entry, demos, and tests.

pub mod http;
pub mod memory;

pub use http::HttpConnector;
pub use memory::InMemoryConnector;
