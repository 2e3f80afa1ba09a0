use thiserror::Error;
use uuid::Uuid;

/// Top-level error type for Rapport.
#[derive(Debug, Error)]
pub enum RapportError {
    /// Bad session parameters, rejected synchronously at start time.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Stop/status request for a session id that does not exist.
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    /// Backpressure signal from a bounded queue. Producers retry with
    /// backoff; never surfaced to the session owner as a failure.
    #[error("queue full: {0}")]
    QueueFull(String),

    /// Error from the analysis provider. Absorbed by the adapter, which
    /// substitutes a degraded result instead of propagating.
    #[error("provider error: {0}")]
    Provider(String),

    /// Error from a platform connector.
    #[error("connector error: {0}")]
    Connector(String),

    /// A real-time client could not be reached; it gets deregistered.
    #[error("client disconnected: {0}")]
    ClientDisconnected(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
