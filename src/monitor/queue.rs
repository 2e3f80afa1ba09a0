//! Per-session bounded message queue.
//!
//! One queue per session, drained by that session's single consumer —
//! connector tasks write straight to their session's queue, so there is
//! no cross-session contention and no wasted dequeues.

use rapport_core::message::LiveMessage;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;

/// Why an enqueue did not go through.
#[derive(Debug, PartialEq, Eq)]
pub enum EnqueueError {
    /// Queue at capacity for the whole timeout — backpressure; the
    /// producer should back off and retry.
    Full,
    /// Consumer gone (session stopped); the producer should exit.
    Closed,
}

/// Producer handle to a session's queue. Cheap to clone, one per
/// connector task plus one held for manual injection.
#[derive(Clone)]
pub struct SessionQueue {
    tx: mpsc::Sender<LiveMessage>,
}

/// Create a bounded queue; the receiver goes to the session consumer.
pub fn session_queue(capacity: usize) -> (SessionQueue, mpsc::Receiver<LiveMessage>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (SessionQueue { tx }, rx)
}

impl SessionQueue {
    /// Enqueue with bounded blocking. Blocks up to `timeout` when the
    /// queue is full, then reports [`EnqueueError::Full`] — messages are
    /// never silently dropped and the queue never grows past capacity.
    pub async fn enqueue(
        &self,
        message: LiveMessage,
        timeout: Duration,
    ) -> Result<(), EnqueueError> {
        match self.tx.send_timeout(message, timeout).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => Err(EnqueueError::Full),
            Err(SendTimeoutError::Closed(_)) => Err(EnqueueError::Closed),
        }
    }
}
