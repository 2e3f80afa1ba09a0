//! Per-(session × platform) ingestion task.
//!
//! Pulls from one connector and publishes into the owning session's
//! queue. Never processes messages itself. Connector errors are logged
//! and treated as "no new messages"; a full queue causes the poll cycle
//! to back off and retry rather than fail the session.

use super::queue::{EnqueueError, SessionQueue};
use rapport_core::error::RapportError;
use rapport_core::traits::{Connector, PollFilter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

const MAX_BACKOFF_SECS: u64 = 60;

pub(super) async fn ingest_loop(
    session_id: Uuid,
    connector: Arc<dyn Connector>,
    queue: SessionQueue,
    filter: PollFilter,
    mut cancel: watch::Receiver<bool>,
    poll_interval: Duration,
    enqueue_timeout: Duration,
) {
    let mut backoff_secs: u64 = 1;

    loop {
        if *cancel.borrow() {
            break;
        }

        let messages = match connector.poll_new_messages(&filter).await {
            Ok(messages) => {
                backoff_secs = 1;
                messages
            }
            Err(e) => {
                warn!(
                    "[{session_id}] connector {} poll error (retry in {backoff_secs}s): {e}",
                    connector.name()
                );
                tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                backoff_secs = (backoff_secs * 2).min(MAX_BACKOFF_SECS);
                continue;
            }
        };

        for message in messages {
            // Retry each message until it fits or the session stops.
            loop {
                if *cancel.borrow() {
                    return;
                }
                match queue.enqueue(message.clone(), enqueue_timeout).await {
                    Ok(()) => break,
                    Err(EnqueueError::Full) => {
                        let err = RapportError::QueueFull(format!(
                            "session {session_id} queue on {}",
                            connector.name()
                        ));
                        warn!("{err}, backing off");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                    Err(EnqueueError::Closed) => return,
                }
            }
        }

        // Wait out the poll interval, waking early on cancellation.
        tokio::select! {
            _ = tokio::time::sleep(poll_interval) => {}
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    break;
                }
            }
        }
    }

    debug!("[{session_id}] ingest task for {} stopped", connector.name());
}
