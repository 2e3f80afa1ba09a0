//! Per-session consumer — the message processing pipeline.
//!
//! Drains the session's queue in FIFO order: context append → snapshot →
//! analysis (degradable) → provider hints → rule merge → store → dispatch.
//! Failures are isolated per message and never terminate the session.

use super::SessionShared;
use crate::dispatch::DispatchGateway;
use rapport_core::message::LiveMessage;
use rapport_engine::{engine, ContextBuffer, RecommendationStore};
use rapport_providers::adapter::AnalysisAdapter;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

pub(super) async fn consume_loop(
    mut rx: mpsc::Receiver<LiveMessage>,
    shared: Arc<SessionShared>,
    adapter: Arc<AnalysisAdapter>,
    store: Arc<RecommendationStore>,
    dispatch: Arc<DispatchGateway>,
    mut cancel: watch::Receiver<bool>,
) {
    // Owned by this task alone — the session's context window.
    let mut buffer = ContextBuffer::new();

    loop {
        let message = tokio::select! {
            received = rx.recv() => match received {
                Some(message) => message,
                None => break,
            },
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    break;
                }
                continue;
            }
        };

        if !shared.active.load(Ordering::Relaxed) {
            break;
        }

        shared.touch();
        process_message(&shared, &mut buffer, &adapter, &store, &dispatch, message).await;
    }

    debug!("[{}] consumer stopped", shared.session_id);
}

async fn process_message(
    shared: &Arc<SessionShared>,
    buffer: &mut ContextBuffer,
    adapter: &AnalysisAdapter,
    store: &RecommendationStore,
    dispatch: &DispatchGateway,
    message: LiveMessage,
) {
    let user_id = shared.user_id.as_str();

    buffer.append(message.clone());
    let context = buffer.snapshot(user_id);

    // Both calls absorb provider failures; neither can stall past its budget.
    let analysis = adapter.analyze(user_id, &message, &context).await;
    let hints = adapter.suggest(user_id, &message, &analysis, &context).await;

    // The session may have been stopped while the provider call was in
    // flight; its result is discarded, no new work is scheduled.
    if !shared.active.load(Ordering::Relaxed) {
        debug!("[{}] discarding results for stopped session", shared.session_id);
        return;
    }

    let recommendations = engine::generate(user_id, &message, &analysis, &context, hints);
    if recommendations.is_empty() {
        return;
    }

    info!(
        "[{}] {} recommendation(s) for {user_id} from {} message {}",
        shared.session_id,
        recommendations.len(),
        message.platform,
        message.message_id,
    );

    store.put(user_id, recommendations.clone());
    shared
        .recommendations_sent
        .fetch_add(recommendations.len() as u64, Ordering::Relaxed);
    dispatch.push(user_id, &recommendations).await;
}
