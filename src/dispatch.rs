//! Dispatch gateway — best-effort real-time delivery.
//!
//! Clients register per user id and receive recommendation batches over a
//! bounded channel. Delivery never blocks the pipeline: a client that
//! cannot keep up or has gone away is deregistered on the spot, and the
//! batch stays retrievable from the store.

use rapport_core::error::RapportError;
use rapport_core::recommendation::RealTimeRecommendation;
use rapport_engine::RecommendationStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

/// Buffered batches per client before push starts failing.
const CLIENT_CHANNEL_CAPACITY: usize = 32;

pub struct DispatchGateway {
    clients: Mutex<HashMap<String, mpsc::Sender<Vec<RealTimeRecommendation>>>>,
    store: Arc<RecommendationStore>,
}

impl DispatchGateway {
    pub fn new(store: Arc<RecommendationStore>) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            store,
        }
    }

    /// Register the real-time client for `user_id`, replacing any
    /// previous one. The returned receiver yields recommendation batches.
    pub async fn register_client(
        &self,
        user_id: &str,
    ) -> mpsc::Receiver<Vec<RealTimeRecommendation>> {
        let (tx, rx) = mpsc::channel(CLIENT_CHANNEL_CAPACITY);
        if self
            .clients
            .lock()
            .await
            .insert(user_id.to_string(), tx)
            .is_some()
        {
            debug!("replaced existing real-time client for {user_id}");
        }
        rx
    }

    pub async fn unregister_client(&self, user_id: &str) {
        self.clients.lock().await.remove(user_id);
    }

    /// Push a batch to the user's client, if any. A failed send means
    /// the client is gone or wedged; it gets deregistered and the batch
    /// is dropped from the live path (still readable via [`pull_cached`]).
    ///
    /// [`pull_cached`]: DispatchGateway::pull_cached
    pub async fn push(&self, user_id: &str, recommendations: &[RealTimeRecommendation]) {
        let mut clients = self.clients.lock().await;
        let Some(tx) = clients.get(user_id) else {
            return;
        };
        if tx.try_send(recommendations.to_vec()).is_err() {
            let err = RapportError::ClientDisconnected(user_id.to_string());
            warn!("{err}; deregistering");
            clients.remove(user_id);
        }
    }

    /// Pull path for clients without a live connection.
    pub fn pull_cached(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Vec<RealTimeRecommendation> {
        self.store.get_active(user_id, limit)
    }
}
