//! Per-user cache of live recommendations with expiry sweeping.

use chrono::Utc;
use rapport_core::recommendation::RealTimeRecommendation;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// Default cap on entries returned by a read.
pub const DEFAULT_READ_LIMIT: usize = 10;

/// In-memory recommendation store, partitioned by user id.
///
/// Sweeping is eager on write and lazy on read, so cost stays bounded to
/// the touched user's entries — no global background scan. The coarse
/// mutex only guards map access; it also makes concurrent appends from
/// two sessions of the same user safe.
#[derive(Default)]
pub struct RecommendationStore {
    entries: Mutex<HashMap<String, Vec<RealTimeRecommendation>>>,
}

impl RecommendationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch to the user's list, sweeping expired entries first.
    pub fn put(&self, user_id: &str, recommendations: Vec<RealTimeRecommendation>) {
        if recommendations.is_empty() {
            return;
        }
        let now = Utc::now();
        let mut entries = lock_unpoisoned(&self.entries);
        let list = entries.entry(user_id.to_string()).or_default();
        sweep(user_id, list, now);
        list.extend(recommendations);
    }

    /// Live recommendations for a user, newest first, capped at `limit`
    /// (or [`DEFAULT_READ_LIMIT`]). Never returns an expired entry.
    pub fn get_active(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Vec<RealTimeRecommendation> {
        let now = Utc::now();
        let mut entries = lock_unpoisoned(&self.entries);
        let Some(list) = entries.get_mut(user_id) else {
            return Vec::new();
        };
        sweep(user_id, list, now);

        let mut result = list.clone();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        result.truncate(limit.unwrap_or(DEFAULT_READ_LIMIT));
        result
    }
}

/// Drop expired entries from one user's list.
fn sweep(user_id: &str, list: &mut Vec<RealTimeRecommendation>, now: chrono::DateTime<Utc>) {
    let before = list.len();
    list.retain(|rec| !rec.is_expired(now));
    let dropped = before - list.len();
    if dropped > 0 {
        debug!("swept {dropped} expired recommendation(s) for {user_id}");
    }
}

/// Recover the guard even if a holder panicked; the data is plain values.
fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
