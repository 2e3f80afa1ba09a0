//! Periodic inactivity sweep.

use super::SessionManager;
use rapport_core::config::MonitorConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Stop sessions idle past the configured threshold, forever.
pub async fn cleanup_loop(manager: Arc<SessionManager>, config: MonitorConfig) {
    let mut ticker = tokio::time::interval(Duration::from_secs(config.cleanup_interval_secs));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let max_inactive = chrono::Duration::minutes(config.max_inactive_minutes);

    loop {
        ticker.tick().await;
        let stopped = manager.cleanup_inactive(max_inactive).await;
        if stopped > 0 {
            info!("cleanup: stopped {stopped} inactive session(s)");
        }
    }
}
