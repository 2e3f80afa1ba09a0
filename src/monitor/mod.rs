//! Session manager — owns the lifecycle of monitoring sessions.
//!
//! One registry behind a coarse lock used only for structural changes
//! (create/destroy); steady-state mutation happens inside each session's
//! own tasks via shared atomics. Each session gets its own bounded queue,
//! one ingest task per platform, and exactly one consumer task.

mod ingest;
mod pipeline;
pub mod cleanup;
pub mod queue;

use crate::dispatch::DispatchGateway;
use chrono::{DateTime, Utc};
use queue::{EnqueueError, SessionQueue};
use rapport_core::{
    config::MonitorConfig,
    error::RapportError,
    message::LiveMessage,
    session::{SessionConfig, SessionState, SessionStatus},
    traits::{Connector, PollFilter},
};
use rapport_engine::RecommendationStore;
use rapport_providers::adapter::AnalysisAdapter;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

/// State shared between a session's tasks and the manager.
pub(crate) struct SessionShared {
    pub(crate) session_id: Uuid,
    pub(crate) user_id: String,
    platforms: Vec<String>,
    started_at: DateTime<Utc>,
    /// Cooperative cancellation flag; once false, tasks wind down and
    /// in-flight results are discarded.
    pub(crate) active: AtomicBool,
    /// Unix seconds of the last processed message.
    last_activity: AtomicI64,
    message_count: AtomicU64,
    pub(crate) recommendations_sent: AtomicU64,
}

impl SessionShared {
    fn new(session_id: Uuid, user_id: &str, config: &SessionConfig) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            user_id: user_id.to_string(),
            platforms: config.platforms.clone(),
            started_at: now,
            active: AtomicBool::new(true),
            last_activity: AtomicI64::new(now.timestamp()),
            message_count: AtomicU64::new(0),
            recommendations_sent: AtomicU64::new(0),
        }
    }

    /// Record one processed message.
    pub(crate) fn touch(&self) {
        self.message_count.fetch_add(1, Ordering::Relaxed);
        self.last_activity
            .store(Utc::now().timestamp(), Ordering::Relaxed);
    }

    fn status(&self) -> SessionStatus {
        let state = if self.active.load(Ordering::Relaxed) {
            SessionState::Active
        } else {
            SessionState::Terminated
        };
        let last_activity_at = DateTime::from_timestamp(self.last_activity.load(Ordering::Relaxed), 0)
            .unwrap_or(self.started_at);
        SessionStatus {
            session_id: self.session_id,
            user_id: self.user_id.clone(),
            platforms: self.platforms.clone(),
            state,
            started_at: self.started_at,
            last_activity_at,
            message_count: self.message_count.load(Ordering::Relaxed),
            recommendations_sent: self.recommendations_sent.load(Ordering::Relaxed),
        }
    }
}

/// Registry entry for one live session.
struct SessionHandle {
    shared: Arc<SessionShared>,
    queue: SessionQueue,
    cancel: watch::Sender<bool>,
    config: SessionConfig,
}

/// Owns all monitoring sessions and wires connectors to the pipeline.
pub struct SessionManager {
    connectors: HashMap<String, Arc<dyn Connector>>,
    adapter: Arc<AnalysisAdapter>,
    store: Arc<RecommendationStore>,
    dispatch: Arc<DispatchGateway>,
    config: MonitorConfig,
    sessions: Mutex<HashMap<Uuid, SessionHandle>>,
}

impl SessionManager {
    pub fn new(
        connectors: HashMap<String, Arc<dyn Connector>>,
        adapter: Arc<AnalysisAdapter>,
        store: Arc<RecommendationStore>,
        dispatch: Arc<DispatchGateway>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            connectors,
            adapter,
            store,
            dispatch,
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Start monitoring for `user_id`. Rejects configs with no platforms
    /// or with platforms no connector serves.
    pub async fn start_session(
        &self,
        user_id: &str,
        config: SessionConfig,
    ) -> Result<Uuid, RapportError> {
        config.validate()?;
        for platform in &config.platforms {
            if !self.connectors.contains_key(platform) {
                return Err(RapportError::InvalidConfig(format!(
                    "no connector for platform '{platform}'"
                )));
            }
        }

        let session_id = Uuid::new_v4();
        let shared = Arc::new(SessionShared::new(session_id, user_id, &config));
        let (queue, rx) = queue::session_queue(self.config.queue_capacity);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let filter = PollFilter {
            target_users: config.target_users.clone(),
            keywords: config.keywords.clone(),
        };
        let poll_interval = Duration::from_secs(self.config.poll_interval_secs);
        let enqueue_timeout = Duration::from_millis(self.config.enqueue_timeout_ms);

        for platform in &config.platforms {
            let connector = Arc::clone(&self.connectors[platform]);
            tokio::spawn(ingest::ingest_loop(
                session_id,
                connector,
                queue.clone(),
                filter.clone(),
                cancel_rx.clone(),
                poll_interval,
                enqueue_timeout,
            ));
        }

        tokio::spawn(pipeline::consume_loop(
            rx,
            Arc::clone(&shared),
            Arc::clone(&self.adapter),
            Arc::clone(&self.store),
            Arc::clone(&self.dispatch),
            cancel_rx,
        ));

        let handle = SessionHandle {
            shared,
            queue,
            cancel: cancel_tx,
            config: config.clone(),
        };
        self.sessions.lock().await.insert(session_id, handle);

        info!(
            "session {session_id} started for {user_id} on {:?}",
            config.platforms
        );
        Ok(session_id)
    }

    /// Stop a session. Idempotent: returns `false` when the id is
    /// unknown or already stopped, never an error.
    pub async fn stop_session(&self, session_id: Uuid) -> bool {
        let handle = self.sessions.lock().await.remove(&session_id);
        match handle {
            Some(handle) => {
                handle.shared.active.store(false, Ordering::Relaxed);
                let _ = handle.cancel.send(true);
                info!("session {session_id} stopped");
                true
            }
            None => false,
        }
    }

    pub async fn session_status(&self, session_id: Uuid) -> Result<SessionStatus, RapportError> {
        self.sessions
            .lock()
            .await
            .get(&session_id)
            .map(|handle| handle.shared.status())
            .ok_or(RapportError::SessionNotFound(session_id))
    }

    pub async fn list_active(&self) -> Vec<SessionStatus> {
        self.sessions
            .lock()
            .await
            .values()
            .map(|handle| handle.shared.status())
            .collect()
    }

    /// Stop every session idle longer than `max_inactive`. Returns how
    /// many were stopped.
    pub async fn cleanup_inactive(&self, max_inactive: chrono::Duration) -> usize {
        let cutoff = (Utc::now() - max_inactive).timestamp();
        let stale: Vec<Uuid> = self
            .sessions
            .lock()
            .await
            .iter()
            .filter(|(_, handle)| {
                handle.shared.last_activity.load(Ordering::Relaxed) < cutoff
            })
            .map(|(id, _)| *id)
            .collect();

        let mut stopped = 0;
        for session_id in stale {
            if self.stop_session(session_id).await {
                stopped += 1;
            }
        }
        stopped
    }

    /// Inject a manually submitted message at the queue stage, identical
    /// to connector-sourced messages. Returns the number of sessions it
    /// reached (zero when nobody is monitoring that user/platform). A
    /// session whose queue is saturated is skipped with a warning; the
    /// other sessions still receive the message.
    pub async fn submit_manual(
        &self,
        user_id: &str,
        content: &str,
        sender: &str,
        platform: &str,
    ) -> usize {
        let message = LiveMessage::new(
            platform,
            &Uuid::new_v4().to_string(),
            content,
            sender,
            user_id,
        );
        let enqueue_timeout = Duration::from_millis(self.config.enqueue_timeout_ms);

        let queues: Vec<SessionQueue> = self
            .sessions
            .lock()
            .await
            .values()
            .filter(|handle| {
                handle.shared.user_id == user_id
                    && handle.config.platforms.iter().any(|p| p == platform)
            })
            .map(|handle| handle.queue.clone())
            .collect();

        let mut delivered = 0;
        for queue in queues {
            match queue.enqueue(message.clone(), enqueue_timeout).await {
                Ok(()) => delivered += 1,
                Err(EnqueueError::Full) => {
                    warn!("session queue for {user_id} full, manual message skipped for it");
                }
                Err(EnqueueError::Closed) => {}
            }
        }
        delivered
    }

    /// Cooperatively stop everything; used at shutdown.
    pub async fn stop_all(&self) {
        let ids: Vec<Uuid> = self.sessions.lock().await.keys().copied().collect();
        for session_id in ids {
            self.stop_session(session_id).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rapport_connectors::InMemoryConnector;
    use rapport_core::analysis::{AnalysisResult, ProviderRecommendation};
    use rapport_core::context::ConversationContext;
    use rapport_core::recommendation::RecommendationKind;
    use rapport_core::traits::AnalysisProvider;
    use rapport_providers::rule_only::RuleOnlyProvider;

    fn test_config() -> MonitorConfig {
        MonitorConfig {
            queue_capacity: 64,
            enqueue_timeout_ms: 100,
            poll_interval_secs: 0,
            provider_timeout_secs: 1,
            max_inactive_minutes: 60,
            cleanup_interval_secs: 300,
        }
    }

    fn build_manager() -> (Arc<SessionManager>, Arc<InMemoryConnector>, Arc<RecommendationStore>, Arc<DispatchGateway>) {
        let connector = Arc::new(InMemoryConnector::new("manual"));
        let mut connectors: HashMap<String, Arc<dyn Connector>> = HashMap::new();
        connectors.insert("manual".to_string(), connector.clone() as Arc<dyn Connector>);

        let adapter = Arc::new(AnalysisAdapter::new(Arc::new(RuleOnlyProvider), 1));
        let store = Arc::new(RecommendationStore::new());
        let dispatch = Arc::new(DispatchGateway::new(store.clone()));
        let manager = Arc::new(SessionManager::new(
            connectors,
            adapter,
            store.clone(),
            dispatch.clone(),
            test_config(),
        ));
        (manager, connector, store, dispatch)
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
        for _ in 0..250 {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_start_with_empty_platforms_rejected() {
        let (manager, _, _, _) = build_manager();
        let err = manager
            .start_session("u1", SessionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RapportError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_start_with_unknown_platform_rejected() {
        let (manager, _, _, _) = build_manager();
        let config = SessionConfig {
            platforms: vec!["carrier-pigeon".into()],
            ..Default::default()
        };
        let err = manager.start_session("u1", config).await.unwrap_err();
        assert!(matches!(err, RapportError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_started_session_immediately_retrievable() {
        let (manager, _, _, _) = build_manager();
        let config = SessionConfig {
            platforms: vec!["manual".into()],
            ..Default::default()
        };
        let session_id = manager.start_session("u1", config).await.unwrap();

        let status = manager.session_status(session_id).await.unwrap();
        assert_eq!(status.user_id, "u1");
        assert_eq!(status.state, SessionState::Active);
        assert_eq!(status.message_count, 0);

        assert_eq!(manager.list_active().await.len(), 1);
        manager.stop_session(session_id).await;
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let (manager, _, _, _) = build_manager();
        let config = SessionConfig {
            platforms: vec!["manual".into()],
            ..Default::default()
        };
        let session_id = manager.start_session("u1", config).await.unwrap();

        assert!(manager.stop_session(session_id).await);
        assert!(!manager.stop_session(session_id).await);

        let err = manager.session_status(session_id).await.unwrap_err();
        assert!(matches!(err, RapportError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_end_to_end_rule_only_pipeline() {
        let (manager, connector, store, dispatch) = build_manager();
        let mut client_rx = dispatch.register_client("u1").await;

        let config = SessionConfig {
            platforms: vec!["manual".into()],
            ..Default::default()
        };
        let session_id = manager.start_session("u1", config).await.unwrap();

        connector.push(LiveMessage::new(
            "manual",
            "1",
            "Why do you always ignore me?",
            "alice",
            "u1",
        ));

        assert!(
            wait_for(|| !store.get_active("u1", None).is_empty()).await,
            "pipeline should produce recommendations"
        );

        let active = store.get_active("u1", None);
        assert!(active
            .iter()
            .any(|r| r.kind == RecommendationKind::Warning && r.priority >= 9));
        assert!(active.iter().any(|r| r.kind == RecommendationKind::Suggested));
        // Sorted by priority when pushed; store returns newest-first batch.
        assert!(active.iter().all(|r| !r.is_expired(Utc::now())));

        // Real-time push reached the registered client.
        let pushed = tokio::time::timeout(Duration::from_secs(5), client_rx.recv())
            .await
            .expect("push should arrive")
            .expect("channel open");
        assert!(!pushed.is_empty());

        let status = manager.session_status(session_id).await.unwrap();
        assert_eq!(status.message_count, 1);
        assert!(status.recommendations_sent >= 2);

        manager.stop_session(session_id).await;
    }

    #[tokio::test]
    async fn test_manual_submission_reaches_pipeline() {
        let (manager, _, store, _) = build_manager();
        let config = SessionConfig {
            platforms: vec!["manual".into()],
            ..Default::default()
        };
        let session_id = manager.start_session("u2", config).await.unwrap();

        let delivered = manager
            .submit_manual("u2", "do you want to talk about it?", "alice", "manual")
            .await;
        assert_eq!(delivered, 1);

        assert!(
            wait_for(|| !store.get_active("u2", None).is_empty()).await,
            "manual message should flow through the same pipeline"
        );
        manager.stop_session(session_id).await;
    }

    #[tokio::test]
    async fn test_manual_submission_with_no_session() {
        let (manager, _, _, _) = build_manager();
        let delivered = manager
            .submit_manual("nobody", "hello?", "alice", "manual")
            .await;
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_cleanup_stops_idle_sessions() {
        let (manager, _, _, _) = build_manager();
        let config = SessionConfig {
            platforms: vec!["manual".into()],
            ..Default::default()
        };
        let session_id = manager.start_session("u1", config).await.unwrap();

        // Backdate activity two hours.
        {
            let sessions = manager.sessions.lock().await;
            let handle = sessions.get(&session_id).unwrap();
            handle
                .shared
                .last_activity
                .store((Utc::now() - chrono::Duration::hours(2)).timestamp(), Ordering::Relaxed);
        }

        let stopped = manager.cleanup_inactive(chrono::Duration::minutes(60)).await;
        assert_eq!(stopped, 1);
        assert!(manager.list_active().await.is_empty());

        // Fresh sessions survive the sweep.
        let config = SessionConfig {
            platforms: vec!["manual".into()],
            ..Default::default()
        };
        let fresh = manager.start_session("u1", config).await.unwrap();
        let stopped = manager.cleanup_inactive(chrono::Duration::minutes(60)).await;
        assert_eq!(stopped, 0);
        manager.stop_session(fresh).await;
    }

    /// Provider slow enough to keep a consumer busy for the whole test.
    struct SlowProvider;

    #[async_trait]
    impl AnalysisProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        async fn analyze_message(
            &self,
            _user_id: &str,
            _message: &LiveMessage,
            _context: &ConversationContext,
        ) -> Result<AnalysisResult, RapportError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(AnalysisResult::degraded())
        }

        async fn suggest_recommendations(
            &self,
            _user_id: &str,
            _message: &LiveMessage,
            _analysis: &AnalysisResult,
            _context: &ConversationContext,
        ) -> Result<Vec<ProviderRecommendation>, RapportError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }

        async fn is_available(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_manual_submission_skips_saturated_session() {
        // Tiny queues and a wedged consumer: session A saturates while
        // session B stays healthy. A manual message must still reach B.
        let manual = Arc::new(InMemoryConnector::new("manual"));
        let aux = Arc::new(InMemoryConnector::new("aux"));
        let mut connectors: HashMap<String, Arc<dyn Connector>> = HashMap::new();
        connectors.insert("manual".to_string(), manual.clone() as Arc<dyn Connector>);
        connectors.insert("aux".to_string(), aux.clone() as Arc<dyn Connector>);

        let config = MonitorConfig {
            queue_capacity: 1,
            enqueue_timeout_ms: 50,
            poll_interval_secs: 0,
            provider_timeout_secs: 30,
            max_inactive_minutes: 60,
            cleanup_interval_secs: 300,
        };
        let store = Arc::new(RecommendationStore::new());
        let dispatch = Arc::new(DispatchGateway::new(store.clone()));
        let manager = Arc::new(SessionManager::new(
            connectors,
            Arc::new(AnalysisAdapter::new(Arc::new(SlowProvider), 30)),
            store,
            dispatch,
            config,
        ));

        let session_a = manager
            .start_session(
                "u9",
                SessionConfig {
                    platforms: vec!["manual".into(), "aux".into()],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let _session_b = manager
            .start_session(
                "u9",
                SessionConfig {
                    platforms: vec!["manual".into()],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // Saturate A through its private platform: the consumer wedges on
        // the first message, the second fills the capacity-1 queue.
        for i in 0..3 {
            aux.push(LiveMessage::new("aux", &i.to_string(), "filler", "alice", "u9"));
        }
        let mut wedged = false;
        for _ in 0..250 {
            if manager.session_status(session_a).await.unwrap().message_count >= 1 {
                wedged = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(wedged, "session A consumer should have picked up a message");
        tokio::time::sleep(Duration::from_millis(200)).await;

        // A is skipped with a warning, B still gets the message.
        let delivered = manager
            .submit_manual("u9", "still there?", "alice", "manual")
            .await;
        assert_eq!(delivered, 1);

        manager.stop_all().await;
    }

    #[tokio::test]
    async fn test_two_sessions_same_user_share_store() {
        let (manager, _, store, _) = build_manager();
        let config = SessionConfig {
            platforms: vec!["manual".into()],
            ..Default::default()
        };
        let first = manager.start_session("u3", config.clone()).await.unwrap();
        let second = manager.start_session("u3", config).await.unwrap();
        assert_ne!(first, second);

        let delivered = manager
            .submit_manual("u3", "miss you, are you free tonight?", "alice", "manual")
            .await;
        assert_eq!(delivered, 2);

        assert!(wait_for(|| store.get_active("u3", None).len() >= 2).await);
        manager.stop_all().await;
        assert!(manager.list_active().await.is_empty());
    }
}
