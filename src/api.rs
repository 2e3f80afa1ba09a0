//! HTTP API server — the client-facing surface.
//!
//! Session lifecycle, manual message submission, recommendation reads,
//! and a WebSocket stream for real-time delivery. Spawned as a background
//! task next to the cleanup sweep.

use crate::dispatch::DispatchGateway;
use crate::monitor::SessionManager;
use axum::{
    extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use rapport_core::{config::ApiConfig, error::RapportError, session::SessionConfig};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    manager: Arc<SessionManager>,
    dispatch: Arc<DispatchGateway>,
    api_key: Option<String>,
    uptime: Instant,
    provider_name: String,
}

#[derive(Debug, Deserialize)]
struct StartSessionRequest {
    user_id: String,
    #[serde(flatten)]
    config: SessionConfig,
}

#[derive(Debug, Deserialize)]
struct SubmitMessageRequest {
    user_id: String,
    content: String,
    sender: String,
    platform: String,
}

#[derive(Debug, Deserialize)]
struct ReadQuery {
    limit: Option<usize>,
}

/// Constant-time string comparison to prevent timing attacks on API token validation.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Check bearer token auth. Returns `None` if authorized, `Some(response)` if rejected.
fn check_auth(headers: &HeaderMap, api_key: &Option<String>) -> Option<(StatusCode, Json<Value>)> {
    let key = match api_key {
        Some(k) => k,
        None => return None, // No auth configured — allow all.
    };

    let header = match headers.get("authorization") {
        Some(h) => h,
        None => {
            return Some((
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "missing Authorization header"})),
            ));
        }
    };

    let value = match header.to_str() {
        Ok(v) => v,
        Err(_) => {
            return Some((
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "invalid Authorization header"})),
            ));
        }
    };

    match value.strip_prefix("Bearer ") {
        Some(token) if constant_time_eq(token, key) => None, // Authorized.
        _ => Some((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid token"})),
        )),
    }
}

fn error_response(err: RapportError) -> (StatusCode, Json<Value>) {
    let status = match &err {
        RapportError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
        RapportError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        RapportError::QueueFull(_) => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({"error": err.to_string()})))
}

/// `GET /api/health` — uptime, provider, active session count.
async fn health(
    headers: HeaderMap,
    State(state): State<ApiState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    Ok(Json(json!({
        "status": "ok",
        "uptime_secs": state.uptime.elapsed().as_secs(),
        "provider": state.provider_name,
        "active_sessions": state.manager.list_active().await.len(),
    })))
}

/// `POST /api/sessions` — start monitoring for a user.
async fn start_session(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Json(request): Json<StartSessionRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    let session_id = state
        .manager
        .start_session(&request.user_id, request.config)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({"session_id": session_id.to_string()})),
    ))
}

/// `GET /api/sessions` — all active sessions.
async fn list_sessions(
    headers: HeaderMap,
    State(state): State<ApiState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }
    let sessions = state.manager.list_active().await;
    Ok(Json(json!({"sessions": sessions})))
}

/// `GET /api/sessions/{id}` — status of one session.
async fn session_status(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }
    let status = state
        .manager
        .session_status(id)
        .await
        .map_err(error_response)?;
    Ok(Json(serde_json::to_value(status).map_err(|e| {
        error_response(RapportError::Serialization(e))
    })?))
}

/// `DELETE /api/sessions/{id}` — stop a session. Idempotent.
async fn stop_session(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }
    let stopped = state.manager.stop_session(id).await;
    Ok(Json(json!({"stopped": stopped})))
}

/// `POST /api/messages` — inject a message into the pipeline.
async fn submit_message(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Json(request): Json<SubmitMessageRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    let delivered = state
        .manager
        .submit_manual(
            &request.user_id,
            &request.content,
            &request.sender,
            &request.platform,
        )
        .await;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({"delivered_to_sessions": delivered})),
    ))
}

/// `GET /api/users/{user_id}/recommendations` — cached live entries.
async fn read_recommendations(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
    Query(query): Query<ReadQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }
    let recommendations = state.dispatch.pull_cached(&user_id, query.limit);
    Ok(Json(json!({"recommendations": recommendations})))
}

/// `GET /api/users/{user_id}/stream` — WebSocket real-time delivery.
async fn stream_recommendations(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return err.into_response();
    }
    ws.on_upgrade(move |socket| stream_loop(socket, state, user_id))
}

/// Forward recommendation batches to one WebSocket client until either
/// side goes away. The client is deregistered on exit, so a dead socket
/// never wedges the pipeline.
async fn stream_loop(mut socket: WebSocket, state: ApiState, user_id: String) {
    let mut rx = state.dispatch.register_client(&user_id).await;
    info!("real-time client connected for {user_id}");

    loop {
        tokio::select! {
            batch = rx.recv() => {
                let Some(batch) = batch else { break };
                let payload = match serde_json::to_string(&batch) {
                    Ok(p) => p,
                    Err(e) => {
                        error!("failed to serialize batch for {user_id}: {e}");
                        continue;
                    }
                };
                if socket.send(WsMessage::Text(payload.into())).await.is_err() {
                    warn!("client for {user_id} went away mid-send");
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                    // Pings are answered by axum; other frames ignored.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.dispatch.unregister_client(&user_id).await;
    debug!("real-time client disconnected for {user_id}");
}

fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/sessions", post(start_session).get(list_sessions))
        .route(
            "/api/sessions/{id}",
            get(session_status).delete(stop_session),
        )
        .route("/api/messages", post(submit_message))
        .route(
            "/api/users/{user_id}/recommendations",
            get(read_recommendations),
        )
        .route("/api/users/{user_id}/stream", get(stream_recommendations))
        .with_state(state)
}

/// Run the API server until the process exits.
pub async fn serve(
    config: ApiConfig,
    manager: Arc<SessionManager>,
    dispatch: Arc<DispatchGateway>,
    provider_name: String,
) {
    let state = ApiState {
        manager,
        dispatch,
        api_key: config.api_key.clone(),
        uptime: Instant::now(),
        provider_name,
    };

    let app = build_router(state);

    let listener = match tokio::net::TcpListener::bind(&config.bind).await {
        Ok(l) => l,
        Err(e) => {
            error!("API server failed to bind to {}: {e}", config.bind);
            return;
        }
    };

    info!("API server listening on {}", config.bind);

    if let Err(e) = axum::serve(listener, app).await {
        error!("API server error: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use rapport_connectors::InMemoryConnector;
    use rapport_core::config::MonitorConfig;
    use rapport_core::traits::Connector;
    use rapport_engine::RecommendationStore;
    use rapport_providers::{adapter::AnalysisAdapter, rule_only::RuleOnlyProvider};
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn test_router(api_key: Option<String>) -> Router {
        let connector = Arc::new(InMemoryConnector::new("manual"));
        let mut connectors: HashMap<String, Arc<dyn Connector>> = HashMap::new();
        connectors.insert("manual".to_string(), connector as Arc<dyn Connector>);

        let store = Arc::new(RecommendationStore::new());
        let dispatch = Arc::new(DispatchGateway::new(store.clone()));
        let manager = Arc::new(SessionManager::new(
            connectors,
            Arc::new(AnalysisAdapter::new(Arc::new(RuleOnlyProvider), 1)),
            store,
            dispatch.clone(),
            MonitorConfig::default(),
        ));

        build_router(ApiState {
            manager,
            dispatch,
            api_key,
            uptime: Instant::now(),
            provider_name: "rule-only".to_string(),
        })
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_without_auth_configured() {
        let app = test_router(None);
        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["provider"], "rule-only");
    }

    #[tokio::test]
    async fn test_auth_rejects_missing_and_wrong_token() {
        let app = test_router(Some("secret".to_string()));

        let missing = app
            .clone()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let wrong = app
            .clone()
            .oneshot(
                Request::get("/api/health")
                    .header("Authorization", "Bearer wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

        let right = app
            .oneshot(
                Request::get("/api/health")
                    .header("Authorization", "Bearer secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(right.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_start_then_list_then_stop_session() {
        let app = test_router(None);

        let created = app
            .clone()
            .oneshot(post_json(
                "/api/sessions",
                r#"{"user_id":"u1","platforms":["manual"]}"#,
            ))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let body = body_json(created).await;
        let session_id = body["session_id"].as_str().unwrap().to_string();

        let listed = app
            .clone()
            .oneshot(Request::get("/api/sessions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(listed).await;
        assert_eq!(body["sessions"].as_array().unwrap().len(), 1);

        let status = app
            .clone()
            .oneshot(
                Request::get(format!("/api/sessions/{session_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(status.status(), StatusCode::OK);
        let body = body_json(status).await;
        assert_eq!(body["user_id"], "u1");
        assert_eq!(body["state"], "active");

        let deleted = app
            .clone()
            .oneshot(
                Request::delete(format!("/api/sessions/{session_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(deleted).await;
        assert_eq!(body["stopped"], true);

        // Second delete is a harmless no-op.
        let again = app
            .oneshot(
                Request::delete(format!("/api/sessions/{session_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(again).await;
        assert_eq!(body["stopped"], false);
    }

    #[tokio::test]
    async fn test_start_session_empty_platforms_rejected() {
        let app = test_router(None);
        let response = app
            .oneshot(post_json(
                "/api/sessions",
                r#"{"user_id":"u1","platforms":[]}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let app = test_router(None);
        let response = app
            .oneshot(
                Request::get(format!("/api/sessions/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_submit_message_and_read_back() {
        let app = test_router(None);

        let created = app
            .clone()
            .oneshot(post_json(
                "/api/sessions",
                r#"{"user_id":"u1","platforms":["manual"]}"#,
            ))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);

        let accepted = app
            .clone()
            .oneshot(post_json(
                "/api/messages",
                r#"{"user_id":"u1","content":"are you free for dinner?","sender":"alice","platform":"manual"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(accepted.status(), StatusCode::ACCEPTED);
        let body = body_json(accepted).await;
        assert_eq!(body["delivered_to_sessions"], 1);

        // Consumer is async; poll the read endpoint until it shows up.
        let mut found = false;
        for _ in 0..250 {
            let read = app
                .clone()
                .oneshot(
                    Request::get("/api/users/u1/recommendations")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            let body = body_json(read).await;
            if !body["recommendations"].as_array().unwrap().is_empty() {
                found = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert!(found, "submitted message should yield recommendations");
    }

    #[tokio::test]
    async fn test_read_recommendations_unknown_user_empty() {
        let app = test_router(None);
        let response = app
            .oneshot(
                Request::get("/api/users/ghost/recommendations?limit=3")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["recommendations"].as_array().unwrap().is_empty());
    }
}
