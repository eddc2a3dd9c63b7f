use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::models::ClassifiedPolicy;
use crate::registry::{DispatchError, PolicyDispatcher, PolicyMirror};
use crate::weather::WeatherFeed;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub mirror: Arc<PolicyMirror>,
    /// None when no sender address is configured: write-intents are
    /// disabled, not attempted.
    pub dispatcher: Option<Arc<PolicyDispatcher>>,
    pub weather: Option<Arc<WeatherFeed>>,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/policies", get(get_policies))
        .route("/api/policies/:id", get(get_policy_by_id))
        .route("/api/policies/:id/purchase", post(purchase_policy))
        .route("/api/policies/:id/claim", post(claim_policy))
        .route("/api/weather", get(get_weather))
        .route("/ws", get(websocket_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ===== Route Handlers =====

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Classified, display-ordered policy list
async fn get_policies(State(state): State<AppState>) -> Json<PoliciesResponse> {
    let policies = state.mirror.classified(Utc::now().timestamp());
    Json(PoliciesResponse {
        count: policies.len(),
        submissions_enabled: state.dispatcher.is_some(),
        policies,
    })
}

/// Single classified policy
async fn get_policy_by_id(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ClassifiedPolicy>, ApiError> {
    let now = Utc::now().timestamp();
    state
        .mirror
        .classified(now)
        .into_iter()
        .find(|p| p.record.id == id)
        .map(Json)
        .ok_or(ApiError::NotFound(format!("Policy {} not found", id)))
}

/// Buy an open policy; premium rides as the attached value
async fn purchase_policy(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let dispatcher = state
        .dispatcher
        .as_ref()
        .ok_or(ApiError::SubmissionsDisabled)?;
    let record = state
        .mirror
        .policy(id)
        .ok_or(ApiError::NotFound(format!("Policy {} not found", id)))?;

    let tx_hash = dispatcher
        .purchase(&record, Utc::now().timestamp())
        .await?;
    Ok(Json(SubmissionResponse { id, tx_hash }))
}

/// Trigger settlement of a matured policy
async fn claim_policy(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let dispatcher = state
        .dispatcher
        .as_ref()
        .ok_or(ApiError::SubmissionsDisabled)?;
    let record = state
        .mirror
        .policy(id)
        .ok_or(ApiError::NotFound(format!("Policy {} not found", id)))?;

    let tx_hash = dispatcher.claim(&record, Utc::now().timestamp()).await?;
    Ok(Json(SubmissionResponse { id, tx_hash }))
}

/// Latest cached weather snapshot
async fn get_weather(State(state): State<AppState>) -> Result<Response, ApiError> {
    let feed = state.weather.as_ref().ok_or(ApiError::Unavailable(
        "weather feed not configured".to_string(),
    ))?;
    let snapshot = feed
        .latest()
        .ok_or(ApiError::Unavailable("no weather snapshot yet".to_string()))?;
    Ok(Json(snapshot).into_response())
}

// ===== WebSocket =====

async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Push mirror refresh events to the client until either side hangs up.
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let mut rx = state.mirror.subscribe();

    loop {
        tokio::select! {
            Ok(event) = rx.recv() => {
                let msg = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
                if socket.send(Message::Text(msg)).await.is_err() {
                    break;
                }
            }
            Some(Ok(msg)) = socket.recv() => {
                match msg {
                    Message::Text(text) if text == "ping" => {
                        let _ = socket.send(Message::Text("pong".to_string())).await;
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            else => break,
        }
    }
}

// ===== Response Types =====

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct PoliciesResponse {
    count: usize,
    submissions_enabled: bool,
    policies: Vec<ClassifiedPolicy>,
}

#[derive(Serialize)]
struct SubmissionResponse {
    id: u64,
    tx_hash: String,
}

// ===== Error Handling =====

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    /// Local fail-fast rejection: nothing was submitted.
    Rejected(String),
    /// The node or signer refused the submission.
    Upstream(String),
    /// Persistent informational state, not a transient error.
    SubmissionsDisabled,
    Unavailable(String),
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::NotPurchasable { .. } | DispatchError::NotClaimable { .. } => {
                ApiError::Rejected(err.to_string())
            }
            DispatchError::Submission { .. } => ApiError::Upstream(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Rejected(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::SubmissionsDisabled => (
                StatusCode::SERVICE_UNAVAILABLE,
                "submissions disabled: no sender address configured".to_string(),
            ),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
