//! Registry HTTP surface: register/discover/heartbeat/health routes.

use crate::auth::AuthedCaller;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{delete, get, post, put};
use axum::Router;
use registry::{AgentDiscoveryRequest, AgentRegistrationRequest, AgentStatus};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/discover", get(discover))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/:agent_id/heartbeat", post(heartbeat))
        .route("/:agent_id/status", put(update_status))
        .route("/:agent_id", get(get_agent).delete(deregister))
        .route("/", get(list_all))
        .with_state(state)
}

/// Registration is the one mutating route that never requires a token: a
/// brand-new agent has nothing to present yet. The response carries a fresh
/// bearer token scoped to the new `agent_id` for use on every other route.
async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AgentRegistrationRequest>,
) -> impl IntoResponse {
    let agent = match state.registry.register_agent(request).await {
        Ok(agent) => agent,
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": err.to_string()})),
            )
        }
    };
    match state.jwt.issue(&agent.agent_id, false) {
        Ok(token) => (
            StatusCode::CREATED,
            Json(json!({
                "agent_id": agent.agent_id,
                "status": agent.status.as_str(),
                "registered_at": agent.registered_at,
                "token": token,
            })),
        ),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": err.to_string()})),
        ),
    }
}

/// Checks that `auth` (`None` when auth is disabled) authorizes a mutating
/// call against `target_agent_id`, returning the same response shape the
/// caller's other branches use so it can be an early return.
fn authorize(
    auth: &AuthedCaller,
    target_agent_id: &str,
) -> Result<(), (StatusCode, Json<serde_json::Value>)> {
    match &auth.0 {
        None => Ok(()),
        Some(claims) if claims.authorizes(target_agent_id) => Ok(()),
        Some(_) => Err((
            StatusCode::FORBIDDEN,
            Json(json!({"error": "token does not authorize this agent_id"})),
        )),
    }
}

#[derive(Debug, Deserialize)]
struct DiscoverParams {
    capability: Option<String>,
    agent_type: Option<String>,
    status: Option<String>,
    tags: Option<String>,
}

async fn discover(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DiscoverParams>,
) -> impl IntoResponse {
    let status = match params.status {
        Some(raw) => AgentStatus::parse(&raw),
        None => Some(AgentStatus::Active),
    };
    let request = AgentDiscoveryRequest {
        capability: params.capability,
        agent_type: params.agent_type.as_deref().and_then(parse_agent_type),
        status,
        tags: params
            .tags
            .map(|t| t.split(',').map(str::to_string).collect())
            .unwrap_or_default(),
    };
    let agents = state.registry.discover_agents(&request).await;
    Json(json!({"count": agents.len(), "agents": agents}))
}

fn parse_agent_type(raw: &str) -> Option<registry::model::AgentType> {
    serde_json::from_value(serde_json::Value::String(raw.to_string())).ok()
}

async fn get_agent(State(state): State<Arc<AppState>>, Path(agent_id): Path<String>) -> impl IntoResponse {
    match state.registry.get_agent(&agent_id).await {
        Some(agent) => (StatusCode::OK, Json(serde_json::to_value(agent).unwrap())),
        None => (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))),
    }
}

async fn list_all(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let agents = state.registry.get_all_agents().await;
    Json(json!({"count": agents.len(), "agents": agents}))
}

#[derive(Debug, Deserialize, Default)]
struct HeartbeatBody {
    status: Option<String>,
}

async fn heartbeat(
    State(state): State<Arc<AppState>>,
    auth: AuthedCaller,
    Path(agent_id): Path<String>,
    body: Option<Json<HeartbeatBody>>,
) -> impl IntoResponse {
    if let Err(resp) = authorize(&auth, &agent_id) {
        return resp;
    }
    let status = body
        .and_then(|Json(b)| b.status)
        .and_then(|s| AgentStatus::parse(&s));
    match state.registry.update_heartbeat(&agent_id, status).await {
        Ok(Some(last_heartbeat)) => {
            (StatusCode::OK, Json(json!({"last_heartbeat": last_heartbeat})))
        }
        Ok(None) => (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": err.to_string()})),
        ),
    }
}

#[derive(Debug, Deserialize)]
struct StatusParams {
    new_status: String,
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    auth: AuthedCaller,
    Path(agent_id): Path<String>,
    Query(params): Query<StatusParams>,
) -> impl IntoResponse {
    if let Err(resp) = authorize(&auth, &agent_id) {
        return resp;
    }
    let Some(status) = AgentStatus::parse(&params.new_status) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid status"})),
        );
    };
    match state.registry.update_agent_status(&agent_id, status).await {
        Ok(true) => (StatusCode::OK, Json(json!({"new_status": status.as_str()}))),
        Ok(false) => (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": err.to_string()})),
        ),
    }
}

async fn deregister(
    State(state): State<Arc<AppState>>,
    auth: AuthedCaller,
    Path(agent_id): Path<String>,
) -> impl IntoResponse {
    if let Err(resp) = authorize(&auth, &agent_id) {
        return resp;
    }
    match state.registry.deregister_agent(&agent_id).await {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "deregistered"}))),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": err.to_string()})),
        ),
    }
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.registry.check_reachable().await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            tracing::warn!(error = %err, "health check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let agents = state.registry.get_all_agents().await;
    let mut by_status = std::collections::BTreeMap::new();
    let mut by_type = std::collections::BTreeMap::new();
    for agent in &agents {
        *by_status.entry(agent.status.as_str().to_string()).or_insert(0) += 1;
        *by_type.entry(format!("{:?}", agent.agent_type)).or_insert(0) += 1;
    }
    Json(json!({"total": agents.len(), "by_status": by_status, "by_type": by_type}))
}
