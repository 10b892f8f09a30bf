//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use tracing::{error, info};

use crate::{error::TimerError, services::Scope, state::AppState};
use super::responses::{
    ApiResponse, CreateTimerRequest, HealthResponse, OwnerView, ScopeQuery, StatusResponse,
};

type HandlerResult<T> = Result<Json<T>, (StatusCode, Json<ApiResponse>)>;

fn failure(action: &str, e: TimerError) -> (StatusCode, Json<ApiResponse>) {
    let status = match e {
        TimerError::DurationTooShort { .. } | TimerError::DurationTooLong { .. } => StatusCode::BAD_REQUEST,
        TimerError::Conflict { .. } => StatusCode::CONFLICT,
        TimerError::Store(_) | TimerError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error!("Failed to {}: {}", action, e);
    (status, Json(ApiResponse::error(e.to_string())))
}

fn scope_of(query: ScopeQuery) -> Scope {
    match query.owner {
        Some(owner) if !owner.is_empty() => Scope::Owner(owner),
        _ => Scope::All,
    }
}

/// Handle GET /timers - Room timers grouped per owner
pub async fn list_handler(State(state): State<Arc<AppState>>) -> HandlerResult<StatusResponse> {
    let groups = state
        .grouped_timers()
        .await
        .map_err(|e| failure("list timers", e))?;
    let now = state.now();
    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        participant: state.participant.display_name.clone(),
        owners: groups.into_iter().map(|g| OwnerView::at(g, now)).collect(),
        panel_open: state.is_panel_open(),
        uptime: state.get_uptime(),
        last_action,
        last_action_time,
    }))
}

/// Handle POST /timers - Set a new light
pub async fn create_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateTimerRequest>,
) -> HandlerResult<ApiResponse> {
    let timer = state
        .create_timer(request.name, request.duration_ms)
        .await
        .map_err(|e| failure("create timer", e))?;
    info!("Create endpoint called - timer {} created", timer.id);
    Ok(Json(ApiResponse::ok(
        format!("Timer {} created", timer.id),
        vec![timer],
        state.now(),
    )))
}

/// Handle DELETE /timers/:id - Remove a timer
pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> HandlerResult<ApiResponse> {
    let removed = state
        .delete_timer(&id)
        .await
        .map_err(|e| failure("delete timer", e))?;
    if !removed {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Timer {} not found", id))),
        ));
    }
    Ok(Json(ApiResponse::ok(format!("Timer {} deleted", id), Vec::new(), state.now())))
}

/// Handle POST /timers/start - Start or resume timers
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScopeQuery>,
) -> HandlerResult<ApiResponse> {
    let timers = state
        .start_timers(&scope_of(query))
        .await
        .map_err(|e| failure("start timers", e))?;
    Ok(Json(ApiResponse::ok("Timers started".to_string(), timers, state.now())))
}

/// Handle POST /timers/pause - Pause timers
pub async fn pause_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScopeQuery>,
) -> HandlerResult<ApiResponse> {
    let timers = state
        .pause_timers(&scope_of(query))
        .await
        .map_err(|e| failure("pause timers", e))?;
    Ok(Json(ApiResponse::ok("Timers paused".to_string(), timers, state.now())))
}

/// Handle POST /panel/open - Panel visible, badge not needed
pub async fn panel_open_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    state.set_panel_open(true);
    StatusCode::NO_CONTENT
}

/// Handle POST /panel/close - Panel hidden, badge shows the next burn-out
pub async fn panel_close_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    state.set_panel_open(false);
    StatusCode::NO_CONTENT
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
