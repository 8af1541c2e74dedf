//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use tracing::{error, info};

use crate::state::{app_state::CommandResult, AppState};
use super::responses::{ApiResponse, StatusResponse, HealthResponse};

/// Turn a command result into a response, logging failures
fn respond(command: &str, result: CommandResult) -> Result<Json<ApiResponse>, StatusCode> {
    match result {
        Ok((event, cycle)) => {
            if event.is_some() {
                info!("{} endpoint called - countdown {}s", command, cycle.countdown_seconds);
            }
            Ok(Json(ApiResponse::from_outcome(command, event, cycle)))
        }
        Err(e) => {
            error!("Failed to {}: {}", command, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /start - Begin a cycle from idle
pub async fn start_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    respond("start", state.start())
}

/// Handle POST /pause - Pause a running cycle
pub async fn pause_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    respond("pause", state.pause())
}

/// Handle POST /resume - Resume a paused cycle
pub async fn resume_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    respond("resume", state.resume())
}

/// Handle POST /reset - Return to idle from anywhere
pub async fn reset_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    respond("reset", state.reset())
}

/// Handle POST /toggle - Start, pause or resume, like the single main button
pub async fn toggle_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    respond("toggle", state.toggle())
}

/// Handle POST /lifecycle/background - The user stopped looking
pub async fn background_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    match state.entered_background() {
        Ok((_, cycle)) => Ok(Json(ApiResponse::applied("Entered background".to_string(), cycle))),
        Err(e) => {
            error!("Failed to enter background: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /lifecycle/foreground - The user is back; catch up from the wall clock
pub async fn foreground_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    match state.entered_foreground() {
        Ok((Some(event), cycle)) => Ok(Json(ApiResponse::from_outcome("foreground", Some(event), cycle))),
        Ok((None, cycle)) => Ok(Json(ApiResponse::applied("Entered foreground".to_string(), cycle))),
        Err(e) => {
            error!("Failed to enter foreground: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle GET /status - Return current cycle status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, StatusCode> {
    let cycle = match state.get_cycle_snapshot() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to get cycle state: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        cycle,
        foreground: state.is_foreground(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
