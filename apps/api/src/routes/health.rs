use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Liveness probe with server time and API version.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "TravelMind API is running",
        "timestamp": Utc::now().to_rfc3339(),
        "version": state.config.api_version
    }))
}

/// GET /api
pub async fn api_index_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "Welcome to TravelMind API",
        "version": state.config.api_version
    }))
}
