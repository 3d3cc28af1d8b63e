pub mod health;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::ai::handlers as ai;
use crate::auth::handlers as auth;
use crate::state::AppState;
use crate::travel::handlers as travel;

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Route not found" })),
    )
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api", get(health::api_index_handler))
        // Travel planning
        .route("/api/travel/plan", post(travel::handle_plan))
        // Text generation passthrough
        .route("/api/ai/chat", post(ai::handle_chat))
        .route("/api/ai/generate", post(ai::handle_generate))
        // Accounts
        .route("/api/auth/signup", post(auth::handle_signup))
        .route("/api/auth/login", post(auth::handle_login))
        .route("/api/auth/logout", post(auth::handle_logout))
        .route("/api/auth/verify-status", get(auth::handle_verify_status))
        .route(
            "/api/auth/resend-verification",
            post(auth::handle_resend_verification),
        )
        .route(
            "/api/auth/forgot-password",
            post(auth::handle_forgot_password),
        )
        .route("/api/auth/reset-password", post(auth::handle_reset_password))
        .route("/api/auth/me", get(auth::handle_me))
        .fallback(not_found)
        .with_state(state)
}
