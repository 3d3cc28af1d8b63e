use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::llm_client::LlmError;
use crate::travel::recovery::RecoveryError;
use crate::travel::validation::PlanError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// Every variant renders as `{"success": false, "error": "<message>"}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Please verify your email address before logging in. Check your inbox for the verification email.")]
    EmailNotVerified,

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Recovery(#[from] RecoveryError),

    #[error(transparent)]
    InvalidPlan(#[from] PlanError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::EmailNotVerified => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Llm(_)
            | AppError::Recovery(_)
            | AppError::InvalidPlan(_)
            | AppError::Auth(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            AppError::Llm(LlmError::AllProvidersFailed { attempted, last }) => {
                tracing::error!("All LLM providers failed ({attempted:?}); last error: {last}");
                self.to_string()
            }
            AppError::Llm(e) => {
                tracing::error!("LLM error: {e}");
                self.to_string()
            }
            AppError::Recovery(e) => {
                tracing::error!("AI response recovery failed: {}", e.cause);
                self.to_string()
            }
            AppError::InvalidPlan(e) => {
                tracing::error!("Invalid travel plan: {e}");
                self.to_string()
            }
            AppError::Auth(e) => {
                tracing::error!("Auth service error: {e}");
                self.to_string()
            }
            AppError::Config(msg) => {
                tracing::error!("Configuration error: {msg}");
                msg.clone()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An internal server error occurred".to_string()
            }
            _ => self.to_string(),
        };

        let body = if matches!(self, AppError::EmailNotVerified) {
            json!({
                "success": false,
                "error": message,
                "needsEmailVerification": true
            })
        } else {
            json!({
                "success": false,
                "error": message
            })
        };

        (status, Json(body)).into_response()
    }
}
