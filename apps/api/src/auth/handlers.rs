use std::sync::{Arc, LazyLock};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::auth::{AuthBackend, AuthError};
use crate::errors::AppError;
use crate::models::user::{Session, UserMetadata, UserProfile};
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 8;
const RESET_EMAIL_SENT: &str =
    "If an account exists with this email, a password reset link has been sent.";

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex"));

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EmailRequest {
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub success: bool,
    pub user: UserProfile,
    pub session: Option<Session>,
    pub needs_email_confirmation: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: UserProfile,
    pub session: Session,
}

/// POST /api/auth/signup
pub async fn handle_signup(
    State(state): State<AppState>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Json<SignupResponse>, AppError> {
    let auth = backend(&state)?;
    let Json(req) = body.map_err(|e| AppError::Validation(e.body_text()))?;

    let (Some(email), Some(password)) = (present(req.email), present(req.password)) else {
        return Err(validation("Email and password are required"));
    };
    let (Some(first_name), Some(last_name)) = (present(req.first_name), present(req.last_name))
    else {
        return Err(validation("First name and last name are required"));
    };
    let Some(date_of_birth) = present(req.date_of_birth) else {
        return Err(validation("Date of birth is required"));
    };
    let email = normalize_email(&email)?;
    check_password(&password)?;

    let metadata = UserMetadata {
        name: Some(
            present(req.name).unwrap_or_else(|| format!("{first_name} {last_name}").trim().to_string()),
        ),
        first_name: Some(first_name),
        last_name: Some(last_name),
        date_of_birth: Some(date_of_birth),
    };

    let signup = auth
        .sign_up(&email, &password, &metadata)
        .await
        .map_err(|e| match e {
            AuthError::Rejected { message, .. } => {
                warn!("Signup rejected for {email}: {message}");
                AppError::Validation(signup_error_message(&message))
            }
            other => AppError::Auth(other),
        })?;
    info!("User created: {}", signup.user.id);

    let needs_email_confirmation = signup.session.is_none();
    let message = if needs_email_confirmation {
        "Account created! Please check your email to confirm your account."
    } else {
        "Account created successfully!"
    };

    Ok(Json(SignupResponse {
        success: true,
        user: UserProfile::from_user(&signup.user, !needs_email_confirmation),
        session: signup.session,
        needs_email_confirmation,
        message: message.to_string(),
    }))
}

/// POST /api/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let auth = backend(&state)?;
    let Json(req) = body.map_err(|e| AppError::Validation(e.body_text()))?;

    let (Some(email), Some(password)) = (present(req.email), present(req.password)) else {
        return Err(validation("Email and password are required"));
    };

    let signin = auth
        .sign_in(&email.trim().to_lowercase(), &password)
        .await
        .map_err(|e| match e {
            AuthError::Rejected { message, .. }
                if message.to_lowercase().contains("email not confirmed") =>
            {
                AppError::EmailNotVerified
            }
            AuthError::Rejected { message, .. } if !message.is_empty() => {
                AppError::Unauthorized(message)
            }
            AuthError::Rejected { .. } => AppError::Unauthorized("Invalid credentials".to_string()),
            other => AppError::Auth(other),
        })?;

    if !signin.user.is_email_verified() {
        return Err(AppError::EmailNotVerified);
    }

    Ok(Json(LoginResponse {
        success: true,
        user: UserProfile::from_user(&signin.user, true),
        session: signin.session,
    }))
}

/// POST /api/auth/logout
pub async fn handle_logout(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    if let (Some(token), Some(auth)) = (bearer_token(&headers), state.auth.as_ref()) {
        if let Err(e) = auth.sign_out(token).await {
            warn!("Sign-out failed: {e}");
        }
    }
    Json(json!({
        "success": true,
        "message": "Logged out successfully"
    }))
}

/// GET /api/auth/verify-status
pub async fn handle_verify_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let auth = backend(&state)?;
    let unverified = |error: &str| {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "verified": false, "error": error })),
        )
            .into_response()
    };

    let Some(token) = bearer_token(&headers) else {
        return Ok(unverified("Authorization token required"));
    };
    match auth.get_user(token).await {
        Ok(user) => Ok(Json(json!({ "verified": user.is_email_verified() })).into_response()),
        Err(AuthError::Rejected { .. }) => Ok(unverified("Invalid token")),
        Err(e) => Err(AppError::Auth(e)),
    }
}

/// POST /api/auth/resend-verification
/// Identifies the user by bearer token, or by `email` in the body.
pub async fn handle_resend_verification(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<EmailRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let auth = backend(&state)?;
    let email = body.ok().and_then(|Json(req)| present(req.email));

    let mut user = None;
    if let Some(token) = bearer_token(&headers) {
        user = auth.get_user(token).await.ok();
    }
    if user.is_none() {
        if let Some(email) = &email {
            user = auth
                .find_user_by_email(&email.trim().to_lowercase())
                .await
                .unwrap_or_else(|e| {
                    warn!("User lookup by email failed: {e}");
                    None
                });
        }
    }

    let Some(user) = user else {
        return Err(AppError::NotFound(
            if email.is_some() {
                "No account found with this email address"
            } else {
                "Authorization token or email required"
            }
            .to_string(),
        ));
    };

    if user.is_email_verified() {
        return Ok(Json(json!({
            "success": true,
            "message": "Email is already verified"
        })));
    }

    let Some(address) = user.email.as_deref() else {
        return Err(validation("Account has no email address"));
    };
    auth.resend_signup_email(address).await.map_err(|e| match e {
        AuthError::Rejected { message, .. } if !message.is_empty() => AppError::Validation(message),
        AuthError::Rejected { .. } => validation("Failed to resend verification email"),
        other => AppError::Auth(other),
    })?;

    Ok(Json(json!({
        "success": true,
        "message": "Verification email sent successfully"
    })))
}

/// POST /api/auth/forgot-password
/// Answers the same way whether or not the account exists.
pub async fn handle_forgot_password(
    State(state): State<AppState>,
    body: Result<Json<EmailRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let auth = backend(&state)?;
    let Json(req) = body.map_err(|e| AppError::Validation(e.body_text()))?;

    let Some(email) = present(req.email) else {
        return Err(validation("Email is required"));
    };
    let email = normalize_email(&email)?;

    if let Err(e) = auth
        .send_password_reset(&email, &state.config.frontend_url)
        .await
    {
        warn!("Password reset request failed: {e}");
    }

    Ok(Json(json!({
        "success": true,
        "message": RESET_EMAIL_SENT
    })))
}

/// POST /api/auth/reset-password
/// `token` is the recovery token from the reset email link.
pub async fn handle_reset_password(
    State(state): State<AppState>,
    body: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let auth = backend(&state)?;
    let Json(req) = body.map_err(|e| AppError::Validation(e.body_text()))?;

    let (Some(token), Some(password)) = (present(req.token), present(req.password)) else {
        return Err(validation("Token and password are required"));
    };
    check_password(&password)?;

    let user = auth.get_user(&token).await.map_err(|e| match e {
        AuthError::Rejected { .. } => AppError::Unauthorized(
            "Invalid or expired reset token. Please request a new password reset.".to_string(),
        ),
        other => AppError::Auth(other),
    })?;

    auth.update_password(&user.id, &password)
        .await
        .map_err(|e| match e {
            AuthError::Rejected { message, .. } if !message.is_empty() => {
                AppError::Validation(message)
            }
            AuthError::Rejected { .. } => validation("Failed to reset password"),
            other => AppError::Auth(other),
        })?;
    info!("Password reset for user {}", user.id);

    Ok(Json(json!({
        "success": true,
        "message": "Password has been reset successfully"
    })))
}

/// GET /api/auth/me
pub async fn handle_me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let auth = backend(&state)?;
    let Some(token) = bearer_token(&headers) else {
        return Err(AppError::Unauthorized("No token provided".to_string()));
    };

    let user = auth.get_user(token).await.map_err(|e| match e {
        AuthError::Rejected { .. } => AppError::Unauthorized("Invalid token".to_string()),
        other => AppError::Auth(other),
    })?;

    Ok(Json(json!({
        "success": true,
        "user": {
            "id": user.id,
            "email": user.email,
            "name": user.display_name()
        }
    })))
}

fn backend(state: &AppState) -> Result<&Arc<dyn AuthBackend>, AppError> {
    state.auth.as_ref().ok_or_else(|| {
        AppError::Config(
            "Authentication is not configured. Set SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY."
                .to_string(),
        )
    })
}

fn validation(message: &str) -> AppError {
    AppError::Validation(message.to_string())
}

/// Non-blank value, untrimmed (passwords keep their spaces).
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim();
    if !EMAIL.is_match(email) {
        return Err(validation("Please enter a valid email address"));
    }
    Ok(email.to_lowercase())
}

fn check_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(validation("Password must be at least 8 characters"));
    }
    Ok(())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Rewrites the auth service's signup errors into something a user can act on.
fn signup_error_message(upstream: &str) -> String {
    if upstream.contains("already registered") {
        "This email is already registered. Please sign in instead.".to_string()
    } else if upstream.contains("confirmation email") || upstream.contains("Error sending") {
        "Failed to send confirmation email. Check the SMTP settings of the auth service, \
         or disable email confirmations for development."
            .to_string()
    } else if upstream.to_lowercase().contains("invalid") {
        "Please enter a valid email address.".to_string()
    } else {
        upstream.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_email_shape() {
        assert!(normalize_email(" Ana@Example.com ").is_ok());
        assert_eq!(normalize_email("Ana@Example.com").unwrap(), "ana@example.com");
        for bad in ["ana", "ana@example", "ana @example.com", "@example.com"] {
            assert!(normalize_email(bad).is_err(), "{bad} accepted");
        }
    }

    #[test]
    fn test_password_length_counts_chars() {
        assert!(check_password("1234567").is_err());
        assert!(check_password("12345678").is_ok());
        assert!(check_password("ééééééé").is_err());
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_signup_error_rewrites() {
        assert_eq!(
            signup_error_message("User already registered"),
            "This email is already registered. Please sign in instead."
        );
        assert_eq!(
            signup_error_message("Unable to validate email address: invalid format"),
            "Please enter a valid email address."
        );
        assert!(signup_error_message("Error sending confirmation email").starts_with("Failed to send"));
        assert_eq!(signup_error_message("Signups not allowed"), "Signups not allowed");
    }
}
