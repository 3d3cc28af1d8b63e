use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{AuthBackend, AuthError, SignIn, SignUp};
use crate::config::SupabaseConfig;
use crate::models::user::{AuthUser, Session, UserMetadata};

/// Users fetched per page when searching by email.
const ADMIN_PAGE_SIZE: usize = 1000;
/// Upper bound on pages scanned by `find_user_by_email`.
const ADMIN_MAX_PAGES: usize = 50;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(flatten)]
    session: Session,
    user: AuthUser,
}

#[derive(Debug, Deserialize)]
struct UserList {
    #[serde(default)]
    users: Vec<AuthUser>,
}

/// GoTrue REST client authenticated with the service-role key.
pub struct SupabaseAuth {
    client: Client,
    base_url: String,
    service_role_key: String,
    api_key: String,
}

impl SupabaseAuth {
    pub fn new(client: Client, config: &SupabaseConfig) -> Self {
        Self {
            client,
            base_url: format!("{}/auth/v1", config.url),
            service_role_key: config.service_role_key.clone(),
            api_key: config
                .anon_key
                .clone()
                .unwrap_or_else(|| config.service_role_key.clone()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Request carrying the public API key and the given bearer token.
    fn request(&self, method: reqwest::Method, path: &str, bearer: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    /// Admin request: service-role key as both API key and bearer.
    fn admin(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
    }
}

#[async_trait]
impl AuthBackend for SupabaseAuth {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> Result<SignUp, AuthError> {
        let response = send(
            self.request(reqwest::Method::POST, "/signup", &self.service_role_key)
                .json(&json!({ "email": email, "password": password, "data": metadata })),
        )
        .await?;
        let body: Value = response.json().await?;
        parse_sign_up(body)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignIn, AuthError> {
        let response = send(
            self.request(reqwest::Method::POST, "/token", &self.service_role_key)
                .query(&[("grant_type", "password")])
                .json(&json!({ "email": email, "password": password })),
        )
        .await?;
        let token: TokenResponse = response.json().await?;
        Ok(SignIn {
            user: token.user,
            session: token.session,
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        send(self.request(reqwest::Method::POST, "/logout", access_token)).await?;
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let response = send(self.request(reqwest::Method::GET, "/user", access_token)).await?;
        Ok(response.json().await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
        for page in 1..=ADMIN_MAX_PAGES {
            let response = send(self.admin(reqwest::Method::GET, "/admin/users").query(&[
                ("page", page.to_string()),
                ("per_page", ADMIN_PAGE_SIZE.to_string()),
            ]))
            .await?;
            let list: UserList = response.json().await?;
            let count = list.users.len();

            if let Some(user) = list
                .users
                .into_iter()
                .find(|u| u.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email)))
            {
                return Ok(Some(user));
            }
            if count < ADMIN_PAGE_SIZE {
                break;
            }
        }
        Ok(None)
    }

    async fn resend_signup_email(&self, email: &str) -> Result<(), AuthError> {
        send(
            self.request(reqwest::Method::POST, "/resend", &self.service_role_key)
                .json(&json!({ "type": "signup", "email": email })),
        )
        .await?;
        Ok(())
    }

    async fn send_password_reset(&self, email: &str, redirect_to: &str) -> Result<(), AuthError> {
        send(
            self.request(reqwest::Method::POST, "/recover", &self.service_role_key)
                .query(&[("redirect_to", redirect_to)])
                .json(&json!({ "email": email })),
        )
        .await?;
        Ok(())
    }

    async fn update_password(&self, user_id: &str, password: &str) -> Result<(), AuthError> {
        send(
            self.admin(reqwest::Method::PUT, &format!("/admin/users/{user_id}"))
                .json(&json!({ "password": password })),
        )
        .await?;
        Ok(())
    }
}

/// Sends the request and turns non-2xx answers into `AuthError::Rejected`.
async fn send(request: RequestBuilder) -> Result<Response, AuthError> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    debug!("Auth service returned {status}: {body}");
    Err(AuthError::rejected(status.as_u16(), error_message(&body)))
}

/// GoTrue error bodies use `msg`, `error_description`, `message` or `error`.
fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            ["msg", "error_description", "message", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(Value::as_str))
        })
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}

/// Signup returns a token bundle with a nested `user` when the account is
/// usable right away, or the bare user object when confirmation is pending.
fn parse_sign_up(body: Value) -> Result<SignUp, AuthError> {
    if body.get("access_token").is_some() {
        let token: TokenResponse = serde_json::from_value(body)
            .map_err(|e| AuthError::UnexpectedResponse(e.to_string()))?;
        return Ok(SignUp {
            user: token.user,
            session: Some(token.session),
        });
    }

    let user_value = body.get("user").cloned().unwrap_or(body);
    let user: AuthUser = serde_json::from_value(user_value)
        .map_err(|e| AuthError::UnexpectedResponse(e.to_string()))?;
    Ok(SignUp {
        user,
        session: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sign_up_pending_confirmation() {
        let signup = parse_sign_up(json!({
            "id": "11111111-2222",
            "email": "ana@example.com",
            "email_confirmed_at": null,
            "confirmation_sent_at": "2025-05-01T10:00:00Z",
            "user_metadata": {"name": "Ana Levi"}
        }))
        .unwrap();
        assert!(signup.session.is_none());
        assert_eq!(signup.user.id, "11111111-2222");
        assert_eq!(signup.user.display_name(), "Ana Levi");
    }

    #[test]
    fn test_parse_sign_up_with_session() {
        let signup = parse_sign_up(json!({
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "r1",
            "user": {"id": "abc", "email": "ana@example.com", "email_confirmed_at": "2025-05-01T10:00:00Z"}
        }))
        .unwrap();
        let session = signup.session.unwrap();
        assert_eq!(session.access_token, "jwt");
        assert_eq!(session.expires_in, Some(3600));
        assert!(signup.user.is_email_verified());
    }

    #[test]
    fn test_parse_sign_up_garbage() {
        assert!(matches!(
            parse_sign_up(json!({"unexpected": true})),
            Err(AuthError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(
            error_message(r#"{"code": 400, "error_code": "email_not_confirmed", "msg": "Email not confirmed"}"#),
            "Email not confirmed"
        );
        assert_eq!(
            error_message(r#"{"error": "invalid_grant", "error_description": "Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_urls_use_auth_v1_prefix() {
        let auth = SupabaseAuth::new(
            Client::new(),
            &SupabaseConfig {
                url: "https://proj.supabase.co".to_string(),
                service_role_key: "service".to_string(),
                anon_key: None,
            },
        );
        assert_eq!(auth.url("/signup"), "https://proj.supabase.co/auth/v1/signup");
        assert_eq!(auth.api_key, "service");
    }
}
