//! Account management backed by a hosted auth service.
//!
//! Handlers only see `AuthBackend`; `SupabaseAuth` talks to the GoTrue REST
//! API with the service-role key. Profile fields live in `user_metadata`.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::user::{AuthUser, Session, UserMetadata};

pub mod handlers;
pub mod supabase;

pub use supabase::SupabaseAuth;

#[derive(Debug, Error)]
pub enum AuthError {
    /// The auth service answered with an error; `message` is its own text.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Auth service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected auth service response: {0}")]
    UnexpectedResponse(String),
}

impl AuthError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        AuthError::Rejected {
            status,
            message: message.into(),
        }
    }
}

/// Result of a signup. `session` is `None` while the email is unconfirmed.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub user: AuthUser,
    pub session: Option<Session>,
}

#[derive(Debug, Clone)]
pub struct SignIn {
    pub user: AuthUser,
    pub session: Session,
}

#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> Result<SignUp, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignIn, AuthError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    /// Resolves an access (or recovery) token to its user.
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError>;

    async fn resend_signup_email(&self, email: &str) -> Result<(), AuthError>;

    async fn send_password_reset(&self, email: &str, redirect_to: &str) -> Result<(), AuthError>;

    async fn update_password(&self, user_id: &str, password: &str) -> Result<(), AuthError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// In-memory backend. Tokens are `token-{user id}`.
    #[derive(Default)]
    pub struct FakeAuth {
        pub users: Mutex<Vec<(AuthUser, String)>>,
        pub resent: Mutex<Vec<String>>,
        pub reset_requests: Mutex<Vec<(String, String)>>,
        /// When set, signups get no session (email confirmation required).
        pub require_confirmation: bool,
    }

    impl FakeAuth {
        pub fn with_user(email: &str, password: &str, verified: bool) -> Self {
            let fake = FakeAuth::default();
            fake.users.lock().unwrap().push((
                AuthUser {
                    id: format!("user-{}", email.split('@').next().unwrap_or("x")),
                    email: Some(email.to_string()),
                    email_confirmed_at: verified.then(|| "2025-01-01T00:00:00Z".to_string()),
                    user_metadata: UserMetadata::default(),
                },
                password.to_string(),
            ));
            fake
        }

        pub fn token_for(user: &AuthUser) -> String {
            format!("token-{}", user.id)
        }

        fn session(user: &AuthUser) -> Session {
            Session {
                access_token: Self::token_for(user),
                refresh_token: Some("refresh".to_string()),
                token_type: Some("bearer".to_string()),
                expires_in: Some(3600),
                expires_at: None,
            }
        }
    }

    #[async_trait]
    impl AuthBackend for FakeAuth {
        async fn sign_up(
            &self,
            email: &str,
            password: &str,
            metadata: &UserMetadata,
        ) -> Result<SignUp, AuthError> {
            let mut users = self.users.lock().unwrap();
            if users.iter().any(|(u, _)| u.email.as_deref() == Some(email)) {
                return Err(AuthError::rejected(422, "User already registered"));
            }
            let user = AuthUser {
                id: format!("user-{}", users.len() + 1),
                email: Some(email.to_string()),
                email_confirmed_at: (!self.require_confirmation)
                    .then(|| "2025-01-01T00:00:00Z".to_string()),
                user_metadata: metadata.clone(),
            };
            users.push((user.clone(), password.to_string()));
            let session = (!self.require_confirmation).then(|| Self::session(&user));
            Ok(SignUp { user, session })
        }

        async fn sign_in(&self, email: &str, password: &str) -> Result<SignIn, AuthError> {
            let users = self.users.lock().unwrap();
            users
                .iter()
                .find(|(u, p)| u.email.as_deref() == Some(email) && p == password)
                .map(|(user, _)| SignIn {
                    user: user.clone(),
                    session: Self::session(user),
                })
                .ok_or_else(|| AuthError::rejected(400, "Invalid login credentials"))
        }

        async fn sign_out(&self, _access_token: &str) -> Result<(), AuthError> {
            Ok(())
        }

        async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
            let users = self.users.lock().unwrap();
            users
                .iter()
                .map(|(u, _)| u)
                .find(|u| Self::token_for(u) == access_token)
                .cloned()
                .ok_or_else(|| AuthError::rejected(401, "invalid JWT"))
        }

        async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
            let users = self.users.lock().unwrap();
            Ok(users
                .iter()
                .map(|(u, _)| u)
                .find(|u| u.email.as_deref() == Some(email))
                .cloned())
        }

        async fn resend_signup_email(&self, email: &str) -> Result<(), AuthError> {
            self.resent.lock().unwrap().push(email.to_string());
            Ok(())
        }

        async fn send_password_reset(
            &self,
            email: &str,
            redirect_to: &str,
        ) -> Result<(), AuthError> {
            self.reset_requests
                .lock()
                .unwrap()
                .push((email.to_string(), redirect_to.to_string()));
            Ok(())
        }

        async fn update_password(&self, user_id: &str, password: &str) -> Result<(), AuthError> {
            let mut users = self.users.lock().unwrap();
            let entry = users
                .iter_mut()
                .find(|(u, _)| u.id == user_id)
                .ok_or_else(|| AuthError::rejected(404, "User not found"))?;
            entry.1 = password.to_string();
            Ok(())
        }
    }
}
