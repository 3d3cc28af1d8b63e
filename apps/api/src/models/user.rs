use serde::{Deserialize, Serialize};

/// Profile fields stored in the auth provider's `user_metadata`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
}

/// A user as returned by the auth provider.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

impl AuthUser {
    pub fn is_email_verified(&self) -> bool {
        self.email_confirmed_at
            .as_deref()
            .is_some_and(|at| !at.is_empty())
    }

    /// Metadata name, else the email's local part, else "User".
    pub fn display_name(&self) -> String {
        self.user_metadata
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| {
                self.email
                    .as_deref()
                    .and_then(|e| e.split('@').next())
                    .filter(|local| !local.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "User".to_string())
    }
}

/// Token bundle handed back to the client untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub expires_at: Option<u64>,
}

/// The user object returned by signup and login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: Option<String>,
    pub name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub email_verified: bool,
}

impl UserProfile {
    pub fn from_user(user: &AuthUser, email_verified: bool) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.display_name(),
            first_name: user.user_metadata.first_name.clone(),
            last_name: user.user_metadata.last_name.clone(),
            date_of_birth: user.user_metadata.date_of_birth.clone(),
            email_verified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_auth_user_from_gotrue_payload() {
        let user: AuthUser = serde_json::from_value(json!({
            "id": "6f1c",
            "aud": "authenticated",
            "email": "ana@example.com",
            "email_confirmed_at": null,
            "user_metadata": {"firstName": "Ana", "lastName": "Levi", "dateOfBirth": "1990-04-02"}
        }))
        .unwrap();
        assert!(!user.is_email_verified());
        assert_eq!(user.user_metadata.first_name.as_deref(), Some("Ana"));
        assert_eq!(user.display_name(), "ana");
    }

    #[test]
    fn test_display_name_prefers_metadata() {
        let user = AuthUser {
            id: "1".to_string(),
            email: None,
            email_confirmed_at: Some("2025-01-01T00:00:00Z".to_string()),
            user_metadata: UserMetadata {
                name: Some("Ana Levi".to_string()),
                ..Default::default()
            },
        };
        assert!(user.is_email_verified());
        assert_eq!(user.display_name(), "Ana Levi");

        let anonymous = AuthUser {
            user_metadata: UserMetadata::default(),
            ..user
        };
        assert_eq!(anonymous.display_name(), "User");
    }
}
