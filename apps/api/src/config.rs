use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Every third-party key is optional; missing keys degrade to the next
/// provider or image source, or to a configuration error on the routes
/// that need them.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub api_version: String,
    pub groq_api_key: Option<String>,
    pub huggingface_token: Option<String>,
    pub gemini_api_key: Option<String>,
    pub google_places_api_key: Option<String>,
    pub unsplash_access_key: Option<String>,
    pub supabase: Option<SupabaseConfig>,
    /// Redirect target embedded in password reset emails.
    pub frontend_url: String,
}

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub service_role_key: String,
    pub anon_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let supabase = match (
            optional_env("SUPABASE_URL"),
            optional_env("SUPABASE_SERVICE_ROLE_KEY"),
        ) {
            (Some(url), Some(service_role_key)) => Some(SupabaseConfig {
                url: url.trim_end_matches('/').to_string(),
                service_role_key,
                anon_key: optional_env("SUPABASE_ANON_KEY"),
            }),
            _ => None,
        };

        Ok(Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            api_version: optional_env("API_VERSION").unwrap_or_else(|| "v1".to_string()),
            groq_api_key: optional_env("GROQ_API_KEY"),
            huggingface_token: optional_env("HUGGINGFACE_TOKEN"),
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            google_places_api_key: optional_env("GOOGLE_PLACES_API_KEY"),
            unsplash_access_key: optional_env("UNSPLASH_ACCESS_KEY"),
            supabase,
            frontend_url: optional_env("FRONTEND_URL")
                .unwrap_or_else(|| "travelmind://reset-password".to_string()),
        })
    }

    /// A configuration with no third-party keys, used by tests.
    #[cfg(test)]
    pub fn bare() -> Self {
        Config {
            port: 3000,
            rust_log: "info".to_string(),
            api_version: "v1".to_string(),
            groq_api_key: None,
            huggingface_token: None,
            gemini_api_key: None,
            google_places_api_key: None,
            unsplash_access_key: None,
            supabase: None,
            frontend_url: "travelmind://reset-password".to_string(),
        }
    }
}

/// Reads an env var, treating unset and blank values the same.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
