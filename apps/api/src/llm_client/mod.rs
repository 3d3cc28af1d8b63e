/// LLM Client: the single point of entry for every text-generation call.
///
/// ARCHITECTURAL RULE: No other module may call a provider API directly.
/// Routes and the travel planner go through `ProviderChain`, which tries each
/// configured provider in order (Groq → Hugging Face → Gemini) and returns the
/// first success.
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;

pub mod gemini;
pub mod groq;
pub mod huggingface;
mod openai;
pub mod prompts;

pub use gemini::GeminiProvider;
pub use groq::GroqProvider;
pub use huggingface::HuggingFaceProvider;

/// Generation calls can legitimately take a long time for multi-day plans.
const LLM_HTTP_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Groq,
    #[serde(rename = "huggingface")]
    HuggingFace,
    Gemini,
}

impl ProviderKind {
    pub fn env_var(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "GROQ_API_KEY",
            ProviderKind::HuggingFace => "HUGGINGFACE_TOKEN",
            ProviderKind::Gemini => "GEMINI_API_KEY",
        }
    }

    /// Remediation steps shown to the caller when the key is rejected.
    pub fn key_help(&self) -> String {
        match self {
            ProviderKind::Groq => format!(
                "To fix this:\n\
                 1. Go to: https://console.groq.com/keys\n\
                 2. Create a new API key (free tier available)\n\
                 3. Add it to the backend .env file as {}=your_key_here\n\
                 4. Restart the backend server",
                self.env_var()
            ),
            ProviderKind::HuggingFace => format!(
                "To fix this:\n\
                 1. Go to: https://huggingface.co/settings/tokens\n\
                 2. Create a NEW token (or edit the existing one)\n\
                 3. Select the 'Read' permission (required for the Inference API)\n\
                 4. Add it to the backend .env file as {}=your_token_here\n\
                 5. Restart the backend server",
                self.env_var()
            ),
            ProviderKind::Gemini => format!(
                "To fix this:\n\
                 1. Go to: https://makersuite.google.com/app/apikey\n\
                 2. Create a new API key\n\
                 3. Add it to the backend .env file as {}=your_key_here\n\
                 4. Restart the backend server",
                self.env_var()
            ),
        }
    }

    pub fn rate_limit_note(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "Free tier limits: 30 requests/minute",
            ProviderKind::HuggingFace => "The free Inference API is shared and throttled",
            ProviderKind::Gemini => "Free tier limits: 15 requests/minute, 1,500 requests/day",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::Groq => "Groq",
            ProviderKind::HuggingFace => "Hugging Face",
            ProviderKind::Gemini => "Gemini",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{kind} HTTP error: {source}")]
    Http {
        kind: ProviderKind,
        #[source]
        source: reqwest::Error,
    },

    #[error("{kind} API error (status {status}): {message}")]
    Api {
        kind: ProviderKind,
        status: u16,
        message: String,
    },

    #[error("Invalid {kind} API key.\n\n{}", .kind.key_help())]
    InvalidKey { kind: ProviderKind },

    #[error("{kind} API rate limit exceeded.\n\n{}\nPlease wait a moment and try again.", .kind.rate_limit_note())]
    RateLimited { kind: ProviderKind },

    #[error("{kind} returned empty content")]
    EmptyContent { kind: ProviderKind },

    #[error("Unexpected response format from {kind}: {detail}")]
    UnexpectedResponse { kind: ProviderKind, detail: String },

    #[error(
        "No AI provider is configured. Set GROQ_API_KEY, HUGGINGFACE_TOKEN or GEMINI_API_KEY \
         in the backend .env file and restart the server."
    )]
    NotConfigured,

    /// Every provider in the chain failed; carries the last failure.
    #[error("{last}")]
    AllProvidersFailed {
        attempted: Vec<ProviderKind>,
        last: Box<LlmError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_tokens: 500,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Uniform result shape for every provider.
#[derive(Debug, Clone, Serialize)]
pub struct Completion {
    pub content: String,
    pub usage: Usage,
    pub provider: ProviderKind,
    pub model: String,
}

/// A text-generation backend. Implement this to add a provider to the chain.
#[async_trait]
pub trait Provider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn default_model(&self) -> &str;

    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        options: &GenerationOptions,
    ) -> Result<Completion, LlmError>;
}

/// Ordered list of providers, tried in sequence until one succeeds.
#[derive(Clone, Default)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self { providers }
    }

    /// Builds the chain from whichever provider keys are configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = http_client(LLM_HTTP_TIMEOUT)?;
        let mut providers: Vec<Arc<dyn Provider>> = Vec::new();

        if let Some(key) = &config.groq_api_key {
            providers.push(Arc::new(GroqProvider::new(client.clone(), key.clone())));
        }
        if let Some(token) = &config.huggingface_token {
            providers.push(Arc::new(HuggingFaceProvider::new(
                client.clone(),
                token.clone(),
            )));
        }
        if let Some(key) = &config.gemini_api_key {
            providers.push(Arc::new(GeminiProvider::new(client, key.clone())));
        }

        let chain = Self::new(providers);
        if chain.is_empty() {
            warn!("No LLM provider keys configured; generation endpoints will fail");
        } else {
            info!("LLM provider chain: {}", chain.describe());
        }
        Ok(chain)
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn describe(&self) -> String {
        self.providers
            .iter()
            .map(|p| p.kind().to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// Tries each provider in order. A failing provider logs a warning and
    /// falls through to the next one; the last error is returned if all fail.
    /// The model hint only applies to the first provider, since model names
    /// are not portable between vendors.
    pub async fn generate(
        &self,
        messages: &[ChatMessage],
        model_hint: Option<&str>,
        options: &GenerationOptions,
    ) -> Result<Completion, LlmError> {
        let mut attempted = Vec::with_capacity(self.providers.len());
        let mut last_error: Option<LlmError> = None;

        for (i, provider) in self.providers.iter().enumerate() {
            let kind = provider.kind();
            let model = match model_hint {
                Some(hint) if i == 0 => hint,
                _ => provider.default_model(),
            };
            attempted.push(kind);

            match provider.complete(messages, model, options).await {
                Ok(completion) => {
                    debug!(
                        "{} call succeeded: model={}, prompt_tokens={}, completion_tokens={}",
                        kind,
                        completion.model,
                        completion.usage.prompt_tokens,
                        completion.usage.completion_tokens
                    );
                    return Ok(completion);
                }
                Err(e) => {
                    warn!("{kind} provider failed, falling back to the next provider: {e}");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(last) => Err(LlmError::AllProvidersFailed {
                attempted,
                last: Box::new(last),
            }),
            None => Err(LlmError::NotConfigured),
        }
    }
}

/// Shared reqwest client for outbound API calls.
pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

/// Sends a request and converts non-2xx statuses into typed errors.
pub(crate) async fn send_checked(
    kind: ProviderKind,
    request: RequestBuilder,
) -> Result<Response, LlmError> {
    let response = request
        .send()
        .await
        .map_err(|source| LlmError::Http { kind, source })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(classify_failure(kind, status.as_u16(), &body))
}

/// Maps a failed provider response onto an actionable error.
pub(crate) fn classify_failure(kind: ProviderKind, status: u16, body: &str) -> LlmError {
    let message = extract_error_message(body);
    let lowered = message.to_lowercase();

    if status == 401
        || status == 403
        || lowered.contains("invalid api key")
        || lowered.contains("sufficient permissions")
    {
        return LlmError::InvalidKey { kind };
    }

    if status == 429 || lowered.contains("rate limit") || lowered.contains("quota") {
        return LlmError::RateLimited { kind };
    }

    LlmError::Api {
        kind,
        status,
        message,
    }
}

/// Pulls a human-readable message out of the common provider error shapes:
/// `{"error": {"message": ..}}`, `{"error": ".."}` or a raw text body.
fn extract_error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| v.get("error"))
        .and_then(|e| {
            e.get("message")
                .and_then(|m| m.as_str())
                .or_else(|| e.as_str())
        })
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}
