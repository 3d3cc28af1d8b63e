//! Google Gemini adapter (`generateContent` REST endpoint).
//!
//! Gemini has no system role: the system message is prepended to the first
//! user turn, and `assistant` turns are sent as `model`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{
    send_checked, ChatMessage, Completion, GenerationOptions, LlmError, Provider, ProviderKind,
    Role, Usage,
};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

pub struct GeminiProvider {
    client: Client,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(client: Client, api_key: String) -> Self {
        Self { client, api_key }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[async_trait]
impl Provider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        options: &GenerationOptions,
    ) -> Result<Completion, LlmError> {
        let body = GenerateContentRequest {
            contents: to_contents(messages),
            generation_config: GenerationConfig {
                max_output_tokens: options.max_tokens,
                temperature: options.temperature,
            },
        };

        let url = format!("{GEMINI_BASE_URL}/{model}:generateContent");
        let response = send_checked(
            ProviderKind::Gemini,
            self.client
                .post(url)
                .query(&[("key", self.api_key.as_str())])
                .json(&body),
        )
        .await?;

        let parsed: GenerateContentResponse =
            response.json().await.map_err(|source| LlmError::Http {
                kind: ProviderKind::Gemini,
                source,
            })?;

        into_completion(parsed, model)
    }
}

/// Converts chat messages into Gemini turns.
fn to_contents(messages: &[ChatMessage]) -> Vec<Content> {
    let system = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut contents: Vec<Content> = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| Content {
            role: Some(match m.role {
                Role::Assistant => "model".to_string(),
                _ => "user".to_string(),
            }),
            parts: vec![Part {
                text: m.content.clone(),
            }],
        })
        .collect();

    if !system.is_empty() {
        match contents.first_mut() {
            Some(first) if first.role.as_deref() == Some("user") => {
                if let Some(part) = first.parts.first_mut() {
                    part.text = format!("{system}\n\n{}", part.text);
                }
            }
            _ => contents.insert(
                0,
                Content {
                    role: Some("user".to_string()),
                    parts: vec![Part { text: system }],
                },
            ),
        }
    }

    contents
}

fn into_completion(parsed: GenerateContentResponse, model: &str) -> Result<Completion, LlmError> {
    let kind = ProviderKind::Gemini;
    let content = parsed
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|c| {
            c.parts
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .filter(|t| !t.trim().is_empty())
        .ok_or(LlmError::EmptyContent { kind })?;

    let usage = parsed.usage_metadata.unwrap_or_default();

    Ok(Completion {
        content,
        usage: Usage {
            prompt_tokens: usage.prompt_token_count,
            completion_tokens: usage.candidates_token_count,
            total_tokens: usage.total_token_count,
        },
        provider: kind,
        model: model.to_string(),
    })
}
