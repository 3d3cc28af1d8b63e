//! Generic text-generation passthrough over the provider chain.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::errors::AppError;
use crate::llm_client::{ChatMessage, Completion, GenerationOptions};
use crate::models::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Option<Value>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: Option<Value>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_new_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// Caller overrides on top of the passthrough defaults. Zero tokens means
/// "use the default", as does a missing value.
fn options(max_tokens: Option<u32>, temperature: Option<f32>) -> GenerationOptions {
    let defaults = GenerationOptions::default();
    GenerationOptions {
        max_tokens: max_tokens.filter(|n| *n > 0).unwrap_or(defaults.max_tokens),
        temperature: temperature
            .filter(|t| t.is_finite())
            .unwrap_or(defaults.temperature),
    }
}

/// A non-empty array of `{role, content}` objects.
fn parse_messages(value: Option<Value>) -> Result<Vec<ChatMessage>, AppError> {
    let items = match value {
        Some(Value::Array(items)) if !items.is_empty() => items,
        _ => return Err(AppError::Validation("Messages array is required".to_string())),
    };
    serde_json::from_value(Value::Array(items))
        .map_err(|e| AppError::Validation(format!("Invalid messages: {e}")))
}

/// POST /api/ai/chat
pub async fn handle_chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Completion>>, AppError> {
    let Json(req) = body.map_err(|e| AppError::Validation(e.body_text()))?;
    let messages = parse_messages(req.messages)?;

    let completion = state
        .llm
        .generate(
            &messages,
            req.model.as_deref(),
            &options(req.max_tokens, req.temperature),
        )
        .await?;
    Ok(Json(ApiResponse::ok(completion)))
}

/// POST /api/ai/generate
pub async fn handle_generate(
    State(state): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Completion>>, AppError> {
    let Json(req) = body.map_err(|e| AppError::Validation(e.body_text()))?;
    let prompt = req
        .prompt
        .and_then(|p| p.as_str().map(str::to_string))
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Prompt is required and must be a string".to_string()))?;

    let completion = state
        .llm
        .generate(
            &[ChatMessage::user(prompt)],
            req.model.as_deref(),
            &options(req.max_new_tokens, req.temperature),
        )
        .await?;
    Ok(Json(ApiResponse::ok(completion)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_fall_back_to_defaults() {
        let opts = options(None, None);
        assert_eq!(opts.max_tokens, 500);
        assert_eq!(opts.temperature, 0.7);

        let opts = options(Some(0), Some(0.2));
        assert_eq!(opts.max_tokens, 500);
        assert_eq!(opts.temperature, 0.2);

        assert_eq!(options(Some(1200), None).max_tokens, 1200);
    }

    #[test]
    fn test_parse_messages() {
        use serde_json::json;

        let messages = parse_messages(Some(json!([
            {"role": "system", "content": "Be brief."},
            {"role": "user", "content": "Best time to visit Kyoto?"}
        ])))
        .unwrap();
        assert_eq!(messages.len(), 2);

        for bad in [None, Some(json!([])), Some(json!("hello"))] {
            let err = parse_messages(bad).unwrap_err();
            assert_eq!(err.to_string(), "Messages array is required");
        }
        assert!(parse_messages(Some(json!([{"role": "robot", "content": "x"}]))).is_err());
    }
}
