//! Groq adapter (OpenAI-compatible chat completions).

use async_trait::async_trait;
use reqwest::Client;

use super::openai::{ChatCompletionsRequest, ChatCompletionsResponse};
use super::{send_checked, ChatMessage, Completion, GenerationOptions, LlmError, Provider, ProviderKind};

const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
/// 70B model; markedly fewer invented places than the 8B fallbacks.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

pub struct GroqProvider {
    client: Client,
    api_key: String,
}

impl GroqProvider {
    pub fn new(client: Client, api_key: String) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl Provider for GroqProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Groq
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
        let body = ChatCompletionsRequest {
            model,
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        let response = send_checked(
            ProviderKind::Groq,
            self.client
                .post(GROQ_CHAT_URL)
                .bearer_auth(&self.api_key)
                .json(&body),
        )
        .await?;

        let parsed: ChatCompletionsResponse =
            response.json().await.map_err(|source| LlmError::Http {
                kind: ProviderKind::Groq,
                source,
            })?;

        into_completion(parsed, model)
    }
}

fn into_completion(parsed: ChatCompletionsResponse, model: &str) -> Result<Completion, LlmError> {
    let content = parsed
        .first_content()
        .ok_or(LlmError::EmptyContent {
            kind: ProviderKind::Groq,
        })?
        .to_string();

    Ok(Completion {
        content,
        usage: parsed.usage.unwrap_or_default().into(),
        provider: ProviderKind::Groq,
        model: model.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_completion_reads_first_choice_and_usage() {
        let parsed: ChatCompletionsResponse = serde_json::from_str(
            r#"{
                "choices": [{"message": {"role": "assistant", "content": "{\"a\": 1}"}}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 5, "total_tokens": 17}
            }"#,
        )
        .unwrap();

        let completion = into_completion(parsed, DEFAULT_MODEL).unwrap();
        assert_eq!(completion.content, "{\"a\": 1}");
        assert_eq!(completion.usage.total_tokens, 17);
        assert_eq!(completion.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_into_completion_rejects_blank_content() {
        let parsed: ChatCompletionsResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": "  "}}]}"#).unwrap();
        assert!(matches!(
            into_completion(parsed, DEFAULT_MODEL),
            Err(LlmError::EmptyContent { .. })
        ));
    }

    #[test]
    fn test_request_serializes_openai_shape() {
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("hi")];
        let body = ChatCompletionsRequest {
            model: DEFAULT_MODEL,
            messages: &messages,
            max_tokens: 4000,
            temperature: 0.1,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], DEFAULT_MODEL);
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["max_tokens"], 4000);
    }
}
