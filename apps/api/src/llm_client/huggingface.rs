//! Hugging Face adapter, via the router's OpenAI-compatible endpoint.
//!
//! Some hosted models still answer in the legacy text-generation shapes
//! (`{"generated_text": ..}` or `[{"generated_text": ..}]`); both are accepted.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::openai::{ChatCompletionsRequest, ChatCompletionsResponse};
use super::{
    send_checked, ChatMessage, Completion, GenerationOptions, LlmError, Provider, ProviderKind,
    Usage,
};

const HF_CHAT_URL: &str = "https://router.huggingface.co/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "meta-llama/Meta-Llama-3-8B-Instruct";

pub struct HuggingFaceProvider {
    client: Client,
    token: String,
}

impl HuggingFaceProvider {
    pub fn new(client: Client, token: String) -> Self {
        Self { client, token }
    }
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HfResponse {
    Chat(ChatCompletionsResponse),
    Generated(GeneratedText),
    GeneratedList(Vec<GeneratedText>),
}

#[async_trait]
impl Provider for HuggingFaceProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::HuggingFace
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
            ProviderKind::HuggingFace,
            self.client
                .post(HF_CHAT_URL)
                .bearer_auth(&self.token)
                .json(&body),
        )
        .await?;

        let text = response.text().await.map_err(|source| LlmError::Http {
            kind: ProviderKind::HuggingFace,
            source,
        })?;

        parse_response(&text, model)
    }
}

fn parse_response(text: &str, model: &str) -> Result<Completion, LlmError> {
    let kind = ProviderKind::HuggingFace;
    let parsed: HfResponse =
        serde_json::from_str(text).map_err(|e| LlmError::UnexpectedResponse {
            kind,
            detail: e.to_string(),
        })?;

    let (content, usage) = match parsed {
        HfResponse::Chat(chat) => {
            let content = chat.first_content().map(str::to_string);
            (content, chat.usage.unwrap_or_default().into())
        }
        HfResponse::Generated(g) => (Some(g.generated_text), Usage::default()),
        HfResponse::GeneratedList(list) => (
            list.into_iter().next().map(|g| g.generated_text),
            Usage::default(),
        ),
    };

    let content = content
        .filter(|c| !c.trim().is_empty())
        .ok_or(LlmError::EmptyContent { kind })?;

    Ok(Completion {
        content,
        usage,
        provider: kind,
        model: model.to_string(),
    })
}
