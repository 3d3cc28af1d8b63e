//! Wire types for OpenAI-compatible `/chat/completions` endpoints (Groq and
//! the Hugging Face router both speak this dialect).

use serde::{Deserialize, Serialize};

use super::{ChatMessage, Usage};

#[derive(Debug, Serialize)]
pub(super) struct ChatCompletionsRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatCompletionsResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<UsageBody>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct UsageBody {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl From<UsageBody> for Usage {
    fn from(body: UsageBody) -> Self {
        Usage {
            prompt_tokens: body.prompt_tokens,
            completion_tokens: body.completion_tokens,
            total_tokens: body.total_tokens,
        }
    }
}

impl ChatCompletionsResponse {
    /// Text of the first choice, if any and non-blank.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|c| !c.trim().is_empty())
    }
}
