use serde::{Deserialize, Serialize};

use crate::catalog::{self, ModelFamily};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are ChatGPT, a large language model trained by \
OpenAI. Follow the user's instructions carefully. Respond using markdown.";
pub const DEFAULT_TEMPERATURE: f32 = 1.0;

/// Fixed ceiling sent with every completion request.
pub const MAX_COMPLETION_TOKENS: u32 = 1000;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestedModel {
    pub id: String,
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatStreamRequest {
    pub model: RequestedModel,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub key: Option<String>,
    pub messages: Vec<ChatMessage>,
}

/// Body of `POST /api/models`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelListRequest {
    #[serde(default)]
    pub key: Option<String>,
}

/// Everything the issuer needs for one upstream completion call. Built once
/// per request and discarded after it.
#[derive(Debug, Clone)]
pub struct CompletionSpec {
    pub model_id: String,
    pub family: ModelFamily,
    pub system_prompt: String,
    pub temperature: f32,
    pub messages: Vec<ChatMessage>,
}

impl ChatStreamRequest {
    /// Applies the prompt/temperature defaults and resolves the model's
    /// family from the catalog. Identifiers the catalog does not know fall
    /// back to the GPT-3.5 family; routing only needs the family.
    pub fn into_spec(self) -> CompletionSpec {
        let family = catalog::find_model(&self.model.id)
            .map(|card| card.family)
            .unwrap_or(ModelFamily::Gpt35);

        let system_prompt = match self.prompt {
            Some(prompt) if !prompt.trim().is_empty() => prompt,
            _ => DEFAULT_SYSTEM_PROMPT.to_owned(),
        };

        CompletionSpec {
            model_id: self.model.id,
            family,
            system_prompt,
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            messages: self.messages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(model_id: &str) -> ChatStreamRequest {
        ChatStreamRequest {
            model: RequestedModel {
                id: model_id.to_owned(),
            },
            prompt: None,
            temperature: None,
            key: None,
            messages: vec![ChatMessage {
                role: MessageRole::User,
                content: "hello".to_owned(),
            }],
        }
    }

    #[test]
    fn spec_defaults_prompt_and_temperature() {
        let spec = request("gpt-4").into_spec();
        assert_eq!(spec.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(spec.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(spec.family, ModelFamily::Gpt4);
    }

    #[test]
    fn blank_prompt_falls_back_to_default() {
        let mut incoming = request("gpt-3.5-turbo");
        incoming.prompt = Some("   ".to_owned());
        let spec = incoming.into_spec();
        assert_eq!(spec.system_prompt, DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn unknown_model_defaults_to_gpt35_family() {
        let spec = request("not-in-catalog").into_spec();
        assert_eq!(spec.family, ModelFamily::Gpt35);
        assert_eq!(spec.model_id, "not-in-catalog");
    }

    #[test]
    fn request_body_deserializes_with_optional_fields_missing() {
        let body = r#"{"model":{"id":"gpt-4"},"messages":[{"role":"user","content":"hi"}]}"#;
        let parsed: ChatStreamRequest = serde_json::from_str(body).expect("valid request body");
        assert!(parsed.prompt.is_none());
        assert!(parsed.key.is_none());
        assert_eq!(parsed.messages.len(), 1);
    }
}
