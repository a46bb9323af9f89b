pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use serde::Deserialize;
use std::error::Error as StdError;
use std::sync::Arc;
use super::{ LlmConfig, LlmType };
use self::anthropic::AnthropicChatClient;
use self::gemini::GeminiChatClient;
use self::ollama::OllamaClient;
use self::openai::OpenAIChatClient;
use crate::models::chat::ChatMessage;

#[derive(Deserialize, Debug, Clone)]
pub struct CompletionResponse {
    pub response: String,
}

/// Per-call knobs. `None` leaves the provider default in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Ask the provider for a JSON object instead of free text.
    pub json_response: bool,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends the whole conversation, system turn included, and returns the reply text.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
    fn get_llm_type(&self) -> LlmType;
}

pub fn new_client(
    config: &LlmConfig
) -> Result<Arc<dyn ChatClient>, Box<dyn StdError + Send + Sync>> {
    let client: Arc<dyn ChatClient> = match config.llm_type {
        LlmType::Ollama => {
            let specific_client = OllamaClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::OpenAI | LlmType::DeepSeek | LlmType::XAI | LlmType::Groq => {
            let specific_client = OpenAIChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::Gemini => {
            let specific_client = GeminiChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::Anthropic => {
            let specific_client = AnthropicChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
    };
    Ok(client)
}

/// Pulls a readable message out of a provider error body, falling back to the raw text.
pub(crate) fn provider_error_detail(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message").or(Some(e)))
                .and_then(|m| m.as_str().map(|s| s.to_string()))
        })
        .unwrap_or_else(|| body.chars().take(500).collect())
}

/// Turns a non-2xx response into an error carrying the provider's message.
pub(crate) async fn check_status(
    provider: LlmType,
    resp: reqwest::Response
) -> Result<reqwest::Response, Box<dyn StdError + Send + Sync>> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(format!("{} API error {}: {}", provider, status, provider_error_detail(&body)).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_builds_client_for_each_provider() {
        for (name, key) in [
            ("openai/gpt-4.1-nano", Some("k")),
            ("groq/llama-3.1-8b-instant", Some("k")),
            ("xai/grok-2-latest", Some("k")),
            ("deepseek/deepseek-chat", Some("k")),
            ("anthropic/claude-3-5-haiku-latest", Some("k")),
            ("gemini/gemini-1.5-flash", Some("k")),
            ("ollama/llama3", None),
        ] {
            let config = LlmConfig::from_model_name_with(
                name,
                key.map(String::from),
                None,
                |_| None
            ).unwrap();
            let client = new_client(&config).unwrap();
            assert_eq!(client.get_llm_type(), config.llm_type);
            assert_eq!(client.get_model(), config.model);
        }
    }

    #[test]
    fn factory_requires_credentials_for_hosted_providers() {
        let config = LlmConfig::from_model_name_with("openai/gpt-4.1-nano", None, None, |_| None).unwrap();
        let err = new_client(&config).err().unwrap();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn error_detail_prefers_provider_message() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(provider_error_detail(body), "Incorrect API key provided");
        assert_eq!(provider_error_detail(r#"{"error":"model not found"}"#), "model not found");
        assert_eq!(provider_error_detail("Bad Gateway"), "Bad Gateway");
    }
}
