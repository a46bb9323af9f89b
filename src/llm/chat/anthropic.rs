use async_trait::async_trait;
use log::debug;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;

use super::{check_status, ChatClient, CompletionOptions, CompletionResponse};
use crate::llm::{LlmConfig, LlmType};
use crate::models::chat::{ChatMessage, Role};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct AnthropicChatClient {
    http: HttpClient,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Deserialize)]
struct AnthropicContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

impl AnthropicChatClient {
    pub fn new(
        api_key: String,
        model: String,
        base_url: Option<String>,
    ) -> Self {
        let base_url = base_url
            .unwrap_or_else(|| LlmType::Anthropic.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string();

        Self {
            http: HttpClient::new(),
            api_key,
            model,
            base_url,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let api_key = config.require_api_key()?;
        Ok(Self::new(api_key, config.model.clone(), config.base_url.clone()))
    }

    /// Anthropic takes the system prompt as a top-level field, not as a turn.
    fn build_request(&self, messages: &[ChatMessage], options: &CompletionOptions) -> AnthropicRequest {
        let system = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let turns = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| AnthropicMessage {
                role: if m.role == Role::Assistant { "assistant" } else { "user" },
                content: m.content.clone(),
            })
            .collect();

        AnthropicRequest {
            model: self.model.clone(),
            messages: turns,
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: if system.is_empty() { None } else { Some(system) },
            temperature: options.temperature,
        }
    }
}

#[async_trait]
impl ChatClient for AnthropicChatClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        let url = format!("{}/v1/messages", self.base_url);
        let req = self.build_request(messages, options);
        debug!("anthropic chat request: model={} messages={}", self.model, req.messages.len());

        let resp = self.http.post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&req)
            .send()
            .await?;
        let resp = check_status(LlmType::Anthropic, resp).await?;
        let body = resp.json::<AnthropicResponse>().await?;

        let text = body.content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(CompletionResponse { response: text })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }

    fn get_llm_type(&self) -> LlmType {
        LlmType::Anthropic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn system_prompt_moves_to_top_level_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_json(json!({
                "model": "claude-3-5-haiku-latest",
                "messages": [
                    {"role": "user", "content": "Hi"},
                    {"role": "assistant", "content": "Hello sweetheart"},
                    {"role": "user", "content": "Rice please"}
                ],
                "max_tokens": 4096,
                "system": "Be warm."
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_1",
                "content": [
                    {"type": "text", "text": "Rinse the rice, "},
                    {"type": "text", "text": "then simmer."}
                ]
            })))
            .expect(1)
            .mount(&server).await;

        let client = AnthropicChatClient::new(
            "test-key".into(),
            "claude-3-5-haiku-latest".into(),
            Some(server.uri())
        );
        let messages = vec![
            ChatMessage::system("Be warm."),
            ChatMessage::user("Hi"),
            ChatMessage::assistant("Hello sweetheart"),
            ChatMessage::user("Rice please"),
        ];

        let resp = client.chat(&messages, &CompletionOptions::default()).await.unwrap();
        assert_eq!(resp.response, "Rinse the rice, then simmer.");
    }

    #[tokio::test]
    async fn overloaded_provider_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_json(json!({
                "type": "error",
                "error": {"type": "overloaded_error", "message": "Overloaded"}
            })))
            .mount(&server).await;

        let client = AnthropicChatClient::new("k".into(), "claude".into(), Some(server.uri()));
        let err = client.chat(&[ChatMessage::user("hi")], &CompletionOptions::default()).await.err().unwrap();
        assert!(err.to_string().contains("Overloaded"));
    }
}
