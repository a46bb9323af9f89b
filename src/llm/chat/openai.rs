use async_trait::async_trait;
use log::debug;
use reqwest::{Client as HttpClient, header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION}};
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;

use super::{check_status, ChatClient, CompletionOptions, CompletionResponse};
use crate::llm::{LlmConfig, LlmType};
use crate::models::chat::ChatMessage;

/// Client for OpenAI and the providers that speak its chat-completions dialect
/// (Groq, xAI, DeepSeek).
pub struct OpenAIChatClient {
    http: HttpClient,
    llm_type: LlmType,
    model: String,
    base_url: String,
}

#[derive(Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

impl OpenAIChatClient {
    pub fn new(
        llm_type: LlmType,
        api_key: String,
        model: String,
        base_url: Option<String>,
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let api_url = base_url
            .unwrap_or_else(|| llm_type.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string();
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| format!("Invalid API key format: {}", e))?
        );

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Box::new(e) as Box<dyn StdError + Send + Sync>)?;

        Ok(Self {
            http,
            llm_type,
            model,
            base_url: api_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let api_key = config.require_api_key()?;
        Self::new(
            config.llm_type,
            api_key,
            config.model.clone(),
            config.base_url.clone(),
        )
    }

    fn build_request(&self, messages: &[ChatMessage], options: &CompletionOptions) -> OpenAIChatRequest {
        OpenAIChatRequest {
            model: self.model.clone(),
            messages: messages
                .iter()
                .map(|m| OpenAIMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            temperature: options.temperature,
            response_format: options.json_response.then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
            max_tokens: options.max_tokens,
        }
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        let url = format!("{}/chat/completions", self.base_url);
        let req = self.build_request(messages, options);
        debug!("{} chat request: model={} messages={}", self.llm_type, self.model, messages.len());

        let resp = self.http.post(&url).json(&req).send().await?;
        let resp = check_status(self.llm_type, resp).await?;
        let body = resp.json::<OpenAIResponse>().await?;

        let content = body.choices
            .into_iter()
            .next()
            .ok_or_else(|| format!("No response from {} API", self.llm_type))?
            .message.content
            .unwrap_or_default();

        Ok(CompletionResponse { response: content })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }

    fn get_llm_type(&self) -> LlmType {
        self.llm_type
    }
}
