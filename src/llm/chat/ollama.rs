use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use async_trait::async_trait;
use std::error::Error as StdError;
use super::{ check_status, ChatClient, CompletionOptions, CompletionResponse };
use crate::llm::{ LlmConfig, LlmType };
use crate::models::chat::ChatMessage;
use log::debug;

#[derive(Debug)]
pub struct OllamaClient {
    http: HttpClient,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}

impl OllamaClient {
    pub fn new(base_url: Option<String>, model: String) -> Self {
        let url = base_url
            .unwrap_or_else(|| LlmType::Ollama.default_base_url().into())
            .trim_end_matches('/')
            .to_string();

        Self {
            http: HttpClient::new(),
            base_url: url,
            model,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        if config.llm_type != LlmType::Ollama {
            return Err("Invalid config type for OllamaClient".into());
        }

        Ok(Self::new(config.base_url.clone(), config.model.clone()))
    }
}

#[async_trait]
impl ChatClient for OllamaClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        let url = format!("{}/api/chat", self.base_url);
        let ollama_options = if options.temperature.is_some() || options.max_tokens.is_some() {
            Some(OllamaOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens,
            })
        } else {
            None
        };
        let req = OllamaChatRequest {
            model: &self.model,
            messages,
            stream: false,
            format: options.json_response.then_some("json"),
            options: ollama_options,
        };
        debug!("ollama chat request: model={} messages={}", self.model, messages.len());

        let resp = self.http.post(&url).json(&req).send().await?;
        let resp = check_status(LlmType::Ollama, resp).await?;
        let data = resp.json::<OllamaChatResponse>().await?;
        Ok(CompletionResponse { response: data.message.content })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }

    fn get_llm_type(&self) -> LlmType {
        LlmType::Ollama
    }
}
