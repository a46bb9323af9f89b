use async_trait::async_trait;
use log::debug;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;

use super::{check_status, ChatClient, CompletionOptions, CompletionResponse};
use crate::llm::{LlmConfig, LlmType};
use crate::models::chat::{ChatMessage, Role};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

pub struct GeminiChatClient {
    http: HttpClient,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiChatClient {
    pub fn new(
        api_key: String,
        model: String,
        base_url: Option<String>,
    ) -> Self {
        let base_url = base_url
            .unwrap_or_else(|| LlmType::Gemini.default_base_url().to_string())
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

    fn build_request(&self, messages: &[ChatMessage], options: &CompletionOptions) -> GeminiRequest {
        let system = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        // Gemini calls the assistant side "model".
        let contents = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| GeminiContent {
                role: Some(if m.role == Role::Assistant { "model" } else { "user" }.to_string()),
                parts: vec![GeminiPart { text: m.content.clone() }],
            })
            .collect();

        let generation_config = GenerationConfig {
            temperature: options.temperature,
            max_output_tokens: options.max_tokens,
            response_mime_type: options.json_response.then(|| "application/json".to_string()),
        };
        let has_config = generation_config.temperature.is_some()
            || generation_config.max_output_tokens.is_some()
            || generation_config.response_mime_type.is_some();

        GeminiRequest {
            system_instruction: (!system.is_empty()).then(|| GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: system }],
            }),
            contents,
            generation_config: has_config.then_some(generation_config),
        }
    }
}

#[async_trait]
impl ChatClient for GeminiChatClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let req = self.build_request(messages, options);
        debug!("gemini chat request: model={} contents={}", self.model, req.contents.len());

        // The key travels in a header so reqwest errors, which embed the URL, never carry it.
        let resp = self.http.post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| e.without_url())?;
        let resp = check_status(LlmType::Gemini, resp).await?;
        let body = resp.json::<GeminiResponse>().await.map_err(|e| e.without_url())?;

        let candidate = body.candidates
            .into_iter()
            .next()
            .ok_or_else(|| "No candidates in Gemini response".to_string())?;
        let text = candidate.content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<Vec<_>>().join(""))
            .unwrap_or_default();

        Ok(CompletionResponse { response: text })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }

    fn get_llm_type(&self) -> LlmType {
        LlmType::Gemini
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn maps_roles_and_system_instruction() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .and(header("x-goog-api-key", "g-key"))
            .and(body_json(json!({
                "systemInstruction": {"parts": [{"text": "Be warm."}]},
                "contents": [
                    {"role": "user", "parts": [{"text": "Hi"}]},
                    {"role": "model", "parts": [{"text": "Hello dear"}]},
                    {"role": "user", "parts": [{"text": "Soup?"}]}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"role": "model", "parts": [{"text": "Let's make soup."}]}}]
            })))
            .expect(1)
            .mount(&server).await;

        let client = GeminiChatClient::new("g-key".into(), "gemini-1.5-flash".into(), Some(server.uri()));
        let messages = vec![
            ChatMessage::system("Be warm."),
            ChatMessage::user("Hi"),
            ChatMessage::assistant("Hello dear"),
            ChatMessage::user("Soup?"),
        ];

        let resp = client.chat(&messages, &CompletionOptions::default()).await.unwrap();
        assert_eq!(resp.response, "Let's make soup.");
    }

    #[test]
    fn json_mode_sets_mime_type() {
        let client = GeminiChatClient::new("k".into(), "gemini-1.5-flash".into(), None);
        let options = CompletionOptions { json_response: true, ..Default::default() };
        let req = client.build_request(&[ChatMessage::user("x")], &options);
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
        assert!(value.get("systemInstruction").is_none());
    }

    #[tokio::test]
    async fn no_candidates_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server).await;

        let client = GeminiChatClient::new("k".into(), "gemini-1.5-flash".into(), Some(server.uri()));
        let messages = [ChatMessage::user("hi")];
        assert!(client.chat(&messages, &CompletionOptions::default()).await.is_err());
    }

    #[tokio::test]
    async fn transport_errors_do_not_leak_the_api_key() {
        // Nothing listens on port 9 on a test box.
        let client = GeminiChatClient::new(
            "SECRET-KEY-123".into(),
            "gemini-1.5-flash".into(),
            Some("http://127.0.0.1:9".into())
        );
        let messages = [ChatMessage::user("hi")];

        let err = client.chat(&messages, &CompletionOptions::default()).await.unwrap_err();

        assert!(!err.to_string().contains("SECRET-KEY-123"), "{}", err);
    }

    #[tokio::test]
    async fn decode_errors_do_not_leak_the_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server).await;
        let client = GeminiChatClient::new("SECRET-KEY-123".into(), "gemini-1.5-flash".into(), Some(server.uri()));
        let messages = [ChatMessage::user("hi")];

        let err = client.chat(&messages, &CompletionOptions::default()).await.unwrap_err();

        assert!(!err.to_string().contains("SECRET-KEY-123"), "{}", err);
        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].url.query().is_none());
    }
}
