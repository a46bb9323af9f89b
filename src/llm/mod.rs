pub mod chat;
use serde::{ Deserialize, Serialize };
use std::str::FromStr;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmType {
    Ollama,
    OpenAI,
    Anthropic,
    Gemini,
    DeepSeek,
    XAI,
    Groq,
}

impl LlmType {
    /// Environment variable holding this provider's credential.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            LlmType::Ollama => None,
            LlmType::OpenAI => Some("OPENAI_API_KEY"),
            LlmType::Anthropic => Some("ANTHROPIC_API_KEY"),
            LlmType::Gemini => Some("GEMINI_API_KEY"),
            LlmType::DeepSeek => Some("DEEPSEEK_API_KEY"),
            LlmType::XAI => Some("XAI_API_KEY"),
            LlmType::Groq => Some("GROQ_API_KEY"),
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            LlmType::Ollama => "http://localhost:11434",
            LlmType::OpenAI => "https://api.openai.com/v1",
            LlmType::Anthropic => "https://api.anthropic.com",
            LlmType::Gemini => "https://generativelanguage.googleapis.com",
            LlmType::DeepSeek => "https://api.deepseek.com/v1",
            LlmType::XAI => "https://api.x.ai/v1",
            LlmType::Groq => "https://api.groq.com/openai/v1",
        }
    }

    fn infer_from_model(model: &str) -> Option<LlmType> {
        let model = model.to_lowercase();
        if
            model.starts_with("gpt-") ||
            model.starts_with("o1") ||
            model.starts_with("o3") ||
            model.starts_with("o4") ||
            model.starts_with("chatgpt")
        {
            Some(LlmType::OpenAI)
        } else if model.starts_with("claude") {
            Some(LlmType::Anthropic)
        } else if model.starts_with("gemini") {
            Some(LlmType::Gemini)
        } else if model.starts_with("grok") {
            Some(LlmType::XAI)
        } else if model.starts_with("deepseek") {
            Some(LlmType::DeepSeek)
        } else {
            None
        }
    }
}

impl fmt::Display for LlmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LlmType::Ollama => "ollama",
            LlmType::OpenAI => "openai",
            LlmType::Anthropic => "anthropic",
            LlmType::Gemini => "gemini",
            LlmType::DeepSeek => "deepseek",
            LlmType::XAI => "xai",
            LlmType::Groq => "groq",
        };
        f.write_str(name)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseLlmTypeError {
    message: String,
}

impl fmt::Display for ParseLlmTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseLlmTypeError {}
impl FromStr for LlmType {
    type Err = ParseLlmTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" | "ollama_chat" => Ok(LlmType::Ollama),
            "openai" => Ok(LlmType::OpenAI),
            "anthropic" => Ok(LlmType::Anthropic),
            "gemini" | "google" => Ok(LlmType::Gemini),
            "deepseek" => Ok(LlmType::DeepSeek),
            "xai" => Ok(LlmType::XAI),
            "groq" => Ok(LlmType::Groq),
            _ =>
                Err(ParseLlmTypeError {
                    message: format!("Invalid LLM type: '{}'", s),
                }),
        }
    }
}

/// Splits a provider-prefixed model name such as `openai/gpt-4.1-nano`.
///
/// Names without a prefix are matched against well-known model families.
pub fn parse_model_name(model_name: &str) -> Result<(LlmType, String), ParseLlmTypeError> {
    let model_name = model_name.trim();
    if let Some((prefix, model)) = model_name.split_once('/') {
        let llm_type: LlmType = prefix.parse()?;
        if model.is_empty() {
            return Err(ParseLlmTypeError {
                message: format!("Model name '{}' has no model after the provider", model_name),
            });
        }
        return Ok((llm_type, model.to_string()));
    }

    LlmType::infer_from_model(model_name)
        .map(|llm_type| (llm_type, model_name.to_string()))
        .ok_or_else(|| ParseLlmTypeError {
            message: format!(
                "Cannot infer provider for model '{}'. Use a prefix like 'openai/{}'",
                model_name,
                model_name
            ),
        })
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub llm_type: LlmType,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: Option<String>,
}

impl LlmConfig {
    /// Builds a config from `MODEL_NAME` style input. An explicit key wins over
    /// the provider's environment variable.
    pub fn from_model_name(
        model_name: &str,
        api_key: Option<String>,
        base_url: Option<String>
    ) -> Result<Self, ParseLlmTypeError> {
        Self::from_model_name_with(model_name, api_key, base_url, |name| std::env::var(name).ok())
    }

    pub fn from_model_name_with<F>(
        model_name: &str,
        api_key: Option<String>,
        base_url: Option<String>,
        lookup: F
    ) -> Result<Self, ParseLlmTypeError>
        where F: Fn(&str) -> Option<String>
    {
        let (llm_type, model) = parse_model_name(model_name)?;
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| llm_type.api_key_env().and_then(|name| lookup(name)))
            .filter(|k| !k.trim().is_empty());
        let base_url = base_url.filter(|u| !u.trim().is_empty());

        Ok(Self {
            llm_type,
            api_key,
            model,
            base_url,
        })
    }

    pub fn base_url_or_default(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.llm_type.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn require_api_key(&self) -> Result<String, String> {
        self.api_key.clone().ok_or_else(|| {
            match self.llm_type.api_key_env() {
                Some(var) => format!("{} API key is required (set {} or LLM_API_KEY)", self.llm_type, var),
                None => format!("{} API key is required", self.llm_type),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_model_names_select_provider() {
        assert_eq!(
            parse_model_name("openai/gpt-4.1-nano").unwrap(),
            (LlmType::OpenAI, "gpt-4.1-nano".to_string())
        );
        assert_eq!(
            parse_model_name("anthropic/claude-3-5-haiku-latest").unwrap().0,
            LlmType::Anthropic
        );
        assert_eq!(parse_model_name("gemini/gemini-1.5-flash").unwrap().0, LlmType::Gemini);
        assert_eq!(
            parse_model_name("ollama/llama3:8b").unwrap(),
            (LlmType::Ollama, "llama3:8b".to_string())
        );
        assert_eq!(
            parse_model_name("groq/meta-llama/llama-4-scout").unwrap(),
            (LlmType::Groq, "meta-llama/llama-4-scout".to_string())
        );
    }

    #[test]
    fn bare_model_names_are_inferred() {
        assert_eq!(parse_model_name("gpt-4.1-nano").unwrap().0, LlmType::OpenAI);
        assert_eq!(parse_model_name("o3-mini").unwrap().0, LlmType::OpenAI);
        assert_eq!(parse_model_name("claude-3-opus-20240229").unwrap().0, LlmType::Anthropic);
        assert_eq!(parse_model_name("grok-2-latest").unwrap().0, LlmType::XAI);
        assert_eq!(parse_model_name("deepseek-chat").unwrap().0, LlmType::DeepSeek);
    }

    #[test]
    fn unknown_models_are_rejected() {
        assert!(parse_model_name("mistral-large").is_err());
        assert!(parse_model_name("acme/some-model").is_err());
        assert!(parse_model_name("openai/").is_err());
    }

    #[test]
    fn api_key_resolution_prefers_explicit_key() {
        let lookup = |name: &str| (name == "OPENAI_API_KEY").then(|| "from-env".to_string());

        let config = LlmConfig::from_model_name_with(
            "gpt-4.1-nano",
            Some("explicit".into()),
            None,
            lookup
        ).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("explicit"));

        let config = LlmConfig::from_model_name_with("gpt-4.1-nano", Some("  ".into()), None, lookup).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("from-env"));

        let config = LlmConfig::from_model_name_with("ollama/llama3", None, None, lookup).unwrap();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn base_url_defaults_per_provider() {
        let config = LlmConfig::from_model_name_with(
            "groq/llama-3.1-8b-instant",
            None,
            Some("http://localhost:9000/".into()),
            |_| None
        ).unwrap();
        assert_eq!(config.base_url_or_default(), "http://localhost:9000");

        let config = LlmConfig::from_model_name_with("ollama/llama3", None, None, |_| None).unwrap();
        assert_eq!(config.base_url_or_default(), "http://localhost:11434");
        assert!(config.require_api_key().is_err());
    }
}
