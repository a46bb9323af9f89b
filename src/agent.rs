use crate::cli::Args;
use crate::config::prompt;
use crate::llm::LlmConfig;
use crate::llm::chat::{ ChatClient, CompletionOptions, new_client as new_chat_client };
use crate::models::chat::{ ChatMessage, Role };

use log::{ info, error };
use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// The only text a caller ever sees when the model call fails.
pub const FAILURE_MESSAGE: &str =
    "Sorry, I couldn't reach the recipe assistant just now. Please try again in a moment.";

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Message must not be empty")]
    EmptyMessage,
    #[error("Conversation must end with a user message")]
    MissingUserMessage,
    #[error("{}", FAILURE_MESSAGE)]
    Upstream(#[source] Box<dyn StdError + Send + Sync>),
}

impl AgentError {
    /// Whether the caller sent something unusable, as opposed to the provider failing.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AgentError::Upstream(_))
    }
}

#[derive(Clone)]
pub struct RecipeAgent {
    chat_client: Arc<dyn ChatClient>,
    system_prompt: Arc<str>,
    options: CompletionOptions,
}

impl RecipeAgent {
    pub fn new(
        chat_client: Arc<dyn ChatClient>,
        system_prompt: impl Into<Arc<str>>,
        options: CompletionOptions
    ) -> Self {
        Self {
            chat_client,
            system_prompt: system_prompt.into(),
            options,
        }
    }

    pub fn from_args(args: &Args) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let config = LlmConfig::from_model_name(
            &args.model_name,
            args.llm.llm_api_key.clone(),
            args.llm.llm_base_url.clone()
        )?;
        let chat_client = new_chat_client(&config)?;
        info!(
            "Chat client configured: Type={}, Model={}, BaseURL={}",
            config.llm_type,
            config.model,
            chat_client.get_base_url().as_deref().unwrap_or("adapter default")
        );

        let system_prompt = prompt::load_system_prompt(args.system_prompt_path.as_deref())?;
        let options = CompletionOptions {
            temperature: args.llm.temperature,
            max_tokens: args.llm.max_tokens,
            json_response: false,
        };

        Ok(Self::new(chat_client, system_prompt, options))
    }

    pub fn model(&self) -> String {
        self.chat_client.get_model()
    }

    /// Lays out the outbound conversation: system prompt first, prior turns in
    /// their original order, the new user turn last. Caller-supplied system
    /// turns are discarded.
    pub fn build_messages(&self, history: &[ChatMessage], user_message: Option<&str>) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(&*self.system_prompt));
        messages.extend(history.iter().filter(|m| m.role != Role::System).cloned());
        if let Some(text) = user_message {
            messages.push(ChatMessage::user(text));
        }
        messages
    }

    /// Runs one chat turn and returns the updated conversation, without the
    /// system turn, ending with the assistant reply.
    pub async fn get_agent_response(
        &self,
        history: &[ChatMessage],
        user_message: Option<&str>
    ) -> Result<Vec<ChatMessage>, AgentError> {
        match user_message {
            Some(text) if text.trim().is_empty() => {
                return Err(AgentError::EmptyMessage);
            }
            Some(_) => {}
            None => {
                let last = history.iter().rev().find(|m| m.role != Role::System);
                match last {
                    Some(m) if m.role == Role::User && !m.content.trim().is_empty() => {}
                    Some(m) if m.role == Role::User => {
                        return Err(AgentError::EmptyMessage);
                    }
                    _ => {
                        return Err(AgentError::MissingUserMessage);
                    }
                }
            }
        }

        let outbound = self.build_messages(history, user_message);
        let reply = self.chat_client
            .chat(&outbound, &self.options).await
            .map_err(|e| {
                error!("LLM interaction error: {}", e);
                AgentError::Upstream(e)
            })?;

        let reply = reply.response.trim().to_string();
        if reply.is_empty() {
            error!("LLM returned an empty completion");
            return Err(AgentError::Upstream("empty completion".into()));
        }

        let mut conversation: Vec<ChatMessage> = outbound.into_iter().skip(1).collect();
        conversation.push(ChatMessage::assistant(reply));
        Ok(conversation)
    }
}
