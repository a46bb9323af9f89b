use serde::{ Serialize, Deserialize };
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Body of `POST /chat`.
///
/// `messages` is the prior conversation. `message` is the new user turn; when
/// it is absent the last history entry must already be a user turn.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_use_lowercase_wire_names() {
        let json = serde_json::to_string(&ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);

        let parsed: ChatMessage = serde_json
            ::from_str(r#"{"role":"system","content":"x"}"#)
            .unwrap();
        assert_eq!(parsed.role, Role::System);
    }

    #[test]
    fn chat_request_fields_are_optional() {
        let req: ChatRequest = serde_json::from_str("{}").unwrap();
        assert!(req.messages.is_empty());
        assert!(req.message.is_none());

        let req: ChatRequest = serde_json
            ::from_str(r#"{"message":"How do I boil an egg?"}"#)
            .unwrap();
        assert_eq!(req.message.as_deref(), Some("How do I boil an egg?"));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let parsed = serde_json::from_str::<ChatMessage>(r#"{"role":"tool","content":"x"}"#);
        assert!(parsed.is_err());
    }
}
