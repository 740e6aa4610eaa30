//! Language model endpoint
//!
//! Role-tagged messages in, a single text completion out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use thiserror::Error;

pub mod openrouter;

pub use openrouter::OpenRouterProvider;

/// Model endpoint errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("endpoint rejected request: {0}")]
    Api(String),

    #[error("no api key configured")]
    NoApiKey,

    #[error("invalid response from endpoint")]
    InvalidResponse,

    #[error("rate limited")]
    RateLimited,
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Token accounting reported by the endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Completion returned by a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    #[serde(default)]
    pub finish_reason: String,
    #[serde(default)]
    pub usage: Usage,
}

impl ChatResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            finish_reason: "stop".to_string(),
            usage: Usage::default(),
        }
    }
}

/// Speaker of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
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

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conversation entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Completion request parameters
#[derive(Debug, Clone)]
pub struct ChatParams {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ChatParams {
    fn default() -> Self {
        Self {
            model: String::new(),
            messages: Vec::new(),
            max_tokens: 800,
            temperature: 0.7,
        }
    }
}

/// A model endpoint
#[async_trait]
pub trait Provider: Send + Sync {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse>;
    fn default_model(&self) -> String;
    fn is_configured(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        assert_eq!(ProviderError::NoApiKey.to_string(), "no api key configured");
        assert_eq!(
            ProviderError::Api("bad model".to_string()).to_string(),
            "endpoint rejected request: bad model"
        );
        assert_eq!(
            ProviderError::InvalidResponse.to_string(),
            "invalid response from endpoint"
        );
        assert_eq!(ProviderError::RateLimited.to_string(), "rate limited");
    }

    #[test]
    fn test_chat_response_text_builder() {
        let response = ChatResponse::text("Hello, world!");
        assert_eq!(response.content, "Hello, world!");
        assert_eq!(response.finish_reason, "stop");
        assert_eq!(response.usage.total_tokens, 0);
    }

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::system("a").role, Role::System);
        assert_eq!(Message::user("b").role, Role::User);
        assert_eq!(Message::assistant("c").role, Role::Assistant);
        assert_eq!(Message::user("b").content, "b");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn test_unknown_role_rejected() {
        let result = serde_json::from_str::<Message>(r#"{"role":"tool","content":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_message_requires_content() {
        let result = serde_json::from_str::<Message>(r#"{"role":"user"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::System.to_string(), "system");
        assert_eq!(Role::User.as_str(), "user");
    }

    #[test]
    fn test_chat_params_default() {
        let params = ChatParams::default();
        assert_eq!(params.model, "");
        assert!(params.messages.is_empty());
        assert_eq!(params.max_tokens, 800);
        assert_eq!(params.temperature, 0.7);
    }
}
