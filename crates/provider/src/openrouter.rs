//! OpenRouter / OpenAI-compatible chat completions client

use crate::*;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, trace};

pub const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Chat completions over HTTP
pub struct OpenRouterProvider {
    client: Client,
    api_key: String,
    api_base: String,
    default_model: String,
}

impl OpenRouterProvider {
    pub fn new(
        api_key: impl Into<String>,
        api_base: Option<String>,
        default_model: Option<String>,
    ) -> Self {
        let api_base = api_base
            .map(|b| b.trim_end_matches('/').to_string())
            .unwrap_or_else(|| OPENROUTER_API_BASE.to_string());

        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_base,
            default_model: default_model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    fn build_request(&self, params: &ChatParams) -> serde_json::Value {
        let model = if params.model.is_empty() {
            self.default_model.clone()
        } else {
            params.model.clone()
        };

        json!({
            "model": model,
            "messages": params.messages,
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
        })
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<ChatResponse> {
        let choice = json["choices"]
            .get(0)
            .ok_or(ProviderError::InvalidResponse)?;

        // Some upstreams answer in `text` instead of `message.content`.
        let content = choice["message"]["content"]
            .as_str()
            .or_else(|| choice["text"].as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| choice.to_string());

        let finish_reason = choice["finish_reason"]
            .as_str()
            .unwrap_or("stop")
            .to_string();

        let usage = if let Some(usage) = json["usage"].as_object() {
            let count = |key: &str| usage.get(key).and_then(|v| v.as_u64()).unwrap_or(0) as u32;
            Usage {
                prompt_tokens: count("prompt_tokens"),
                completion_tokens: count("completion_tokens"),
                total_tokens: count("total_tokens"),
            }
        } else {
            Usage::default()
        };

        Ok(ChatResponse {
            content,
            finish_reason,
            usage,
        })
    }
}

#[async_trait::async_trait]
impl Provider for OpenRouterProvider {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NoApiKey);
        }

        trace!("chat completion request to {}", self.api_base);

        let url = format!("{}/chat/completions", self.api_base);
        let body = self.build_request(&params);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }
            let body: serde_json::Value = serde_json::from_str(&text).unwrap_or_default();
            let error = body["error"]["message"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| format!("status {}", status.as_u16()));
            return Err(ProviderError::Api(error));
        }

        let json: serde_json::Value = serde_json::from_str(&text)?;
        let response = self.parse_response(json)?;
        debug!(
            finish_reason = %response.finish_reason,
            tokens = response.usage.total_tokens,
            "completion received"
        );
        Ok(response)
    }

    fn default_model(&self) -> String {
        self.default_model.clone()
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
