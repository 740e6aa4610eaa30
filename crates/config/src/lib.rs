//! Configuration management for MailAgent
//!
//! Loads and saves the assistant's settings as JSON, with environment
//! fallbacks for secrets.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod paths;

pub use paths::{config_path, data_dir};

/// Errors in configuration handling
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config not found: {0}")]
    NotFound(PathBuf),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// How tool results are written back into the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ObservationStyle {
    /// Pretty-printed JSON followed by an explicit instruction to answer
    #[default]
    Pretty,
    /// Single-line JSON, no trailing instruction
    Compact,
}

/// Model and step-controller parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefaults {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    #[serde(default)]
    pub observation_style: ObservationStyle,
    #[serde(default = "default_confirmation_prompt")]
    pub confirmation_prompt: String,
    #[serde(default = "default_exhausted_message")]
    pub exhausted_message: String,
    #[serde(default = "default_search_max_results")]
    pub search_max_results: u32,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_steps: default_max_steps(),
            observation_style: ObservationStyle::default(),
            confirmation_prompt: default_confirmation_prompt(),
            exhausted_message: default_exhausted_message(),
            search_max_results: default_search_max_results(),
        }
    }
}

fn default_model() -> String {
    "openai/gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    800
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_steps() -> u32 {
    8
}

fn default_confirmation_prompt() -> String {
    "I've prepared your email draft. Click Confirm to send it.".to_string()
}

fn default_exhausted_message() -> String {
    "I apologize, but I'm having trouble completing that request. \
     Please try rephrasing your question or break it into smaller parts."
        .to_string()
}

fn default_search_max_results() -> u32 {
    10
}

/// Agent configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentConfig {
    #[serde(default)]
    pub defaults: AgentDefaults,
}

/// Model endpoint credentials
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

/// All model endpoints
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openrouter: ProviderConfig,
}

/// Google OAuth client and Gmail API location
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GoogleConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub redirect_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gmail_api_base: Option<String>,
}

/// HTTP gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cookie_secret: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cookie_secret: String::new(),
            base_url: default_base_url(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_base_url() -> String {
    "/".to_string()
}

/// Used when neither the config file nor `COOKIE_SECRET` provide one.
pub const DEV_COOKIE_SECRET: &str = "dev-secret";

/// Default Gmail REST endpoint
pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com";

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Returns the configured value, or the named env var when it is empty.
fn value_or_env(value: &str, var: &str) -> Option<String> {
    if !value.is_empty() {
        return Some(value.to_string());
    }
    std::env::var(var).ok().filter(|v| !v.is_empty())
}

impl Config {
    /// Load from the default location
    pub async fn load() -> Result<Self> {
        let path = config_path();
        Self::load_from(&path).await
    }

    /// Load from specific location
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("no config found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        debug!("loading config from {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save to the default location
    pub async fn save(&self) -> Result<()> {
        let path = config_path();
        self.save_to(&path).await
    }

    /// Save to specific location
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        debug!("writing config to {:?}", path);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// OpenRouter key, falling back to `OPENROUTER_API_KEY`
    pub fn api_key(&self) -> Option<String> {
        value_or_env(&self.providers.openrouter.api_key, "OPENROUTER_API_KEY")
    }

    pub fn api_base(&self) -> Option<String> {
        self.providers
            .openrouter
            .api_base
            .clone()
            .filter(|b| !b.is_empty())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    pub fn default_model(&self) -> String {
        self.agent.defaults.model.clone()
    }

    pub fn google_client_id(&self) -> Option<String> {
        value_or_env(&self.google.client_id, "GOOGLE_CLIENT_ID")
    }

    pub fn google_client_secret(&self) -> Option<String> {
        value_or_env(&self.google.client_secret, "GOOGLE_CLIENT_SECRET")
    }

    pub fn google_redirect_url(&self) -> Option<String> {
        value_or_env(&self.google.redirect_url, "GOOGLE_OAUTH_REDIRECT")
    }

    pub fn gmail_api_base(&self) -> String {
        self.google
            .gmail_api_base
            .clone()
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| GMAIL_API_BASE.to_string())
    }

    /// Cookie signing secret; falls back to a development value with a warning
    pub fn cookie_secret(&self) -> String {
        match value_or_env(&self.gateway.cookie_secret, "COOKIE_SECRET") {
            Some(secret) => secret,
            None => {
                warn!("no cookie secret configured, using development secret");
                DEV_COOKIE_SECRET.to_string()
            }
        }
    }
}

/// Write a default config if none exists, then load it
pub async fn init() -> Result<Config> {
    let config_path = config_path();

    if config_path.exists() {
        warn!("config already exists at {:?}", config_path);
    } else {
        let config = Config::default();
        config.save().await?;
        info!("◆ config written to {:?}", config_path);
    }

    Config::load().await
}
