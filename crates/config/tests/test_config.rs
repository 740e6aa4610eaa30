//! Tests for Config serialization, deserialization, and core functionality

use mailagent_config::{
    AgentDefaults, Config, GatewayConfig, GoogleConfig, ObservationStyle, ProviderConfig,
};
use tempfile::TempDir;

/// Helper to create a temporary directory for tests
fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Test that default Config has expected values
#[test]
fn test_config_defaults() {
    let config = Config::default();

    let defaults = &config.agent.defaults;
    assert_eq!(defaults.model, "openai/gpt-4o-mini");
    assert_eq!(defaults.max_tokens, 800);
    assert_eq!(defaults.temperature, 0.7);
    assert_eq!(defaults.max_steps, 8);
    assert_eq!(defaults.observation_style, ObservationStyle::Pretty);
    assert_eq!(defaults.search_max_results, 10);
    assert!(defaults.confirmation_prompt.contains("Click Confirm"));
    assert!(defaults.exhausted_message.starts_with("I apologize"));

    assert_eq!(config.gateway.host, "127.0.0.1");
    assert_eq!(config.gateway.port, 3000);
    assert_eq!(config.gateway.base_url, "/");
    assert!(config.gateway.cookie_secret.is_empty());

    assert!(config.providers.openrouter.api_key.is_empty());
    assert!(config.providers.openrouter.api_base.is_none());
    assert!(config.google.client_id.is_empty());
    assert!(config.google.gmail_api_base.is_none());
}

#[test]
fn test_provider_config_defaults() {
    let provider = ProviderConfig::default();
    assert!(provider.api_key.is_empty());
    assert_eq!(provider.api_base, None);
}

#[test]
fn test_google_config_defaults() {
    let google = GoogleConfig::default();
    assert!(google.client_id.is_empty());
    assert!(google.client_secret.is_empty());
    assert!(google.redirect_url.is_empty());
}

#[test]
fn test_gateway_config_defaults() {
    let gateway = GatewayConfig::default();
    assert_eq!(gateway.host, "127.0.0.1");
    assert_eq!(gateway.port, 3000);
}

/// Partial JSON fills the rest from defaults
#[test]
fn test_partial_json_uses_defaults() {
    let json = r#"{ "agent": { "defaults": { "max_steps": 6 } } }"#;
    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.agent.defaults.max_steps, 6);
    assert_eq!(config.agent.defaults.model, "openai/gpt-4o-mini");
    assert_eq!(config.gateway.port, 3000);
}

#[test]
fn test_empty_json_is_default() {
    let config: Config = serde_json::from_str("{}").unwrap();
    assert_eq!(config.agent.defaults.max_steps, 8);
    assert_eq!(config.gateway.host, "127.0.0.1");
}

#[test]
fn test_observation_style_serialization() {
    let json = r#"{ "observation_style": "compact" }"#;
    let defaults: AgentDefaults = serde_json::from_str(json).unwrap();
    assert_eq!(defaults.observation_style, ObservationStyle::Compact);

    let out = serde_json::to_string(&ObservationStyle::Pretty).unwrap();
    assert_eq!(out, "\"pretty\"");
}

#[test]
fn test_unknown_observation_style_rejected() {
    let json = r#"{ "observation_style": "verbose" }"#;
    assert!(serde_json::from_str::<AgentDefaults>(json).is_err());
}

/// Missing file loads defaults
#[tokio::test]
async fn test_load_missing_file_returns_default() {
    let dir = temp_dir();
    let path = dir.path().join("missing.json");

    let config = Config::load_from(&path).await.unwrap();
    assert_eq!(config.agent.defaults.max_steps, 8);
}

/// Save then load preserves values and creates parents
#[tokio::test]
async fn test_save_and_load() {
    let dir = temp_dir();
    let path = dir.path().join("nested").join("config.json");

    let mut config = Config::default();
    config.providers.openrouter.api_key = "sk-or-test".to_string();
    config.agent.defaults.max_steps = 5;
    config.agent.defaults.observation_style = ObservationStyle::Compact;
    config.gateway.port = 8080;
    config.google.client_id = "client".to_string();

    config.save_to(&path).await.unwrap();
    assert!(path.exists());

    let loaded = Config::load_from(&path).await.unwrap();
    assert_eq!(loaded.providers.openrouter.api_key, "sk-or-test");
    assert_eq!(loaded.agent.defaults.max_steps, 5);
    assert_eq!(
        loaded.agent.defaults.observation_style,
        ObservationStyle::Compact
    );
    assert_eq!(loaded.gateway.port, 8080);
    assert_eq!(loaded.google.client_id, "client");
}

/// Optional fields are omitted when unset
#[test]
fn test_skip_serializing_none() {
    let config = Config::default();
    let json = serde_json::to_string(&config).unwrap();
    assert!(!json.contains("api_base"));
    assert!(!json.contains("gmail_api_base"));
}

#[test]
fn test_default_model_accessor() {
    let mut config = Config::default();
    config.agent.defaults.model = "anthropic/claude-3-haiku".to_string();
    assert_eq!(config.default_model(), "anthropic/claude-3-haiku");
}
