//! mailagent command implementations

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use mailagent_agent::tools::GmailApi;
use mailagent_agent::{AgentLoop, Credentials, LoopSettings, RequestContext, ToolRegistry};
use mailagent_config::{self, Config};
use mailagent_provider::{Message, OpenRouterProvider};

/// Write the default config if none exists
pub async fn init_command() -> Result<()> {
    println!("◆ Initializing mailagent...");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    mailagent_config::init()
        .await
        .context("failed to write default config")?;

    println!("\n◆ Config at {}", mailagent_config::config_path().display());
    println!("\nNext steps:");
    println!("  1. Add your OpenRouter key (or set OPENROUTER_API_KEY)");
    println!("     Get one at: https://openrouter.ai/keys");
    println!("  2. Add Google OAuth client settings for `mailagent serve`");
    println!("  3. Or ask directly: mailagent ask -m \"Show me my latest emails\" --token <token>");

    Ok(())
}

fn presence(set: bool) -> &'static str {
    if set {
        "[Set]"
    } else {
        "[Missing]"
    }
}

/// Print which settings are present
pub async fn status_command() -> Result<()> {
    let config_path = mailagent_config::config_path();

    println!("◆ mailagent status");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "Config:    {} {}",
        config_path.display(),
        if config_path.exists() {
            "[OK]"
        } else {
            "[Missing]"
        }
    );

    let config = Config::load().await.context("failed to load config")?;
    let defaults = &config.agent.defaults;
    println!("Model:     {}", config.default_model());
    println!("Max steps: {}", defaults.max_steps);
    println!("API Key:   {}", presence(config.has_api_key()));
    println!(
        "Google:    {}",
        presence(config.google_client_id().is_some() && config.google_client_secret().is_some())
    );
    println!(
        "Gateway:   {}:{}",
        config.gateway.host, config.gateway.port
    );

    Ok(())
}

/// Run one request through the loop and print the response body
pub async fn ask_command(
    message: String,
    token: Option<String>,
    confirm: Option<String>,
) -> Result<()> {
    let config = Config::load().await.context("failed to load config")?;
    let api_key = config
        .api_key()
        .context("No API key configured. Set providers.openrouter.api_key or OPENROUTER_API_KEY")?;

    let provider = OpenRouterProvider::new(api_key, config.api_base(), Some(config.default_model()));
    let gmail = Arc::new(GmailApi::new(Some(config.gmail_api_base())));
    let agent = AgentLoop::new(
        Arc::new(provider),
        ToolRegistry::gmail(gmail, config.agent.defaults.search_max_results),
        LoopSettings::from_config(&config),
    );

    let mut ctx = RequestContext::new(token.map(Credentials::bearer));
    if let Some(draft_id) = confirm {
        ctx = ctx.with_confirmation(draft_id);
    }
    let outcome = agent
        .run(&ctx, vec![Message::user(message)])
        .await
        .context("agent request failed")?;

    info!(outcome = outcome.label(), "request finished");
    println!("{}", serde_json::to_string_pretty(&outcome.to_json())?);

    if outcome.is_error() {
        anyhow::bail!("model reply could not be parsed");
    }
    Ok(())
}

/// Start the gateway
pub async fn serve_command() -> Result<()> {
    let config = Config::load().await.context("failed to load config")?;
    println!(
        "◆ Serving on http://{}:{}",
        config.gateway.host, config.gateway.port
    );
    mailagent_gateway::start(config)
        .await
        .context("gateway stopped")?;
    Ok(())
}
