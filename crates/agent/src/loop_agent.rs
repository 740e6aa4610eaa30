//! Agent loop - bounded reason/act cycle

use std::sync::Arc;
use tracing::{debug, info, warn};

use mailagent_config::{AgentDefaults, Config, ObservationStyle};
use mailagent_provider::{ChatParams, Message, Provider};

use crate::context::ContextBuilder;
use crate::credentials::RequestContext;
use crate::gate::{self, Verdict};
use crate::outcome::LoopOutcome;
use crate::reply::{parse_reply, ActionObject};
use crate::tools::ToolRegistry;

/// Knobs for one loop
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_steps: u32,
    pub observation_style: ObservationStyle,
    pub confirmation_prompt: String,
    pub exhausted_message: String,
}

impl LoopSettings {
    pub fn from_config(config: &Config) -> Self {
        Self::from(&config.agent.defaults)
    }
}

impl From<&AgentDefaults> for LoopSettings {
    fn from(defaults: &AgentDefaults) -> Self {
        Self {
            model: defaults.model.clone(),
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
            max_steps: defaults.max_steps,
            observation_style: defaults.observation_style,
            confirmation_prompt: defaults.confirmation_prompt.clone(),
            exhausted_message: defaults.exhausted_message.clone(),
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from(&AgentDefaults::default())
    }
}

/// Drives the model through at most `max_steps` turns for one request
pub struct AgentLoop<P: Provider> {
    provider: Arc<P>,
    tools: ToolRegistry,
    context: ContextBuilder,
    settings: LoopSettings,
}

impl<P: Provider> AgentLoop<P> {
    pub fn new(provider: Arc<P>, tools: ToolRegistry, settings: LoopSettings) -> Self {
        let context = ContextBuilder::new(&tools);
        Self {
            provider,
            tools,
            context,
            settings,
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    pub fn context(&self) -> &ContextBuilder {
        &self.context
    }

    /// Run one request to a terminal outcome.
    ///
    /// Endpoint failures and invalid history are errors; every other way the
    /// run can end is a [`LoopOutcome`]. A send only goes out when `ctx`
    /// carries the caller's confirmation for that draft.
    pub async fn run(
        &self,
        ctx: &RequestContext,
        history: Vec<Message>,
    ) -> crate::Result<LoopOutcome> {
        let mut messages = self.context.build_messages(history)?;
        let mut approved_draft = ctx.confirmed_draft().map(str::to_string);

        for step in 1..=self.settings.max_steps {
            debug!(step, "agent step");

            let params = ChatParams {
                model: self.settings.model.clone(),
                messages: messages.clone(),
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
            };
            let response = self.provider.chat(params).await?;
            let raw = response.content;

            let action = match parse_reply(&raw) {
                Ok(action) => action,
                Err(error) => {
                    warn!(step, %error, "unusable model reply");
                    return Ok(LoopOutcome::ParseFailure { error, raw, step });
                }
            };

            let (tool, mut args) = match &action {
                ActionObject::Final { content } => {
                    info!(step, "final answer");
                    return Ok(LoopOutcome::Final {
                        content: content.clone(),
                    });
                }
                ActionObject::Action { action, args } => (action.clone(), args.clone()),
            };

            ContextBuilder::add_action(&mut messages, &action);
            info!(step, tool = %tool, "model requested tool");
            gate::authorize_action(&mut args, &mut approved_draft);
            let result = self.tools.dispatch(ctx, &tool, args).await;

            match gate::inspect(
                result,
                self.settings.observation_style,
                &self.settings.confirmation_prompt,
            ) {
                Verdict::AuthRequired => {
                    info!(step, tool = %tool, "credential required");
                    return Ok(LoopOutcome::AuthRequired);
                }
                Verdict::Confirm { draft_id, message } => {
                    info!(step, draft_id = %draft_id, "send awaits confirmation");
                    return Ok(LoopOutcome::ConfirmationRequired { draft_id, message });
                }
                Verdict::Observe(observation) => {
                    ContextBuilder::add_observation(&mut messages, observation);
                }
            }
        }

        warn!(
            max_steps = self.settings.max_steps,
            "step budget exhausted without a final answer"
        );
        Ok(LoopOutcome::BudgetExhausted {
            content: self.settings.exhausted_message.clone(),
        })
    }
}
