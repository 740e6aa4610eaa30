//! Conversation assembly for the model

use mailagent_provider::{Message, Role};
use tracing::debug;

use crate::reply::ActionObject;
use crate::tools::ToolRegistry;
use crate::{AgentError, Result};

/// Builds the conversation sent to the model on every step
pub struct ContextBuilder {
    catalog: String,
}

impl ContextBuilder {
    pub fn new(tools: &ToolRegistry) -> Self {
        Self {
            catalog: tools.catalog(),
        }
    }

    /// Protocol rules, the tool catalog and one worked example
    pub fn build_system_prompt(&self) -> String {
        format!(
            r#"You are a Gmail assistant that helps users through tools. Follow these rules exactly:

1. To use a tool, reply with ONLY this JSON and nothing else:
{{"type":"action","action":"<tool_name>","args":{{...}}}}

2. Once you have the tool result, reply with:
{{"type":"final","content":"Your helpful response to the user based on the results"}}

Available tools:
{}

Example:
User: "Show me my latest emails"
Assistant: {{"type":"action","action":"gmail_search","args":{{"query":"in:inbox","maxResults":5}}}}

After the tool result:
Assistant: {{"type":"final","content":"Here are your latest 5 emails: [summarize results]"}}

Always finish with type "final" after a tool runs. Never create more than one draft and never repeat an action."#,
            self.catalog
        )
    }

    /// System prompt followed by the caller's history, in order. An empty
    /// history leaves the model with only the system prompt.
    pub fn build_messages(&self, history: Vec<Message>) -> Result<Vec<Message>> {
        if history.iter().any(|m| m.role == Role::System) {
            return Err(AgentError::InvalidRequest(
                "history must only contain user and assistant messages".to_string(),
            ));
        }

        debug!(history = history.len(), "assembling conversation");
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(self.build_system_prompt()));
        messages.extend(history);
        Ok(messages)
    }

    /// Record the model's own action in canonical form
    pub fn add_action(messages: &mut Vec<Message>, action: &ActionObject) {
        messages.push(Message::assistant(action.to_json().to_string()));
    }

    /// Feed a tool observation back as a user turn
    pub fn add_observation(messages: &mut Vec<Message>, observation: impl Into<String>) {
        messages.push(Message::user(observation));
    }
}
