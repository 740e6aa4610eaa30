//! Mail tools and the dispatcher that routes model actions to them

pub mod gmail;
pub mod gmail_api;

pub use gmail::{
    DraftRequest, GmailCreateDraftTool, GmailGetMessageTool, GmailSearchTool, GmailSendTool,
    MailBackend, MessageFormat, CONFIRMED_ARG,
};
pub use gmail_api::GmailApi;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::credentials::RequestContext;
use crate::AUTH_REQUIRED;

/// What a tool produced
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Ordinary JSON payload, shown to the model
    Value(Value),
    /// A destructive step was prepared but not executed
    NeedsConfirmation {
        draft_id: String,
        message: Option<String>,
    },
    /// The acting credential is missing or invalid
    AuthRequired,
}

/// Tool failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("{}", AUTH_REQUIRED)]
    AuthRequired,

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Backend(String),
}

impl From<serde_json::Error> for ToolError {
    fn from(e: serde_json::Error) -> Self {
        ToolError::InvalidArguments(e.to_string())
    }
}

pub type ToolResult = Result<ToolOutput, ToolError>;

/// A side-effecting operation the model may request
#[async_trait]
pub trait ToolTrait: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON schema of the arguments
    fn parameters(&self) -> Value;
    async fn execute(&self, ctx: &RequestContext, args: Value) -> ToolResult;
}

type BoxedTool = Box<dyn ToolTrait + Send + Sync>;

/// Closed set of tools, kept in registration order
pub struct ToolRegistry {
    tools: Vec<BoxedTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// The four Gmail tools over one backend
    pub fn gmail(backend: Arc<dyn MailBackend>, search_max_results: u32) -> Self {
        let mut registry = Self::new();
        registry.register(GmailSearchTool::new(backend.clone(), search_max_results));
        registry.register(GmailGetMessageTool::new(backend.clone()));
        registry.register(GmailCreateDraftTool::new(backend.clone()));
        registry.register(GmailSendTool::new(backend));
        registry
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register<T: ToolTrait + 'static>(&mut self, tool: T) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(Box::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&(dyn ToolTrait + Send + Sync)> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    /// One line per tool for the system prompt
    pub fn catalog(&self) -> String {
        self.tools
            .iter()
            .map(|t| {
                format!(
                    "- {}: {} (args: {})",
                    t.name(),
                    t.description(),
                    describe_args(&t.parameters())
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Run the named tool. Unknown names become an observation, not a failure.
    pub async fn dispatch(
        &self,
        ctx: &RequestContext,
        name: &str,
        args: Map<String, Value>,
    ) -> ToolResult {
        let Some(tool) = self.get(name) else {
            warn!(tool = name, "model requested unknown tool");
            return Ok(ToolOutput::Value(
                json!({ "error": "UNKNOWN_TOOL", "tool": name }),
            ));
        };

        debug!(tool = name, "executing tool");
        tool.execute(ctx, Value::Object(args)).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a parameter schema as `{ "name": type, ... }`
pub fn describe_args(schema: &Value) -> String {
    let Some(props) = schema["properties"].as_object() else {
        return "{}".to_string();
    };
    if props.is_empty() {
        return "{}".to_string();
    }

    let fields: Vec<String> = props
        .iter()
        .map(|(name, prop)| format!("\"{}\": {}", name, describe_type(prop)))
        .collect();
    format!("{{ {} }}", fields.join(", "))
}

fn describe_type(prop: &Value) -> String {
    if let Some(options) = prop["enum"].as_array() {
        return options
            .iter()
            .map(|o| o.to_string())
            .collect::<Vec<_>>()
            .join("|");
    }
    match prop["type"].as_str() {
        Some("integer") | Some("number") => "number".to_string(),
        Some(other) => other.to_string(),
        None => "any".to_string(),
    }
}
