//! Gmail tools: search, get_message, create_draft, send
//!
//! Each tool validates and defaults its arguments, then calls a
//! [`MailBackend`] with the request's credentials, refreshed when the
//! token has expired or is rejected. Sending never happens unless the
//! caller passes `confirmed: true`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

use super::{ToolError, ToolOutput, ToolResult, ToolTrait};
use crate::credentials::{Credentials, RequestContext};

pub const DEFAULT_QUERY: &str = "in:inbox";

/// Argument that releases a held send; only trusted callers may set it
pub const CONFIRMED_ARG: &str = "confirmed";

/// Gmail message representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    #[default]
    Full,
    Metadata,
    Minimal,
    Raw,
}

impl MessageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageFormat::Full => "full",
            MessageFormat::Metadata => "metadata",
            MessageFormat::Minimal => "minimal",
            MessageFormat::Raw => "raw",
        }
    }
}

/// A new plain-text draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftRequest {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mailbox operations behind the tools
#[async_trait]
pub trait MailBackend: Send + Sync {
    async fn search(
        &self,
        creds: &Credentials,
        query: &str,
        max_results: u32,
    ) -> Result<Value, ToolError>;

    async fn get_message(
        &self,
        creds: &Credentials,
        message_id: &str,
        format: MessageFormat,
    ) -> Result<Value, ToolError>;

    async fn create_draft(
        &self,
        creds: &Credentials,
        draft: &DraftRequest,
    ) -> Result<Value, ToolError>;

    async fn send_draft(&self, creds: &Credentials, draft_id: &str) -> Result<Value, ToolError>;
}

fn require_signed_in(ctx: &RequestContext) -> Result<(), ToolError> {
    match ctx.credentials() {
        Some(_) => Ok(()),
        None => Err(ToolError::AuthRequired),
    }
}

/// Search the mailbox with Gmail query syntax
pub struct GmailSearchTool {
    backend: Arc<dyn MailBackend>,
    max_results: u32,
}

impl GmailSearchTool {
    pub fn new(backend: Arc<dyn MailBackend>, max_results: u32) -> Self {
        Self {
            backend,
            max_results,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchArgs {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    max_results: Option<u32>,
}

#[async_trait]
impl ToolTrait for GmailSearchTool {
    fn name(&self) -> &str {
        "gmail_search"
    }

    fn description(&self) -> &str {
        "Search emails"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Gmail search query (default in:inbox)" },
                "maxResults": { "type": "integer", "description": "Maximum messages to return" }
            }
        })
    }

    async fn execute(&self, ctx: &RequestContext, args: Value) -> ToolResult {
        require_signed_in(ctx)?;
        let args: SearchArgs = serde_json::from_value(args)?;

        let query = args.query.unwrap_or_else(|| DEFAULT_QUERY.to_string());
        let max_results = args.max_results.unwrap_or(self.max_results);
        debug!(%query, max_results, "gmail search");

        let backend = &self.backend;
        let query = query.as_str();
        let messages = ctx
            .authorized(move |creds| async move {
                backend.search(&creds, query, max_results).await
            })
            .await?;
        Ok(ToolOutput::Value(messages))
    }
}

/// Fetch one message
pub struct GmailGetMessageTool {
    backend: Arc<dyn MailBackend>,
}

impl GmailGetMessageTool {
    pub fn new(backend: Arc<dyn MailBackend>) -> Self {
        Self { backend }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetMessageArgs {
    message_id: String,
    #[serde(default)]
    format: Option<MessageFormat>,
}

#[async_trait]
impl ToolTrait for GmailGetMessageTool {
    fn name(&self) -> &str {
        "gmail_get_message"
    }

    fn description(&self) -> &str {
        "Get email details"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "messageId": { "type": "string", "description": "Id from gmail_search" },
                "format": { "type": "string", "enum": ["full", "metadata"] }
            },
            "required": ["messageId"]
        })
    }

    async fn execute(&self, ctx: &RequestContext, args: Value) -> ToolResult {
        require_signed_in(ctx)?;
        let args: GetMessageArgs = serde_json::from_value(args)?;
        let format = args.format.unwrap_or_default();

        debug!(message_id = %args.message_id, format = format.as_str(), "gmail get message");
        let backend = &self.backend;
        let message_id = args.message_id.as_str();
        let message = ctx
            .authorized(move |creds| async move {
                backend.get_message(&creds, message_id, format).await
            })
            .await?;
        Ok(ToolOutput::Value(message))
    }
}

/// Prepare a draft; never sends
pub struct GmailCreateDraftTool {
    backend: Arc<dyn MailBackend>,
}

impl GmailCreateDraftTool {
    pub fn new(backend: Arc<dyn MailBackend>) -> Self {
        Self { backend }
    }
}

#[derive(Deserialize)]
struct CreateDraftArgs {
    to: String,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    body: Option<String>,
}

#[async_trait]
impl ToolTrait for GmailCreateDraftTool {
    fn name(&self) -> &str {
        "gmail_create_draft"
    }

    fn description(&self) -> &str {
        "Create draft email"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "to": { "type": "string", "description": "Recipient address" },
                "subject": { "type": "string" },
                "body": { "type": "string", "description": "Plain text body" }
            },
            "required": ["to"]
        })
    }

    async fn execute(&self, ctx: &RequestContext, args: Value) -> ToolResult {
        require_signed_in(ctx)?;
        let args: CreateDraftArgs = serde_json::from_value(args)?;
        if args.to.trim().is_empty() {
            return Err(ToolError::InvalidArguments(
                "`to` must not be empty".to_string(),
            ));
        }

        let draft = DraftRequest {
            to: args.to,
            subject: args.subject.unwrap_or_default(),
            body: args.body.unwrap_or_default(),
        };
        debug!(to = %draft.to, "gmail create draft");

        let backend = &self.backend;
        let draft = &draft;
        let created = ctx
            .authorized(move |creds| async move { backend.create_draft(&creds, draft).await })
            .await?;
        Ok(ToolOutput::Value(created))
    }
}

/// Send a prepared draft, only when explicitly confirmed
pub struct GmailSendTool {
    backend: Arc<dyn MailBackend>,
}

impl GmailSendTool {
    pub fn new(backend: Arc<dyn MailBackend>) -> Self {
        Self { backend }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendArgs {
    draft_id: String,
    #[serde(default)]
    confirmed: bool,
}

#[async_trait]
impl ToolTrait for GmailSendTool {
    fn name(&self) -> &str {
        "gmail_send"
    }

    fn description(&self) -> &str {
        "Send draft"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "draftId": { "type": "string", "description": "Id returned by gmail_create_draft" }
            },
            "required": ["draftId"]
        })
    }

    async fn execute(&self, ctx: &RequestContext, args: Value) -> ToolResult {
        require_signed_in(ctx)?;
        let args: SendArgs = serde_json::from_value(args)?;

        if !args.confirmed {
            debug!(draft_id = %args.draft_id, "send held for confirmation");
            return Ok(ToolOutput::NeedsConfirmation {
                draft_id: args.draft_id,
                message: None,
            });
        }

        info!(draft_id = %args.draft_id, "sending confirmed draft");
        let backend = &self.backend;
        let draft_id = args.draft_id.as_str();
        let sent = ctx
            .authorized(move |creds| async move { backend.send_draft(&creds, draft_id).await })
            .await?;
        Ok(ToolOutput::Value(sent))
    }
}
