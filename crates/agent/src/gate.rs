//! Classification of a tool result before it reaches the model
//!
//! Auth failures are checked first and end the loop. A send that is waiting
//! for the user ends the loop next. Anything else becomes an observation
//! message for the following step.
//!
//! Model-issued actions never carry their own confirmation: the flag is
//! stripped and only set again for the draft the caller confirmed.

use mailagent_config::ObservationStyle;
use serde_json::{Map, Value};
use tracing::warn;

use crate::tools::{ToolError, ToolOutput, ToolResult, CONFIRMED_ARG};
use crate::AUTH_REQUIRED;

/// What the loop does with one tool result
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Feed this text back to the model
    Observe(String),
    /// Stop and ask the user to confirm the draft
    Confirm { draft_id: String, message: String },
    /// Stop, the user has to sign in again
    AuthRequired,
}

/// True for the bare sentinel or an `{ "error": "AUTH_REQUIRED" }` payload
pub fn is_auth_sentinel(value: &Value) -> bool {
    match value {
        Value::String(s) => s == AUTH_REQUIRED,
        Value::Object(map) => map.get("error").and_then(Value::as_str) == Some(AUTH_REQUIRED),
        _ => false,
    }
}

pub fn is_auth_error(err: &ToolError) -> bool {
    match err {
        ToolError::AuthRequired => true,
        other => other.to_string().contains(AUTH_REQUIRED),
    }
}

pub fn signals_auth_required(result: &ToolResult) -> bool {
    match result {
        Ok(ToolOutput::AuthRequired) => true,
        Ok(ToolOutput::Value(value)) => is_auth_sentinel(value),
        Ok(ToolOutput::NeedsConfirmation { .. }) => false,
        Err(err) => is_auth_error(err),
    }
}

/// Drop any confirmation the model wrote itself, then confirm the action if
/// it targets the draft the caller approved. The approval is used up by the
/// first matching action.
pub fn authorize_action(args: &mut Map<String, Value>, approved_draft: &mut Option<String>) {
    if args.remove(CONFIRMED_ARG).is_some() {
        warn!("ignoring confirmation supplied by the model");
    }

    let draft_id = args.get("draftId").and_then(Value::as_str);
    let targets_approved = match (draft_id, approved_draft.as_deref()) {
        (Some(draft_id), Some(approved)) => draft_id == approved,
        _ => false,
    };
    if targets_approved {
        approved_draft.take();
        args.insert(CONFIRMED_ARG.to_string(), Value::Bool(true));
    }
}

/// `{ "need_confirmation": true, "draftId": "..." }` from untyped tools
fn confirmation_request(value: &Value) -> Option<String> {
    if value.get("need_confirmation").and_then(Value::as_bool) != Some(true) {
        return None;
    }
    value
        .get("draftId")
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub fn observation(value: &Value, style: ObservationStyle) -> String {
    match style {
        ObservationStyle::Pretty => {
            let rendered =
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            format!(
                "Tool result: {}\n\nNow respond to the user with {{\"type\":\"final\",\"content\":\"your response\"}} based on this result.",
                rendered
            )
        }
        ObservationStyle::Compact => format!("Tool result: {}", value),
    }
}

pub fn error_observation(err: &ToolError) -> String {
    format!(
        "Tool error: {}\n\nRespond to the user with {{\"type\":\"final\",\"content\":\"explanation of the error\"}}",
        err
    )
}

/// Decide what one tool result means for the loop
pub fn inspect(result: ToolResult, style: ObservationStyle, confirmation_prompt: &str) -> Verdict {
    if signals_auth_required(&result) {
        return Verdict::AuthRequired;
    }

    match result {
        Ok(ToolOutput::NeedsConfirmation { draft_id, message }) => Verdict::Confirm {
            draft_id,
            message: message.unwrap_or_else(|| confirmation_prompt.to_string()),
        },
        Ok(ToolOutput::Value(value)) => match confirmation_request(&value) {
            Some(draft_id) => Verdict::Confirm {
                draft_id,
                message: confirmation_prompt.to_string(),
            },
            None => Verdict::Observe(observation(&value, style)),
        },
        Ok(ToolOutput::AuthRequired) => Verdict::AuthRequired,
        Err(err) => Verdict::Observe(error_observation(&err)),
    }
}
