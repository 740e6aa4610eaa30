//! Model reply parsing
//!
//! Replies are supposed to be a single JSON object, but models wrap it in
//! prose, forget it entirely for simple answers, or truncate it. The parser
//! takes the span from the first `{` to the last `}` and only falls back to
//! treating the text as a final answer when it contains no braces at all.

use serde_json::{json, Map, Value};
use thiserror::Error;

/// What the model asked for in one turn
#[derive(Debug, Clone, PartialEq)]
pub enum ActionObject {
    Final {
        content: String,
    },
    Action {
        action: String,
        args: Map<String, Value>,
    },
}

impl ActionObject {
    /// Canonical JSON form, as recorded in the conversation
    pub fn to_json(&self) -> Value {
        match self {
            ActionObject::Final { content } => json!({ "type": "final", "content": content }),
            ActionObject::Action { action, args } => {
                json!({ "type": "action", "action": action, "args": args })
            }
        }
    }
}

/// A reply the loop cannot act on
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReplyError {
    #[error("Model did not return valid JSON")]
    Malformed,

    #[error("Unknown action type from model")]
    UnknownShape(Value),
}

/// Slice from the first `{` to the last `}`, or the trimmed text when there is no such span
pub fn extract_json(raw: &str) -> &str {
    let text = raw.trim();
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    }
}

fn has_braces(raw: &str) -> bool {
    raw.contains(|c| c == '{' || c == '}')
}

/// Parse one raw completion into an [`ActionObject`]
pub fn parse_reply(raw: &str) -> Result<ActionObject, ReplyError> {
    let value = match serde_json::from_str::<Value>(extract_json(raw)) {
        Ok(value) => value,
        Err(_) if !has_braces(raw) => return Ok(implicit_final(raw)),
        Err(_) => return Err(ReplyError::Malformed),
    };

    // Bare prose that happens to be valid JSON ("42", "true") is still prose.
    if !value.is_object() && !has_braces(raw) {
        return Ok(implicit_final(raw));
    }

    interpret(value)
}

fn implicit_final(raw: &str) -> ActionObject {
    ActionObject::Final {
        content: raw.trim().to_string(),
    }
}

fn interpret(value: Value) -> Result<ActionObject, ReplyError> {
    match value.get("type").and_then(Value::as_str) {
        Some("final") => {
            let content = match value.get("content") {
                Some(Value::String(s)) => s.clone(),
                Some(other) if !other.is_null() => other.to_string(),
                _ => return Err(ReplyError::UnknownShape(value)),
            };
            Ok(ActionObject::Final { content })
        }
        Some("action") => {
            let Some(action) = value.get("action").and_then(Value::as_str) else {
                return Err(ReplyError::UnknownShape(value));
            };
            let args = match value.get("args") {
                None | Some(Value::Null) => Map::new(),
                Some(Value::Object(map)) => map.clone(),
                Some(_) => return Err(ReplyError::UnknownShape(value)),
            };
            Ok(ActionObject::Action {
                action: action.to_string(),
                args,
            })
        }
        _ => Err(ReplyError::UnknownShape(value)),
    }
}
