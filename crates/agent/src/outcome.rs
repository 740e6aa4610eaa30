//! Terminal results of one loop run

use serde_json::{json, Value};

use crate::reply::ReplyError;
use crate::AUTH_REQUIRED;

#[derive(Debug, Clone, PartialEq)]
pub enum LoopOutcome {
    /// The model answered the user
    Final { content: String },
    /// A draft is ready; the user must confirm before it is sent
    ConfirmationRequired { draft_id: String, message: String },
    /// The mailbox credential is missing or was rejected
    AuthRequired,
    /// The model's reply could not be used
    ParseFailure {
        error: ReplyError,
        raw: String,
        step: u32,
    },
    /// The step budget ran out without a final answer
    BudgetExhausted { content: String },
}

impl LoopOutcome {
    /// Only parse failures are reported to callers as errors
    pub fn is_error(&self) -> bool {
        matches!(self, LoopOutcome::ParseFailure { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoopOutcome::Final { .. } => "final",
            LoopOutcome::ConfirmationRequired { .. } => "confirm_send",
            LoopOutcome::AuthRequired => "auth_required",
            LoopOutcome::ParseFailure { .. } => "parse_failure",
            LoopOutcome::BudgetExhausted { .. } => "budget_exhausted",
        }
    }

    /// Response body for chat clients
    pub fn to_json(&self) -> Value {
        match self {
            LoopOutcome::Final { content } | LoopOutcome::BudgetExhausted { content } => {
                json!({ "type": "final", "content": content })
            }
            LoopOutcome::ConfirmationRequired { draft_id, message } => json!({
                "type": "confirm_send",
                "draftId": draft_id,
                "message": message,
            }),
            LoopOutcome::AuthRequired => json!({ "error": AUTH_REQUIRED }),
            LoopOutcome::ParseFailure { error, raw, step } => {
                let mut body = json!({
                    "error": error.to_string(),
                    "raw": raw,
                    "step": step,
                });
                if let ReplyError::UnknownShape(action) = error {
                    body["actionObj"] = action.clone();
                }
                body
            }
        }
    }
}
