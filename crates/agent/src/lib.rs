//! Tool-augmented reasoning loop for the mail assistant
//!
//! The model answers with one JSON object per turn: either a final reply
//! or a request to run one mail tool. The loop runs the tool, feeds the
//! observation back, and stops on a final answer, a send that needs
//! confirmation, a missing credential, an unreadable reply, or when the
//! step budget runs out.

use thiserror::Error;

pub mod context;
pub mod credentials;
pub mod gate;
pub mod loop_agent;
pub mod outcome;
pub mod reply;
pub mod tools;

pub use context::ContextBuilder;
pub use credentials::{Credentials, RequestContext, TokenRefresher};
pub use loop_agent::{AgentLoop, LoopSettings};
pub use outcome::LoopOutcome;
pub use reply::{parse_reply, ActionObject, ReplyError};
pub use tools::{ToolError, ToolOutput, ToolRegistry, ToolTrait};

/// Token tools and collaborators use to say the credential is missing or invalid
pub const AUTH_REQUIRED: &str = "AUTH_REQUIRED";

/// Errors that prevent the loop from producing an outcome
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("model endpoint error: {0}")]
    Provider(#[from] mailagent_provider::ProviderError),
}

pub type Result<T> = std::result::Result<T, AgentError>;
