//! Shared fixtures for agent tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mailagent_agent::tools::{DraftRequest, MailBackend, MessageFormat, ToolError};
use mailagent_agent::credentials::TokenRefresher;
use mailagent_agent::Credentials;
use mailagent_provider::{ChatParams, ChatResponse, Message, Provider, ProviderError};

/// Replays canned completions in order and records every request
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<ChatParams>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always asks for the same tool, never answers
    pub fn looping(reply: &str, times: usize) -> Self {
        Self::new(std::iter::repeat(reply.to_string()).take(times))
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> ChatParams {
        self.requests.lock().unwrap()[index].clone()
    }

    pub fn last_messages(&self) -> Vec<Message> {
        self.requests
            .lock()
            .unwrap()
            .last()
            .map(|p| p.messages.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse, ProviderError> {
        self.requests.lock().unwrap().push(params);
        match self.replies.lock().unwrap().pop_front() {
            Some(reply) => Ok(ChatResponse::text(reply)),
            None => Err(ProviderError::InvalidResponse),
        }
    }

    fn default_model(&self) -> String {
        "test/model".to_string()
    }

    fn is_configured(&self) -> bool {
        true
    }
}

/// How the fake mailbox should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Failure {
    #[default]
    None,
    AuthError,
    AuthValue,
    Backend,
}

/// In-memory mailbox recording every call
#[derive(Default)]
pub struct FakeMailbox {
    pub failure: Failure,
    /// When set, any other access token is rejected
    pub accept_only: Option<String>,
    pub tokens_seen: Mutex<Vec<String>>,
    pub searches: Mutex<Vec<(String, u32)>>,
    pub fetched: Mutex<Vec<(String, MessageFormat)>>,
    pub drafts: Mutex<Vec<DraftRequest>>,
    sends: AtomicUsize,
}

impl FakeMailbox {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(failure: Failure) -> Arc<Self> {
        Arc::new(Self {
            failure,
            ..Default::default()
        })
    }

    pub fn accepting(token: &str) -> Arc<Self> {
        Arc::new(Self {
            accept_only: Some(token.to_string()),
            ..Default::default()
        })
    }

    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<Option<Value>, ToolError> {
        match self.failure {
            Failure::None => Ok(None),
            Failure::AuthError => Err(ToolError::AuthRequired),
            Failure::AuthValue => Ok(Some(json!({ "error": "AUTH_REQUIRED" }))),
            Failure::Backend => Err(ToolError::Backend("mailbox unavailable".to_string())),
        }
    }
}

#[async_trait]
impl MailBackend for FakeMailbox {
    async fn search(
        &self,
        creds: &Credentials,
        query: &str,
        max_results: u32,
    ) -> Result<Value, ToolError> {
        self.tokens_seen
            .lock()
            .unwrap()
            .push(creds.access_token.clone());
        if let Some(accepted) = &self.accept_only {
            if &creds.access_token != accepted {
                return Err(ToolError::AuthRequired);
            }
        }
        self.searches
            .lock()
            .unwrap()
            .push((query.to_string(), max_results));
        if let Some(value) = self.check()? {
            return Ok(value);
        }
        Ok(json!([
            { "id": "m1", "threadId": "t1" },
            { "id": "m2", "threadId": "t2" }
        ]))
    }

    async fn get_message(
        &self,
        _creds: &Credentials,
        message_id: &str,
        format: MessageFormat,
    ) -> Result<Value, ToolError> {
        self.fetched
            .lock()
            .unwrap()
            .push((message_id.to_string(), format));
        if let Some(value) = self.check()? {
            return Ok(value);
        }
        Ok(json!({ "id": message_id, "snippet": "Hello there" }))
    }

    async fn create_draft(
        &self,
        _creds: &Credentials,
        draft: &DraftRequest,
    ) -> Result<Value, ToolError> {
        self.drafts.lock().unwrap().push(draft.clone());
        if let Some(value) = self.check()? {
            return Ok(value);
        }
        Ok(json!({ "id": "r-100", "message": { "id": "m-100" } }))
    }

    async fn send_draft(&self, _creds: &Credentials, draft_id: &str) -> Result<Value, ToolError> {
        if let Some(value) = self.check()? {
            return Ok(value);
        }
        self.sends.fetch_add(1, Ordering::SeqCst);
        Ok(json!({ "id": "sent-1", "draftId": draft_id, "labelIds": ["SENT"] }))
    }
}

/// Hands out a fixed access token, or fails
pub struct StaticRefresher {
    pub token: Option<String>,
    calls: AtomicUsize,
}

impl StaticRefresher {
    pub fn issuing(token: &str) -> Arc<Self> {
        Arc::new(Self {
            token: Some(token.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn revoked() -> Arc<Self> {
        Arc::new(Self {
            token: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenRefresher for StaticRefresher {
    async fn refresh(&self, _credentials: &Credentials) -> Result<Credentials, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.token {
            Some(token) => Ok(Credentials::bearer(token.clone())),
            None => Err(ToolError::Backend("invalid_grant".to_string())),
        }
    }
}

/// Signed in with a token that can be refreshed
pub fn refreshable(access_token: &str, expiry_date: Option<i64>) -> Credentials {
    Credentials {
        refresh_token: Some("1//refresh".to_string()),
        expiry_date,
        ..Credentials::bearer(access_token)
    }
}

pub fn signed_in() -> mailagent_agent::RequestContext {
    mailagent_agent::RequestContext::with_credentials(Credentials::bearer("token-123"))
}

pub fn user(text: &str) -> Message {
    Message::user(text)
}
