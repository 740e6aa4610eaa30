//! Per-request credential context handed to every tool

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

use crate::tools::ToolError;

/// Access tokens this close to expiry are refreshed before use
const EXPIRY_MARGIN_MS: i64 = 60_000;

/// OAuth tokens for the mailbox owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Milliseconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl Credentials {
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expiry_date: None,
            scope: None,
            token_type: Some("Bearer".to_string()),
        }
    }

    /// True once the access token is within a minute of `expiry_date`
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expiry_date
            .map(|expiry| expiry - EXPIRY_MARGIN_MS <= now_ms)
            .unwrap_or(false)
    }
}

/// Current time in epoch milliseconds
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Trades a refresh token for a new access token
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, credentials: &Credentials) -> Result<Credentials, ToolError>;
}

/// What a tool knows about the request it runs for
#[derive(Default)]
pub struct RequestContext {
    credentials: RwLock<Option<Credentials>>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    refresh_attempted: AtomicBool,
    refreshed: AtomicBool,
    confirmed_draft: Option<String>,
}

impl RequestContext {
    pub fn new(credentials: Option<Credentials>) -> Self {
        Self {
            credentials: RwLock::new(credentials),
            ..Default::default()
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: Credentials) -> Self {
        Self::new(Some(credentials))
    }

    pub fn with_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// The caller has confirmed sending this draft during this request
    pub fn with_confirmation(mut self, draft_id: impl Into<String>) -> Self {
        self.confirmed_draft = Some(draft_id.into());
        self
    }

    pub fn confirmed_draft(&self) -> Option<&str> {
        self.confirmed_draft.as_deref()
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Credentials renewed during this request, for the caller to persist
    pub fn refreshed_credentials(&self) -> Option<Credentials> {
        if self.refreshed.load(Ordering::SeqCst) {
            self.credentials()
        } else {
            None
        }
    }

    fn can_refresh(&self) -> bool {
        self.refresher.is_some()
            && !self.refresh_attempted.load(Ordering::SeqCst)
            && self
                .credentials()
                .map(|c| c.refresh_token.is_some())
                .unwrap_or(false)
    }

    /// Renew the access token once per request. Any failure means the user
    /// has to sign in again.
    pub async fn refresh(&self) -> Result<Credentials, ToolError> {
        let current = self.credentials().ok_or(ToolError::AuthRequired)?;
        let Some(refresher) = self.refresher.as_ref().filter(|_| self.can_refresh()) else {
            return Err(ToolError::AuthRequired);
        };
        self.refresh_attempted.store(true, Ordering::SeqCst);

        let mut renewed = match refresher.refresh(&current).await {
            Ok(renewed) => renewed,
            Err(e) => {
                warn!(error = %e, "token refresh failed");
                return Err(ToolError::AuthRequired);
            }
        };
        if renewed.refresh_token.is_none() {
            renewed.refresh_token = current.refresh_token;
        }

        info!("access token refreshed");
        *self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(renewed.clone());
        self.refreshed.store(true, Ordering::SeqCst);
        Ok(renewed)
    }

    /// Credentials ready for a backend call, refreshed first when expired
    pub async fn usable_credentials(&self) -> Result<Credentials, ToolError> {
        let creds = self.credentials().ok_or(ToolError::AuthRequired)?;
        if creds.is_expired(now_millis()) && self.can_refresh() {
            debug!("access token expired");
            return self.refresh().await;
        }
        Ok(creds)
    }

    /// Run a backend call, refreshing and retrying once if the token is rejected
    pub async fn authorized<T, F, Fut>(&self, call: F) -> Result<T, ToolError>
    where
        F: Fn(Credentials) -> Fut,
        Fut: Future<Output = Result<T, ToolError>>,
    {
        let creds = self.usable_credentials().await?;
        match call(creds).await {
            Err(ToolError::AuthRequired) if self.can_refresh() => {
                let creds = self.refresh().await?;
                call(creds).await
            }
            other => other,
        }
    }
}
