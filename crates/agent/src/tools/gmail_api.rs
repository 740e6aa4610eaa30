//! Gmail REST backend

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use mailagent_config::GMAIL_API_BASE;

use super::gmail::{DraftRequest, MailBackend, MessageFormat};
use super::ToolError;
use crate::credentials::Credentials;

const NO_RAW_MESSAGE_IN_DRAFT: &str = "NO_RAW_MESSAGE_IN_DRAFT";

impl From<reqwest::Error> for ToolError {
    fn from(e: reqwest::Error) -> Self {
        ToolError::Backend(format!("Gmail request failed: {}", e))
    }
}

/// Gmail API client acting for whichever credential each call carries
pub struct GmailApi {
    client: Client,
    api_base: String,
}

impl GmailApi {
    pub fn new(api_base: Option<String>) -> Self {
        let api_base = api_base
            .unwrap_or_else(|| GMAIL_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "could not build Gmail client, falling back to no timeout");
                Client::new()
            });
        Self { client, api_base }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/gmail/v1/users/me/{}", self.api_base, path)
    }

    async fn get_json(
        &self,
        creds: &Credentials,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, ToolError> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&creds.access_token)
            .query(query)
            .send()
            .await?;
        read_json(response).await
    }

    async fn post_json(
        &self,
        creds: &Credentials,
        path: &str,
        body: &Value,
    ) -> Result<Value, ToolError> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&creds.access_token)
            .json(body)
            .send()
            .await?;
        read_json(response).await
    }

    async fn sender_address(&self, creds: &Credentials) -> Result<String, ToolError> {
        let profile = self.get_json(creds, "profile", &[]).await?;
        Ok(profile["emailAddress"].as_str().unwrap_or_default().to_string())
    }
}

async fn read_json(response: Response) -> Result<Value, ToolError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        warn!("Gmail rejected the access token");
        return Err(ToolError::AuthRequired);
    }

    let body: Value = response.json().await.unwrap_or(Value::Null);
    if !status.is_success() {
        let msg = body["error"]["message"]
            .as_str()
            .unwrap_or("unknown error")
            .to_string();
        return Err(ToolError::Backend(format!(
            "Gmail API returned {}: {}",
            status.as_u16(),
            msg
        )));
    }
    Ok(body)
}

fn header_value(value: &str) -> String {
    value.replace(['\r', '\n'], "")
}

/// RFC 822 message, base64url encoded without padding
pub fn build_raw_message(from: &str, draft: &DraftRequest) -> String {
    let message = [
        format!("From: {}", header_value(from)),
        format!("To: {}", header_value(&draft.to)),
        format!("Subject: {}", header_value(&draft.subject)),
        "Content-Type: text/plain; charset=\"UTF-8\"".to_string(),
        String::new(),
        draft.body.clone(),
    ]
    .join("\r\n");
    URL_SAFE_NO_PAD.encode(message.as_bytes())
}

#[async_trait]
impl MailBackend for GmailApi {
    async fn search(
        &self,
        creds: &Credentials,
        query: &str,
        max_results: u32,
    ) -> Result<Value, ToolError> {
        let body = self
            .get_json(
                creds,
                "messages",
                &[
                    ("q", query.to_string()),
                    ("maxResults", max_results.to_string()),
                ],
            )
            .await?;
        let messages = body
            .get("messages")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));
        debug!(
            count = messages.as_array().map(|m| m.len()).unwrap_or(0),
            "gmail search results"
        );
        Ok(messages)
    }

    async fn get_message(
        &self,
        creds: &Credentials,
        message_id: &str,
        format: MessageFormat,
    ) -> Result<Value, ToolError> {
        let path = format!("messages/{}", urlencoding::encode(message_id));
        self.get_json(creds, &path, &[("format", format.as_str().to_string())])
            .await
    }

    async fn create_draft(
        &self,
        creds: &Credentials,
        draft: &DraftRequest,
    ) -> Result<Value, ToolError> {
        let from = self.sender_address(creds).await?;
        let raw = build_raw_message(&from, draft);
        self.post_json(creds, "drafts", &json!({ "message": { "raw": raw } }))
            .await
    }

    async fn send_draft(&self, creds: &Credentials, draft_id: &str) -> Result<Value, ToolError> {
        let path = format!("drafts/{}", urlencoding::encode(draft_id));
        let draft = self
            .get_json(creds, &path, &[("format", "raw".to_string())])
            .await?;
        if draft["message"]["raw"].as_str().is_none() {
            return Err(ToolError::Backend(NO_RAW_MESSAGE_IN_DRAFT.to_string()));
        }

        self.post_json(creds, "drafts/send", &json!({ "id": draft_id }))
            .await
    }
}
