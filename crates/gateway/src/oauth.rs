//! Google OAuth 2.0 sign-in for Gmail access

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use mailagent_agent::credentials::now_millis;
use mailagent_agent::{Credentials, TokenRefresher, ToolError};
use mailagent_config::Config;

use crate::{GatewayError, Result};

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

pub const GMAIL_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/gmail.readonly",
    "https://www.googleapis.com/auth/gmail.compose",
    "https://www.googleapis.com/auth/gmail.send",
    "https://www.googleapis.com/auth/gmail.modify",
];

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Seconds from now
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

/// OAuth client for the Gmail scopes
pub struct GoogleOAuth {
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_url: String,
    token_url: String,
}

impl GoogleOAuth {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url: redirect_url.into(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }

    /// None unless client id, secret and redirect are all configured
    pub fn from_config(config: &Config) -> Option<Self> {
        match (
            config.google_client_id(),
            config.google_client_secret(),
            config.google_redirect_url(),
        ) {
            (Some(id), Some(secret), Some(redirect)) => Some(Self::new(id, secret, redirect)),
            _ => {
                warn!("Google OAuth client is not configured, sign-in disabled");
                None
            }
        }
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Consent screen URL: offline access, Gmail scopes, account picker
    pub fn authorize_url(&self) -> String {
        let scope = GMAIL_SCOPES.join(" ");
        format!(
            "{}?access_type=offline&scope={}&prompt=select_account&response_type=code&client_id={}&redirect_uri={}",
            GOOGLE_AUTH_URL,
            urlencoding::encode(&scope),
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_url),
        )
    }

    /// Trade an authorization code for tokens
    pub async fn exchange_code(&self, code: &str) -> Result<Credentials> {
        let params = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let credentials = self.request_tokens(&params, "token exchange").await?;
        info!("exchanged authorization code for tokens");
        Ok(credentials)
    }

    /// New access token for a stored refresh token. Google usually omits the
    /// refresh token from this response; callers keep the one they have.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<Credentials> {
        let params = [
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let credentials = self.request_tokens(&params, "token refresh").await?;
        info!("refreshed access token");
        Ok(credentials)
    }

    async fn request_tokens(&self, params: &[(&str, &str)], what: &str) -> Result<Credentials> {
        let response = self.client.post(&self.token_url).form(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let reason = body["error_description"]
                .as_str()
                .or_else(|| body["error"].as_str())
                .unwrap_or("unknown error");
            return Err(GatewayError::OAuth(format!(
                "{} failed ({}): {}",
                what,
                status.as_u16(),
                reason
            )));
        }

        let tokens: TokenResponse = response.json().await?;
        Ok(Credentials {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expiry_date: tokens.expires_in.map(|secs| now_millis() + secs * 1000),
            scope: tokens.scope,
            token_type: tokens.token_type,
        })
    }
}

#[async_trait]
impl TokenRefresher for GoogleOAuth {
    async fn refresh(
        &self,
        credentials: &Credentials,
    ) -> std::result::Result<Credentials, ToolError> {
        let refresh_token = credentials
            .refresh_token
            .as_deref()
            .ok_or(ToolError::AuthRequired)?;
        self.refresh_access_token(refresh_token)
            .await
            .map_err(|e| ToolError::Backend(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_url() {
        let oauth = GoogleOAuth::new("cid", "secret", "http://localhost:3000/api/auth/google/callback");
        let url = oauth.authorize_url();

        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=select_account"));
        assert!(url.contains("client_id=cid"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fapi%2Fauth%2Fgoogle%2Fcallback"
        ));
        assert!(url.contains("gmail.readonly%20https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fgmail.compose"));
        assert!(!url.contains("secret"));
    }

    #[test]
    fn test_from_config_requires_all_fields() {
        let mut config = Config::default();
        config.google.client_id = "cid".to_string();
        config.google.client_secret = "secret".to_string();
        config.google.redirect_url = "http://localhost/cb".to_string();
        assert!(GoogleOAuth::from_config(&config).is_some());
    }

    #[tokio::test]
    async fn test_refresh_access_token() {
        let mut server = mockito::Server::new_async().await;
        let token = server
            .mock("POST", "/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                mockito::Matcher::UrlEncoded("refresh_token".into(), "1//r".into()),
                mockito::Matcher::UrlEncoded("client_id".into(), "cid".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"ya29.fresh","expires_in":3599,"token_type":"Bearer"}"#)
            .create_async()
            .await;

        let oauth = GoogleOAuth::new("cid", "secret", "http://localhost/cb")
            .with_token_url(format!("{}/token", server.url()));
        let stored = Credentials {
            refresh_token: Some("1//r".to_string()),
            ..Credentials::bearer("ya29.stale")
        };

        let renewed = oauth.refresh(&stored).await.unwrap();
        assert_eq!(renewed.access_token, "ya29.fresh");
        assert!(renewed.refresh_token.is_none());
        assert!(renewed.expiry_date.unwrap() > now_millis());
        token.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("POST", "/token")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#)
            .create_async()
            .await;

        let oauth = GoogleOAuth::new("cid", "secret", "http://localhost/cb")
            .with_token_url(format!("{}/token", server.url()));

        let err = oauth.refresh_access_token("1//r").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "oauth error: token refresh failed (400): Token has been expired or revoked."
        );
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token() {
        let oauth = GoogleOAuth::new("cid", "secret", "http://localhost/cb");
        let result = oauth.refresh(&Credentials::bearer("ya29.stale")).await;
        assert_eq!(result, Err(ToolError::AuthRequired));
    }
}
