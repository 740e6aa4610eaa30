//! Signed-cookie credential storage
//!
//! Tokens live in the `g_tokens` cookie as
//! `base64(json) + "--" + hex(hmac_sha256(secret, base64(json)))`.

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use mailagent_agent::Credentials;

use crate::{GatewayError, Result};

type HmacSha256 = Hmac<Sha256>;

pub const TOKEN_COOKIE: &str = "g_tokens";
const ONE_YEAR_SECS: u64 = 31_536_000;

fn mac_for(secret: &str) -> Result<HmacSha256> {
    <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .map_err(|e| GatewayError::Cookie(e.to_string()))
}

/// Append `--<hex mac>` to a value
pub fn sign_value(secret: &str, value: &str) -> Result<String> {
    let mut mac = mac_for(secret)?;
    mac.update(value.as_bytes());
    Ok(format!(
        "{}--{}",
        value,
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// The original value if the signature matches, compared in constant time
pub fn verify_signed_value<'a>(secret: &str, signed: &'a str) -> Option<&'a str> {
    let (value, signature) = signed.rsplit_once("--")?;
    let signature = hex::decode(signature).ok()?;

    let mut mac = mac_for(secret).ok()?;
    mac.update(value.as_bytes());
    mac.verify_slice(&signature).ok()?;
    Some(value)
}

/// Value of the named cookie across all `Cookie` headers
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Where the gateway keeps each user's mailbox credential
pub trait CredentialStore: Send + Sync {
    /// Credential for this request, if any valid one is present
    fn load(&self, headers: &HeaderMap) -> Option<Credentials>;

    /// `Set-Cookie` value persisting the credential
    fn issue(&self, credentials: &Credentials) -> Result<HeaderValue>;
}

pub struct SignedCookieStore {
    secret: String,
}

impl SignedCookieStore {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn encode(&self, credentials: &Credentials) -> Result<String> {
        let json = serde_json::to_string(credentials)?;
        sign_value(&self.secret, &STANDARD.encode(json))
    }

    pub fn decode(&self, signed: &str) -> Option<Credentials> {
        let Some(value) = verify_signed_value(&self.secret, signed) else {
            debug!("token cookie failed signature check");
            return None;
        };
        let json = STANDARD.decode(value).ok()?;
        serde_json::from_slice(&json).ok()
    }
}

impl CredentialStore for SignedCookieStore {
    fn load(&self, headers: &HeaderMap) -> Option<Credentials> {
        cookie_value(headers, TOKEN_COOKIE).and_then(|signed| self.decode(signed))
    }

    fn issue(&self, credentials: &Credentials) -> Result<HeaderValue> {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            TOKEN_COOKIE,
            self.encode(credentials)?,
            ONE_YEAR_SECS
        );
        HeaderValue::from_str(&cookie).map_err(|e| GatewayError::Cookie(e.to_string()))
    }
}
