//! HTTP gateway for the mail assistant
//!
//! Serves the chat endpoint that drives the agent loop, the confirmed-send
//! and direct-search endpoints, and the Google sign-in flow that stores the
//! mailbox credential in a signed cookie. Access tokens renewed while
//! handling a request are written back to that cookie.

pub mod cookies;
pub mod oauth;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use mailagent_agent::gate::signals_auth_required;
use mailagent_agent::tools::{GmailApi, ToolOutput, ToolResult, CONFIRMED_ARG};
use mailagent_agent::{
    AgentError, AgentLoop, LoopOutcome, LoopSettings, RequestContext, ToolRegistry,
    AUTH_REQUIRED,
};
use mailagent_config::Config;
use mailagent_provider::{Message, OpenRouterProvider, Provider};

pub use cookies::{CredentialStore, SignedCookieStore};
pub use oauth::GoogleOAuth;

/// Gateway errors
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("oauth error: {0}")]
    OAuth(String),

    #[error("cookie error: {0}")]
    Cookie(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

const INVALID_CHAT_REQUEST: &str = "Invalid request, pass messages";

/// Everything the handlers share
pub struct GatewayState<P: Provider> {
    pub agent: AgentLoop<P>,
    pub credentials: Arc<dyn CredentialStore>,
    pub oauth: Option<Arc<GoogleOAuth>>,
    /// Where the browser lands after sign-in
    pub base_url: String,
}

impl<P: Provider> GatewayState<P> {
    fn request_context(&self, headers: &HeaderMap) -> RequestContext {
        let ctx = RequestContext::new(self.credentials.load(headers));
        match &self.oauth {
            Some(oauth) => ctx.with_refresher(oauth.clone()),
            None => ctx,
        }
    }

    /// Re-issue the session cookie when the request refreshed the token
    fn renew_session(&self, ctx: &RequestContext, mut response: Response) -> Response {
        let Some(credentials) = ctx.refreshed_credentials() else {
            return response;
        };
        match self.credentials.issue(&credentials) {
            Ok(cookie) => {
                response.headers_mut().append(header::SET_COOKIE, cookie);
            }
            Err(e) => warn!("could not re-issue session cookie: {}", e),
        }
        response
    }
}

/// Build the router with all gateway routes
pub fn build_router<P: Provider + 'static>(state: Arc<GatewayState<P>>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat", post(chat_handler::<P>))
        .route("/api/gmail/send", post(send_handler::<P>))
        .route("/api/gmail/search", post(search_handler::<P>))
        .route("/api/auth/google/login", get(login_handler::<P>))
        .route("/api/auth/google/callback", get(callback_handler::<P>))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Wire the OpenRouter endpoint, Gmail backend and cookie store from config
pub fn state_from_config(config: &Config) -> GatewayState<OpenRouterProvider> {
    if !config.has_api_key() {
        warn!("no OpenRouter API key configured, chat requests will fail");
    }
    let provider = OpenRouterProvider::new(
        config.api_key().unwrap_or_default(),
        config.api_base(),
        Some(config.default_model()),
    );
    let gmail = Arc::new(GmailApi::new(Some(config.gmail_api_base())));
    let tools = ToolRegistry::gmail(gmail, config.agent.defaults.search_max_results);

    GatewayState {
        agent: AgentLoop::new(
            Arc::new(provider),
            tools,
            LoopSettings::from_config(config),
        ),
        credentials: Arc::new(SignedCookieStore::new(config.cookie_secret())),
        oauth: GoogleOAuth::from_config(config).map(Arc::new),
        base_url: config.gateway.base_url.clone(),
    }
}

/// Start the gateway HTTP server
pub async fn start(config: Config) -> Result<()> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let app = build_router(Arc::new(state_from_config(&config)));

    info!(addr = %addr, "gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn auth_required() -> Response {
    json_error(StatusCode::UNAUTHORIZED, AUTH_REQUIRED)
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    messages: Vec<Message>,
    /// Draft the user clicked Confirm on
    #[serde(default)]
    confirm_draft_id: Option<String>,
}

fn outcome_status(outcome: &LoopOutcome) -> StatusCode {
    match outcome {
        LoopOutcome::AuthRequired => StatusCode::UNAUTHORIZED,
        LoopOutcome::ParseFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::OK,
    }
}

async fn chat_handler<P: Provider + 'static>(
    State(state): State<Arc<GatewayState<P>>>,
    headers: HeaderMap,
    body: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = body else {
        return json_error(StatusCode::BAD_REQUEST, INVALID_CHAT_REQUEST);
    };

    let mut ctx = state.request_context(&headers);
    if let Some(draft_id) = request.confirm_draft_id.filter(|id| !id.is_empty()) {
        info!(draft_id = %draft_id, "chat request confirms a draft");
        ctx = ctx.with_confirmation(draft_id);
    }

    match state.agent.run(&ctx, request.messages).await {
        Ok(outcome) => {
            info!(outcome = outcome.label(), "chat request finished");
            let response = (outcome_status(&outcome), Json(outcome.to_json())).into_response();
            state.renew_session(&ctx, response)
        }
        Err(AgentError::InvalidRequest(reason)) => {
            warn!(%reason, "rejected chat request");
            json_error(StatusCode::BAD_REQUEST, INVALID_CHAT_REQUEST)
        }
        Err(e) => {
            error!("chat request failed: {}", e);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Map a direct tool call to a response, with `AUTH_REQUIRED` as 401
fn tool_response(result: ToolResult, wrap: impl FnOnce(Value) -> Value) -> Response {
    if signals_auth_required(&result) {
        return auth_required();
    }
    match result {
        Ok(ToolOutput::Value(value)) => Json(wrap(value)).into_response(),
        Ok(other) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("unexpected tool output: {:?}", other),
        ),
        Err(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// The caller's explicit confirmation: sends the draft with `confirmed: true`
async fn send_handler<P: Provider + 'static>(
    State(state): State<Arc<GatewayState<P>>>,
    headers: HeaderMap,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Response {
    let draft_id = body
        .ok()
        .and_then(|Json(v)| v.get("draftId").and_then(Value::as_str).map(str::to_string))
        .filter(|id| !id.is_empty());
    let Some(draft_id) = draft_id else {
        return json_error(StatusCode::BAD_REQUEST, "Missing draftId");
    };

    let mut args = Map::new();
    args.insert("draftId".to_string(), Value::String(draft_id));
    args.insert(CONFIRMED_ARG.to_string(), Value::Bool(true));

    let ctx = state.request_context(&headers);
    let result = state.agent.tools().dispatch(&ctx, "gmail_send", args).await;
    let response = tool_response(result, |sent| json!({ "ok": true, "result": sent }));
    state.renew_session(&ctx, response)
}

async fn search_handler<P: Provider + 'static>(
    State(state): State<Arc<GatewayState<P>>>,
    headers: HeaderMap,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Response {
    let mut args = Map::new();
    if let Ok(Json(Value::Object(body))) = body {
        for key in ["query", "maxResults"] {
            if let Some(value) = body.get(key).filter(|v| !v.is_null()) {
                args.insert(key.to_string(), value.clone());
            }
        }
    }

    let ctx = state.request_context(&headers);
    let result = state.agent.tools().dispatch(&ctx, "gmail_search", args).await;
    let response = tool_response(result, |messages| json!({ "messages": messages }));
    state.renew_session(&ctx, response)
}

async fn login_handler<P: Provider + 'static>(
    State(state): State<Arc<GatewayState<P>>>,
) -> Response {
    match &state.oauth {
        Some(oauth) => (
            StatusCode::FOUND,
            [(header::LOCATION, oauth.authorize_url())],
        )
            .into_response(),
        None => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Google OAuth is not configured",
        ),
    }
}

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
}

async fn callback_handler<P: Provider + 'static>(
    State(state): State<Arc<GatewayState<P>>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return json_error(StatusCode::BAD_REQUEST, "No code provided");
    };
    let Some(oauth) = &state.oauth else {
        return json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Google OAuth is not configured",
        );
    };

    let cookie = oauth
        .exchange_code(&code)
        .await
        .and_then(|credentials| state.credentials.issue(&credentials));
    match cookie {
        Ok(cookie) => {
            info!("signed in, redirecting to {}", state.base_url);
            (
                StatusCode::FOUND,
                [(header::LOCATION, state.base_url.clone())],
                [(header::SET_COOKIE, cookie)],
            )
                .into_response()
        }
        Err(e) => {
            error!("sign-in failed: {}", e);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
