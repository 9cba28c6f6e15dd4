//! Connector HTTP API.
//!
//! Exposes the runtime to the dashboard and the scheduler:
//! - `GET /api/connectors` - catalog (metadata + widgets)
//! - `GET /api/connectors/:id/oauth/start` - redirect to the provider
//! - `GET /api/connectors/:id/oauth/callback` - exchange the code, return tokens
//! - `POST /api/connectors/:id/oauth/refresh` - refresh tokens
//! - `POST /api/connectors/:id/oauth/revoke` - revoke an access token
//! - `POST /api/connectors/:id/test` - verify tokens
//! - `POST /api/connectors/:id/widgets/:widget_id` - fetch widget data
//!
//! Tokens are never stored here: the callback hands them back to the caller,
//! and every later request carries them in its body.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use integration_hub::oauth::{PkceChallenge, StateManager};
use integration_hub::{IntegrationError, OAuthTokens};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::registry::{callback_url, ConnectorRegistry, Provider};
use crate::types::{ConnectorMetadata, WidgetData, WidgetDefinition};
use crate::Connector;

const DEFAULT_ACCOUNT: &str = "default";

/// Shared state for the connector API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<ConnectorRegistry>,
    pub state_manager: StateManager,
    /// Public base URL the provider redirects back to
    pub callback_base_url: String,
}

/// A single entry in the `GET /api/connectors` response.
#[derive(Serialize)]
pub struct ConnectorInfo {
    #[serde(flatten)]
    pub metadata: ConnectorMetadata,
    pub widgets: Vec<WidgetDefinition>,
}

#[derive(Deserialize)]
pub struct StartParams {
    account: Option<String>,
}

/// OAuth callback query parameters
#[derive(Deserialize)]
pub struct OAuthCallback {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Tokens for a freshly connected account. Persisting them is the caller's job.
#[derive(Serialize)]
pub struct CallbackResponse {
    pub connector: String,
    pub account: String,
    pub tokens: OAuthTokens,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct RevokeRequest {
    pub access_token: String,
}

#[derive(Deserialize)]
pub struct TestRequest {
    pub tokens: OAuthTokens,
}

#[derive(Serialize)]
pub struct TestResponse {
    pub connected: bool,
}

#[derive(Deserialize)]
pub struct WidgetRequest {
    pub tokens: OAuthTokens,
    #[serde(default)]
    pub params: Value,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: String,
}

// ---------------------------------------------------------------------------
// HTTP handlers
// ---------------------------------------------------------------------------

async fn list_connectors(State(state): State<Arc<ApiState>>) -> Json<Vec<ConnectorInfo>> {
    let connectors = state
        .registry
        .list()
        .iter()
        .map(|c| ConnectorInfo {
            metadata: c.metadata().clone(),
            widgets: c.widgets().to_vec(),
        })
        .collect();
    Json(connectors)
}

/// GET /api/connectors/:id/oauth/start
///
/// Generates a single-use CSRF state bound to `(connector, account)` and
/// redirects to the provider's consent page. Connectors that support PKCE
/// get a fresh challenge; its verifier rides along in the state entry.
async fn oauth_start(
    State(state): State<Arc<ApiState>>,
    Path(connector_id): Path<String>,
    Query(params): Query<StartParams>,
) -> Result<Redirect, AppError> {
    debug!(connector = %connector_id, "OAuth start requested");

    let (provider, connector) = lookup(&state, &connector_id)?;
    let account = params
        .account
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| DEFAULT_ACCOUNT.to_string());
    let redirect_uri = callback_url(&state.callback_base_url, provider);

    let auth_url = if connector.supports_pkce() {
        let pkce = PkceChallenge::generate();
        let csrf_state = state.state_manager.create_state(
            &connector_id,
            &account,
            Some(pkce.verifier.clone()),
        );
        connector.authorization_url_with_pkce(
            &csrf_state,
            None,
            Some(redirect_uri.as_str()),
            &pkce,
        )?
    } else {
        let csrf_state = state
            .state_manager
            .create_state(&connector_id, &account, None);
        connector.authorization_url(&csrf_state, None, Some(redirect_uri.as_str()))?
    };

    info!(connector = %connector_id, account = %account, "Redirecting to OAuth provider");
    Ok(Redirect::temporary(auth_url.as_str()))
}

/// GET /api/connectors/:id/oauth/callback
///
/// Validates and consumes the CSRF state, then exchanges the code.
async fn oauth_callback(
    State(state): State<Arc<ApiState>>,
    Path(connector_id): Path<String>,
    Query(callback): Query<OAuthCallback>,
) -> Result<Json<CallbackResponse>, AppError> {
    debug!(connector = %connector_id, "OAuth callback received");

    let (provider, connector) = lookup(&state, &connector_id)?;

    if let Some(error) = callback.error {
        warn!(
            connector = %connector_id,
            error = %error,
            description = ?callback.error_description,
            "OAuth authorization failed"
        );
        return Err(AppError::BadRequest(format!(
            "OAuth authorization failed: {} - {}",
            error,
            callback
                .error_description
                .unwrap_or_else(|| "Unknown error".to_string())
        )));
    }

    let code = callback
        .code
        .ok_or_else(|| AppError::BadRequest("Missing 'code' parameter".to_string()))?;
    let csrf_state = callback
        .state
        .ok_or_else(|| AppError::BadRequest("Missing 'state' parameter".to_string()))?;

    let entry = state
        .state_manager
        .validate_and_consume(&csrf_state)
        .ok_or_else(|| {
            warn!(connector = %connector_id, "Invalid or expired OAuth state");
            AppError::BadRequest("Invalid or expired state parameter".to_string())
        })?;

    if entry.connector != connector_id {
        warn!(
            expected = %entry.connector,
            actual = %connector_id,
            "OAuth state issued for a different connector"
        );
        return Err(AppError::BadRequest(
            "State parameter does not match connector".to_string(),
        ));
    }

    let redirect_uri = callback_url(&state.callback_base_url, provider);
    let tokens = connector
        .exchange_code(&code, &redirect_uri, entry.code_verifier.as_deref())
        .await?;

    info!(connector = %connector_id, account = %entry.account, "OAuth flow completed");
    Ok(Json(CallbackResponse {
        connector: connector_id,
        account: entry.account,
        tokens,
    }))
}

/// POST /api/connectors/:id/oauth/refresh
async fn oauth_refresh(
    State(state): State<Arc<ApiState>>,
    Path(connector_id): Path<String>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<OAuthTokens>, AppError> {
    let (_, connector) = lookup(&state, &connector_id)?;
    let tokens = connector.refresh_access_token(&req.refresh_token).await?;
    debug!(connector = %connector_id, expires_at = ?tokens.expires_at, "Tokens refreshed");
    Ok(Json(tokens))
}

/// POST /api/connectors/:id/oauth/revoke
async fn oauth_revoke(
    State(state): State<Arc<ApiState>>,
    Path(connector_id): Path<String>,
    Json(req): Json<RevokeRequest>,
) -> Result<StatusCode, AppError> {
    let (_, connector) = lookup(&state, &connector_id)?;
    connector.revoke_token(&req.access_token).await?;
    info!(connector = %connector_id, "Token revoked");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/connectors/:id/test
async fn test_connection(
    State(state): State<Arc<ApiState>>,
    Path(connector_id): Path<String>,
    Json(req): Json<TestRequest>,
) -> Result<Json<TestResponse>, AppError> {
    let (_, connector) = lookup(&state, &connector_id)?;
    let connected = connector.test_connection(&req.tokens).await;
    Ok(Json(TestResponse { connected }))
}

/// POST /api/connectors/:id/widgets/:widget_id
async fn widget_data(
    State(state): State<Arc<ApiState>>,
    Path((connector_id, widget_id)): Path<(String, String)>,
    Json(req): Json<WidgetRequest>,
) -> Result<Json<WidgetData>, AppError> {
    let (_, connector) = lookup(&state, &connector_id)?;
    let data = connector
        .get_widget_data(&req.tokens, &widget_id, &req.params)
        .await
        .map_err(|e| {
            debug!(
                connector = %connector_id,
                widget = %widget_id,
                kind = e.kind(),
                "Widget fetch failed"
            );
            e
        })?;
    Ok(Json(data))
}

fn lookup(state: &ApiState, connector_id: &str) -> Result<(Provider, Arc<dyn Connector>), AppError> {
    let provider = Provider::from_str(connector_id)?;
    let connector = state.registry.get(connector_id)?;
    Ok((provider, connector))
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

enum AppError {
    BadRequest(String),
    Integration(IntegrationError),
}

impl From<IntegrationError> for AppError {
    fn from(e: IntegrationError) -> Self {
        AppError::Integration(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: msg,
                    kind: "bad_request".to_string(),
                }),
            )
                .into_response(),
            AppError::Integration(e) => {
                let status =
                    StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let body = Json(ErrorResponse {
                    error: e.to_string(),
                    kind: e.kind().to_string(),
                });
                match e.retry_after() {
                    Some(secs) => {
                        (status, [(header::RETRY_AFTER, secs.to_string())], body).into_response()
                    }
                    None => (status, body).into_response(),
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/connectors", get(list_connectors))
        .route("/api/connectors/:id/oauth/start", get(oauth_start))
        .route("/api/connectors/:id/oauth/callback", get(oauth_callback))
        .route("/api/connectors/:id/oauth/refresh", post(oauth_refresh))
        .route("/api/connectors/:id/oauth/revoke", post(oauth_revoke))
        .route("/api/connectors/:id/test", post(test_connection))
        .route("/api/connectors/:id/widgets/:widget_id", post(widget_data))
        .with_state(Arc::new(state))
}
