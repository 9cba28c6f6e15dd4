//! Token endpoint calls: code exchange, refresh and revocation.
//!
//! Each is a single form-encoded POST with no retry; failures surface as
//! [`IntegrationError::OAuth`] carrying the provider's `error` and
//! `error_description` when the body has them.

use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use super::OAuthConfig;
use crate::credentials::OAuthTokens;
use crate::error::{IntegrationError, Result};

/// OAuth token response (standard OAuth 2.0)
///
/// `expires_in` and `scope` are kept loose: some providers send the former
/// as a string and the latter as an array.
#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<Value>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    scope: Option<Value>,
}

/// OAuth error body (RFC 6749 §5.2)
#[derive(Deserialize, Debug)]
struct ErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// POST to the token endpoint and convert the answer into [`OAuthTokens`].
///
/// `previous_refresh_token` is carried over when the provider does not
/// rotate refresh tokens.
pub(crate) async fn request_tokens(
    client: &Client,
    config: &OAuthConfig,
    form: Vec<(&str, String)>,
    previous_refresh_token: Option<&str>,
) -> Result<OAuthTokens> {
    let grant_type = form
        .iter()
        .find(|(k, _)| *k == "grant_type")
        .map(|(_, v)| v.clone())
        .unwrap_or_default();

    let mut form_data: HashMap<&str, String> = form.into_iter().collect();
    form_data.insert("client_id", config.client_id.clone());
    form_data.insert("client_secret", config.client_secret.clone());
    for (key, value) in &config.extra_token_params {
        form_data
            .entry(key.as_str())
            .or_insert_with(|| value.clone());
    }

    tracing::debug!(
        grant_type = %grant_type,
        "Requesting tokens at {}",
        config.token_url
    );

    let response = client
        .post(&config.token_url)
        .header("Accept", "application/json")
        .form(&form_data)
        .send()
        .await
        .map_err(IntegrationError::transport)?;

    let status = response.status();
    let body = response.text().await.map_err(IntegrationError::transport)?;

    if !status.is_success() {
        tracing::warn!(grant_type = %grant_type, status = status.as_u16(), "Token request rejected");
        return Err(oauth_error_from_body(status, &body));
    }

    let raw = parse_body(&body);
    // Some providers (GitHub) report grant failures with a 200 and an `error` field.
    if let Ok(error) = serde_json::from_value::<ErrorResponse>(raw.clone()) {
        if raw.get("access_token").is_none() {
            return Err(IntegrationError::oauth(error.error, error.error_description));
        }
    }

    let token_response: TokenResponse =
        serde_json::from_value(raw.clone()).map_err(|e| IntegrationError::Decode {
            message: format!("token response: {}", e),
        })?;

    tracing::debug!(
        grant_type = %grant_type,
        has_refresh_token = token_response.refresh_token.is_some(),
        expires_in = ?token_response.expires_in,
        "Token request successful"
    );

    // Calculate expiration time at receipt
    let expires_at = token_response
        .expires_in
        .as_ref()
        .and_then(seconds_from_value)
        .and_then(expiry_from_now);

    let refresh_token = token_response
        .refresh_token
        .or_else(|| previous_refresh_token.map(str::to_string));

    Ok(OAuthTokens {
        access_token: token_response.access_token,
        refresh_token,
        expires_at,
        token_type: normalize_token_type(token_response.token_type),
        scope: token_response.scope.as_ref().and_then(scope_string),
        raw,
    })
}

/// POST the token to the revoke endpoint.
///
/// HTTP 400 means the token is already invalid and counts as success.
pub(crate) async fn revoke(
    client: &Client,
    config: &OAuthConfig,
    revoke_url: &str,
    token: &str,
) -> Result<()> {
    let form_data = [
        ("token", token),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
    ];

    tracing::debug!("Revoking token at {}", revoke_url);

    let response = client
        .post(revoke_url)
        .header("Accept", "application/json")
        .form(&form_data)
        .send()
        .await
        .map_err(IntegrationError::transport)?;

    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::BAD_REQUEST {
        tracing::debug!("Revoke endpoint answered 400, treating token as already revoked");
        return Ok(());
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read body>".to_string());
    Err(oauth_error_from_body(status, &body))
}

/// JSON body, or a form-encoded body converted to a JSON object.
fn parse_body(body: &str) -> Value {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return value;
    }
    match serde_urlencoded::from_str::<Vec<(String, String)>>(body) {
        Ok(pairs) if !pairs.is_empty() => Value::Object(
            pairs
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect(),
        ),
        _ => Value::String(body.to_string()),
    }
}

fn oauth_error_from_body(status: StatusCode, body: &str) -> IntegrationError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(error) => IntegrationError::oauth(error.error, error.error_description),
        Err(_) => {
            let description = if body.trim().is_empty() {
                None
            } else {
                Some(body.to_string())
            };
            IntegrationError::oauth(format!("http_{}", status.as_u16()), description)
        }
    }
}

fn seconds_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn scope_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" "),
        ),
        _ => None,
    }
}

fn normalize_token_type(token_type: Option<String>) -> String {
    match token_type {
        Some(t) if t.eq_ignore_ascii_case("bearer") || t.is_empty() => "Bearer".to_string(),
        Some(t) => t,
        None => "Bearer".to_string(),
    }
}

/// `None` when the provider's lifetime does not fit a timestamp.
fn expiry_from_now(seconds: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(seconds).and_then(|ttl| Utc::now().checked_add_signed(ttl))
}
