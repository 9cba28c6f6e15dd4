use anyhow::{Context, Result};
use integration_hub::oauth::ScopeDelimiter;
use integration_hub::OAuthConfig;
use std::collections::BTreeMap;

pub const BASE_URL: &str = "https://www.googleapis.com/calendar/v3";
pub const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const REVOKE_URL: &str = "https://oauth2.googleapis.com/revoke";
pub const SCOPES: &[&str] = &["https://www.googleapis.com/auth/calendar.readonly"];

const CLIENT_ID_VAR: &str = "HUB_OAUTH_GOOGLE_CALENDAR_CLIENT_ID";
const CLIENT_SECRET_VAR: &str = "HUB_OAUTH_GOOGLE_CALENDAR_CLIENT_SECRET";

/// Google OAuth client credentials for the Calendar connector.
///
/// Loads client ID and secret from environment variables:
/// - `HUB_OAUTH_GOOGLE_CALENDAR_CLIENT_ID`
/// - `HUB_OAUTH_GOOGLE_CALENDAR_CLIENT_SECRET`
#[derive(Clone)]
pub struct CalendarConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: Option<String>,
}

impl CalendarConfig {
    /// Load config from environment variables.
    pub fn from_env() -> Result<Self> {
        let client_id =
            std::env::var(CLIENT_ID_VAR).with_context(|| format!("{} not set", CLIENT_ID_VAR))?;
        let client_secret = std::env::var(CLIENT_SECRET_VAR)
            .with_context(|| format!("{} not set", CLIENT_SECRET_VAR))?;
        Ok(Self {
            client_id,
            client_secret,
            redirect_uri: None,
        })
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// `access_type=offline` + `prompt=consent` make Google return a
    /// refresh token on every consent.
    pub fn oauth_config(&self) -> OAuthConfig {
        let mut extra_auth_params = BTreeMap::new();
        extra_auth_params.insert("access_type".to_string(), "offline".to_string());
        extra_auth_params.insert("prompt".to_string(), "consent".to_string());

        OAuthConfig {
            auth_url: AUTH_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            revoke_url: Some(REVOKE_URL.to_string()),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
            scope_delimiter: ScopeDelimiter::Space,
            redirect_uri: self.redirect_uri.clone(),
            extra_auth_params,
            ..OAuthConfig::default()
        }
    }
}
