use anyhow::{Context, Result};
use integration_hub::oauth::ScopeDelimiter;
use integration_hub::OAuthConfig;

pub const BASE_URL: &str = "https://api.github.com";
pub const AUTH_URL: &str = "https://github.com/login/oauth/authorize";
pub const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
pub const SCOPES: &[&str] = &["repo", "read:user", "notifications"];

const CLIENT_ID_VAR: &str = "HUB_OAUTH_GITHUB_CLIENT_ID";
const CLIENT_SECRET_VAR: &str = "HUB_OAUTH_GITHUB_CLIENT_SECRET";

/// GitHub OAuth app credentials.
///
/// Loads client ID and secret from environment variables:
/// - `HUB_OAUTH_GITHUB_CLIENT_ID`
/// - `HUB_OAUTH_GITHUB_CLIENT_SECRET`
#[derive(Clone)]
pub struct GitHubConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: Option<String>,
}

impl GitHubConfig {
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

    /// GitHub issues no refresh tokens and has no RFC 7009 revoke endpoint.
    pub fn oauth_config(&self) -> OAuthConfig {
        OAuthConfig {
            auth_url: AUTH_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            revoke_url: None,
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
            scope_delimiter: ScopeDelimiter::Space,
            redirect_uri: self.redirect_uri.clone(),
            ..OAuthConfig::default()
        }
    }
}
