//! OAuth 2.0 authorization code flow: token lifecycle for connectors.
//!
//! Tokens move `unissued -> active -> (expired -> active via refresh) ->
//! revoked`. Every transition is driven by the caller:
//! 1. [`TokenManager::build_authorization_url`] → redirect the user
//! 2. Provider redirects back with `code` and `state`
//! 3. [`TokenManager::exchange_code`] → [`OAuthTokens`]
//! 4. Caller checks `expires_at` and calls [`TokenManager::refresh_access_token`]
//! 5. [`TokenManager::revoke_token`] on disconnect
//!
//! There is no background refresh.

mod exchange;
pub mod pkce;
mod provider;
pub mod state_manager;

pub use pkce::PkceChallenge;
pub use state_manager::{run_state_cleanup, StateEntry, StateManager};

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::credentials::OAuthTokens;
use crate::error::Result;

/// Separator between scopes in the `scope` parameter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeDelimiter {
    #[default]
    Space,
    Comma,
}

impl ScopeDelimiter {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeDelimiter::Space => " ",
            ScopeDelimiter::Comma => ",",
        }
    }

    pub fn join(&self, scopes: &[String]) -> String {
        scopes.join(self.as_str())
    }
}

/// OAuth grant used to obtain the initial tokens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    #[default]
    AuthorizationCode,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::AuthorizationCode => "authorization_code",
        }
    }
}

/// OAuth configuration for a connector.
///
/// Defines the OAuth 2.0 endpoints, client credentials and scopes required
/// to authenticate with the external API. Read-only once built; connectors
/// share it behind an `Arc`.
///
/// # Example
/// ```
/// use integration_hub::oauth::OAuthConfig;
///
/// let config = OAuthConfig {
///     auth_url: "https://github.com/login/oauth/authorize".to_string(),
///     token_url: "https://github.com/login/oauth/access_token".to_string(),
///     client_id: "client".to_string(),
///     client_secret: "secret".to_string(),
///     scopes: vec!["repo".to_string(), "read:user".to_string()],
///     ..OAuthConfig::default()
/// };
/// assert!(config.revoke_url.is_none());
/// ```
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// OAuth authorization endpoint URL
    pub auth_url: String,

    /// OAuth token exchange endpoint URL
    pub token_url: String,

    /// Token revocation endpoint, if the provider has one
    #[serde(default)]
    pub revoke_url: Option<String>,

    pub client_id: String,

    #[serde(default, skip_serializing)]
    pub client_secret: String,

    /// Default scopes requested during authorization
    #[serde(default)]
    pub scopes: Vec<String>,

    #[serde(default)]
    pub scope_delimiter: ScopeDelimiter,

    #[serde(default)]
    pub grant_type: GrantType,

    /// Provider-specific default callback, used when the caller passes none
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// Extra query parameters for the authorization URL
    /// (e.g. `access_type=offline`)
    #[serde(default)]
    pub extra_auth_params: BTreeMap<String, String>,

    /// Extra form fields for token requests
    #[serde(default)]
    pub extra_token_params: BTreeMap<String, String>,
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("revoke_url", &self.revoke_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scopes", &self.scopes)
            .field("scope_delimiter", &self.scope_delimiter)
            .field("grant_type", &self.grant_type)
            .field("redirect_uri", &self.redirect_uri)
            .field("extra_auth_params", &self.extra_auth_params)
            .field("extra_token_params", &self.extra_token_params)
            .finish()
    }
}

/// Token lifecycle manager for one provider.
///
/// Stateless apart from the shared config and HTTP client: every operation
/// takes what it needs as arguments and returns a new [`OAuthTokens`].
#[derive(Clone)]
pub struct TokenManager {
    config: Arc<OAuthConfig>,
    http_client: Client,
}

impl TokenManager {
    pub fn new(config: Arc<OAuthConfig>) -> Self {
        Self::with_client(config, Client::new())
    }

    pub fn with_client(config: Arc<OAuthConfig>, http_client: Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Build the URL the user is redirected to for consent.
    ///
    /// `state` is an opaque anti-CSRF token the caller validates on callback.
    /// `scopes` defaults to the configured set, `redirect_uri` to the
    /// configured callback. No I/O; fails only on a malformed authorization
    /// endpoint.
    pub fn build_authorization_url(
        &self,
        state: &str,
        scopes: Option<&[String]>,
        redirect_uri: Option<&str>,
    ) -> Result<Url> {
        provider::authorization_url(&self.config, state, scopes, redirect_uri, None)
    }

    /// Same as [`build_authorization_url`](Self::build_authorization_url),
    /// adding the PKCE `code_challenge`.
    pub fn build_authorization_url_with_pkce(
        &self,
        state: &str,
        scopes: Option<&[String]>,
        redirect_uri: Option<&str>,
        pkce: &PkceChallenge,
    ) -> Result<Url> {
        provider::authorization_url(&self.config, state, scopes, redirect_uri, Some(pkce))
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Arguments
    /// * `code` - Authorization code from callback
    /// * `redirect_uri` - Redirect URI used in the authorization request
    /// * `code_verifier` - PKCE verifier, if a challenge was sent
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: Option<&str>,
    ) -> Result<OAuthTokens> {
        let mut form = vec![
            ("grant_type", self.config.grant_type.as_str().to_string()),
            ("code", code.to_string()),
            ("redirect_uri", redirect_uri.to_string()),
        ];
        if let Some(verifier) = code_verifier {
            form.push(("code_verifier", verifier.to_string()));
        }

        exchange::request_tokens(&self.http_client, &self.config, form, None).await
    }

    /// Obtain a new access token from a refresh token.
    ///
    /// If the provider does not rotate refresh tokens, the returned value
    /// keeps `refresh_token`.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<OAuthTokens> {
        let form = vec![
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", refresh_token.to_string()),
        ];

        exchange::request_tokens(&self.http_client, &self.config, form, Some(refresh_token)).await
    }

    /// Revoke an access token. No-op when the provider has no revoke
    /// endpoint.
    pub async fn revoke_token(&self, access_token: &str) -> Result<()> {
        match &self.config.revoke_url {
            Some(revoke_url) => {
                exchange::revoke(&self.http_client, &self.config, revoke_url, access_token).await
            }
            None => {
                tracing::debug!("No revoke endpoint configured, skipping revocation");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IntegrationError;
    use mockito::{Matcher, Server};

    fn make_manager(base_url: &str, revoke: bool) -> TokenManager {
        let config = OAuthConfig {
            auth_url: format!("{}/oauth/authorize", base_url),
            token_url: format!("{}/oauth/token", base_url),
            revoke_url: revoke.then(|| format!("{}/oauth/revoke", base_url)),
            client_id: "client_abc".to_string(),
            client_secret: "secret_xyz".to_string(),
            scopes: vec!["read".to_string()],
            ..OAuthConfig::default()
        };
        TokenManager::new(Arc::new(config))
    }

    #[tokio::test]
    async fn test_exchange_code_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/token")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "auth_code_123".into()),
                Matcher::UrlEncoded("redirect_uri".into(), "http://localhost/cb".into()),
                Matcher::UrlEncoded("client_id".into(), "client_abc".into()),
                Matcher::UrlEncoded("client_secret".into(), "secret_xyz".into()),
                Matcher::UrlEncoded("code_verifier".into(), "verifier_1".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "access_token": "at_1",
                    "refresh_token": "rt_1",
                    "expires_in": 3600,
                    "token_type": "bearer",
                    "scope": "read",
                    "workspace_id": "ws_9"
                }"#,
            )
            .create_async()
            .await;

        let manager = make_manager(&server.url(), false);
        let before = chrono::Utc::now();
        let tokens = manager
            .exchange_code("auth_code_123", "http://localhost/cb", Some("verifier_1"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(tokens.access_token, "at_1");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt_1"));
        assert_eq!(tokens.token_type, "Bearer");
        assert_eq!(tokens.scope.as_deref(), Some("read"));
        assert_eq!(tokens.raw_field("workspace_id").unwrap(), "ws_9");

        let expires_at = tokens.expires_at.unwrap();
        assert!(expires_at >= before + chrono::Duration::seconds(3600));
        assert!(expires_at <= chrono::Utc::now() + chrono::Duration::seconds(3600));
    }

    #[tokio::test]
    async fn test_exchange_code_provider_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth/token")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"invalid_grant","error_description":"Code expired"}"#)
            .create_async()
            .await;

        let manager = make_manager(&server.url(), false);
        let err = manager
            .exchange_code("stale", "http://localhost/cb", None)
            .await
            .unwrap_err();

        match err {
            IntegrationError::OAuth { error, description } => {
                assert_eq!(error, "invalid_grant");
                assert_eq!(description.as_deref(), Some("Code expired"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_exchange_code_error_with_200() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"bad_verification_code","error_description":"The code passed is incorrect or expired."}"#)
            .create_async()
            .await;

        let manager = make_manager(&server.url(), false);
        let err = manager
            .exchange_code("bad", "http://localhost/cb", None)
            .await
            .unwrap_err();
        assert!(matches!(err, IntegrationError::OAuth { ref error, .. } if error == "bad_verification_code"));
    }

    #[tokio::test]
    async fn test_refresh_keeps_refresh_token_when_not_rotated() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "rt_original".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "at_new", "expires_in": 1800}"#)
            .create_async()
            .await;

        let manager = make_manager(&server.url(), false);
        let tokens = manager.refresh_access_token("rt_original").await.unwrap();

        mock.assert_async().await;
        assert_eq!(tokens.access_token, "at_new");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt_original"));
        assert!(tokens.expires_at.is_some());
    }

    #[tokio::test]
    async fn test_refresh_uses_rotated_refresh_token() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "at_new", "refresh_token": "rt_rotated"}"#)
            .create_async()
            .await;

        let manager = make_manager(&server.url(), false);
        let tokens = manager.refresh_access_token("rt_original").await.unwrap();
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt_rotated"));
        assert!(tokens.expires_at.is_none());
    }

    #[tokio::test]
    async fn test_revoke_without_endpoint_makes_no_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let manager = make_manager(&server.url(), false);
        manager.revoke_token("at_1").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_revoke_treats_400_as_already_revoked() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/revoke")
            .match_body(Matcher::UrlEncoded("token".into(), "at_1".into()))
            .with_status(400)
            .with_body(r#"{"error":"invalid_token"}"#)
            .create_async()
            .await;

        let manager = make_manager(&server.url(), true);
        manager.revoke_token("at_1").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_revoke_other_failure_is_oauth_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth/revoke")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let manager = make_manager(&server.url(), true);
        let err = manager.revoke_token("at_1").await.unwrap_err();
        assert!(matches!(err, IntegrationError::OAuth { .. }));
    }

    #[tokio::test]
    async fn test_transport_failure_is_typed() {
        // Nothing listens on port 9 (discard) on test hosts.
        let manager = make_manager("http://127.0.0.1:9", false);
        let err = manager.refresh_access_token("rt").await.unwrap_err();
        assert!(matches!(err, IntegrationError::Transport { .. }));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let manager = make_manager("https://example.com", false);
        let debug = format!("{:?}", manager.config());
        assert!(debug.contains("client_abc"));
        assert!(!debug.contains("secret_xyz"));
    }

    #[test]
    fn test_scope_delimiter_join() {
        let scopes = vec!["a".to_string(), "b".to_string()];
        assert_eq!(ScopeDelimiter::Space.join(&scopes), "a b");
        assert_eq!(ScopeDelimiter::Comma.join(&scopes), "a,b");
    }
}
