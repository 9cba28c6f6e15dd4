//! Shared OAuth + fetch machinery behind every [`Connector`](crate::Connector).

use integration_hub::config::FetchConfig;
use integration_hub::fetch::{CancellationToken, Sleeper};
use integration_hub::oauth::PkceChallenge;
use integration_hub::{
    FetchOptions, FetchPipeline, FetchResult, OAuthConfig, OAuthTokens, Result, TokenManager,
    Url,
};
use serde_json::Value;
use std::sync::Arc;

/// Token manager and fetch pipeline over one provider configuration.
///
/// Connectors own a runtime and delegate to it for everything that is not
/// provider-specific. Holds no tokens, so it is shared freely across
/// concurrent calls for different accounts.
#[derive(Clone)]
pub struct ConnectorRuntime {
    tokens: TokenManager,
    pipeline: FetchPipeline,
    fetch_defaults: FetchConfig,
}

impl ConnectorRuntime {
    /// Runtime calling `api_base_url` with the default fetch settings.
    pub fn new(oauth: OAuthConfig, api_base_url: impl Into<String>) -> Self {
        let config = Arc::new(oauth);
        Self {
            tokens: TokenManager::new(config),
            pipeline: FetchPipeline::new(api_base_url),
            fetch_defaults: FetchConfig::default(),
        }
    }

    /// Timeout and retry budget applied by [`fetch_options`](Self::fetch_options).
    pub fn with_fetch_defaults(mut self, fetch_defaults: FetchConfig) -> Self {
        self.fetch_defaults = fetch_defaults;
        self
    }

    /// Replace the sleeper used between fetch attempts.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.pipeline = self.pipeline.with_sleeper(sleeper);
        self
    }

    pub fn oauth_config(&self) -> &OAuthConfig {
        self.tokens.config()
    }

    pub fn token_manager(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn pipeline(&self) -> &FetchPipeline {
        &self.pipeline
    }

    /// Fresh options carrying the configured timeout and retry budget.
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions::from_config(&self.fetch_defaults)
    }

    /// [`fetch_options`](Self::fetch_options) bound to a caller cancellation token.
    pub fn fetch_options_with_cancel(&self, cancel: CancellationToken) -> FetchOptions {
        self.fetch_options().cancel_token(cancel)
    }

    pub fn authorization_url(
        &self,
        state: &str,
        scopes: Option<&[String]>,
        redirect_uri: Option<&str>,
    ) -> Result<Url> {
        self.tokens.build_authorization_url(state, scopes, redirect_uri)
    }

    pub fn authorization_url_with_pkce(
        &self,
        state: &str,
        scopes: Option<&[String]>,
        redirect_uri: Option<&str>,
        pkce: &PkceChallenge,
    ) -> Result<Url> {
        self.tokens
            .build_authorization_url_with_pkce(state, scopes, redirect_uri, pkce)
    }

    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: Option<&str>,
    ) -> Result<OAuthTokens> {
        self.tokens.exchange_code(code, redirect_uri, code_verifier).await
    }

    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<OAuthTokens> {
        self.tokens.refresh_access_token(refresh_token).await
    }

    pub async fn revoke_token(&self, access_token: &str) -> Result<()> {
        self.tokens.revoke_token(access_token).await
    }

    pub async fn fetch_data(
        &self,
        tokens: &OAuthTokens,
        endpoint: &str,
        options: &FetchOptions,
    ) -> Result<FetchResult<Value>> {
        self.pipeline.fetch_json(tokens, endpoint, options).await
    }
}
