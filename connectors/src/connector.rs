use async_trait::async_trait;
use integration_hub::oauth::PkceChallenge;
use integration_hub::{
    FetchOptions, FetchResult, IntegrationError, OAuthConfig, OAuthTokens, Result, Url,
};
use serde_json::Value;

use crate::runtime::ConnectorRuntime;
use crate::types::{ConnectorMetadata, WidgetData, WidgetDefinition};

/// Connector interface for external SaaS providers.
///
/// Connectors are stateless with respect to accounts: tokens are passed into
/// every call and fresh tokens are returned to the caller, who persists them.
/// One instance serves all accounts concurrently.
///
/// Only the provider-specific parts need implementing; the OAuth lifecycle
/// and raw data fetch default to the connector's [`ConnectorRuntime`].
///
/// # Lifecycle
/// 1. Caller redirects the user to `authorization_url(state, ..)`
/// 2. Provider redirects back; caller calls `exchange_code(code, ..)`
/// 3. Scheduler calls `get_widget_data(tokens, widget_id, params)`
/// 4. On `TokenExpired` the caller runs `refresh_access_token` and retries
/// 5. `revoke_token` on disconnect
///
/// # Example
/// ```no_run
/// use async_trait::async_trait;
/// use hub_connectors::{
///     Connector, ConnectorMetadata, ConnectorRuntime, WidgetData, WidgetDefinition,
/// };
/// use integration_hub::{IntegrationError, OAuthTokens, Result};
/// use serde_json::Value;
///
/// struct Example {
///     metadata: ConnectorMetadata,
///     runtime: ConnectorRuntime,
///     widgets: Vec<WidgetDefinition>,
/// }
///
/// #[async_trait]
/// impl Connector for Example {
///     fn metadata(&self) -> &ConnectorMetadata {
///         &self.metadata
///     }
///
///     fn runtime(&self) -> &ConnectorRuntime {
///         &self.runtime
///     }
///
///     fn widgets(&self) -> &[WidgetDefinition] {
///         &self.widgets
///     }
///
///     async fn test_connection(&self, tokens: &OAuthTokens) -> bool {
///         let options = self.runtime.fetch_options();
///         self.fetch_data(tokens, "/me", &options).await.is_ok()
///     }
///
///     async fn get_widget_data(
///         &self,
///         tokens: &OAuthTokens,
///         widget_id: &str,
///         _params: &Value,
///     ) -> Result<WidgetData> {
///         let widget = self.widget(widget_id).ok_or_else(|| IntegrationError::UnknownWidget {
///             widget_id: widget_id.to_string(),
///         })?;
///         let options = self.runtime.fetch_options();
///         let result = self.fetch_data(tokens, "/items", &options).await?;
///         Ok(WidgetData::for_widget(widget, result.data))
///     }
/// }
/// ```
#[async_trait]
pub trait Connector: Send + Sync {
    /// Identity shown in the catalog. `metadata().id` is the registry key.
    fn metadata(&self) -> &ConnectorMetadata;

    /// Shared OAuth + fetch machinery for this provider.
    fn runtime(&self) -> &ConnectorRuntime;

    fn oauth_config(&self) -> &OAuthConfig {
        self.runtime().oauth_config()
    }

    /// Build the consent URL. `scopes` defaults to the configured set.
    fn authorization_url(
        &self,
        state: &str,
        scopes: Option<&[String]>,
        redirect_uri: Option<&str>,
    ) -> Result<Url> {
        self.runtime().authorization_url(state, scopes, redirect_uri)
    }

    /// Whether the provider accepts a PKCE `code_challenge`.
    fn supports_pkce(&self) -> bool {
        false
    }

    fn authorization_url_with_pkce(
        &self,
        state: &str,
        scopes: Option<&[String]>,
        redirect_uri: Option<&str>,
        pkce: &PkceChallenge,
    ) -> Result<Url> {
        self.runtime()
            .authorization_url_with_pkce(state, scopes, redirect_uri, pkce)
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: Option<&str>,
    ) -> Result<OAuthTokens> {
        self.runtime()
            .exchange_code(code, redirect_uri, code_verifier)
            .await
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<OAuthTokens> {
        self.runtime().refresh_access_token(refresh_token).await
    }

    async fn revoke_token(&self, access_token: &str) -> Result<()> {
        self.runtime().revoke_token(access_token).await
    }

    /// Cheap authenticated call proving the tokens work. Never errors.
    async fn test_connection(&self, tokens: &OAuthTokens) -> bool;

    /// Raw authenticated call through the fetch pipeline.
    async fn fetch_data(
        &self,
        tokens: &OAuthTokens,
        endpoint: &str,
        options: &FetchOptions,
    ) -> Result<FetchResult<Value>> {
        self.runtime().fetch_data(tokens, endpoint, options).await
    }

    /// Static widget catalog.
    fn widgets(&self) -> &[WidgetDefinition];

    fn widget(&self, widget_id: &str) -> Option<&WidgetDefinition> {
        self.widgets().iter().find(|w| w.id == widget_id)
    }

    /// Fetch and normalize one widget's payload.
    ///
    /// Unknown widget ids fail with [`IntegrationError::UnknownWidget`]
    /// before any network call.
    async fn get_widget_data(
        &self,
        tokens: &OAuthTokens,
        widget_id: &str,
        params: &Value,
    ) -> Result<WidgetData>;

    /// Process an inbound provider webhook. Signature verification is the
    /// caller's concern.
    async fn handle_webhook(&self, event: &str, _payload: &Value) -> Result<()> {
        tracing::debug!(
            connector = %self.metadata().id,
            event = event,
            "Webhook received by connector without webhook support"
        );
        Err(IntegrationError::integration("webhooks not supported"))
    }
}
