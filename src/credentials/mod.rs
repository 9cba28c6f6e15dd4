//! OAuth credential bundle for one connected account.
//!
//! [`OAuthTokens`] values are created by a code exchange or a refresh and
//! replaced wholesale afterwards; nothing in the runtime mutates them. They
//! are owned by the caller's token store and passed into every call.
//!
//! # Usage
//!
//! ```
//! use integration_hub::credentials::OAuthTokens;
//! use chrono::{Duration, Utc};
//!
//! let mut tokens = OAuthTokens::bearer("access_token_123");
//! tokens.refresh_token = Some("refresh_token_456".to_string());
//! tokens.expires_at = Some(Utc::now() + Duration::hours(1));
//!
//! assert_eq!(tokens.authorization_value(), "Bearer access_token_123");
//! assert!(!tokens.is_expired());
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Live OAuth credentials for one account.
///
/// # Security
/// - Never log the token fields
/// - Persisting these is the caller's job; the runtime holds them only for
///   the duration of a call
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OAuthTokens {
    /// OAuth access token (used for API requests)
    pub access_token: String,

    /// OAuth refresh token (used to obtain new access tokens)
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// When the access token expires (UTC)
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,

    /// Authorization scheme, `Bearer` unless the provider says otherwise
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Scope string granted by the provider
    #[serde(default)]
    pub scope: Option<String>,

    /// Full token endpoint response, for provider-specific fields
    #[serde(default)]
    pub raw: Value,
}

impl OAuthTokens {
    /// Bearer tokens without refresh token or expiry (personal access tokens).
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
            token_type: default_token_type(),
            scope: None,
            raw: Value::Null,
        }
    }

    /// Value for the `Authorization` header: `<token_type> <access_token>`.
    ///
    /// `bearer` in any casing, or an empty type, is sent as `Bearer`.
    pub fn authorization_value(&self) -> String {
        let scheme = if self.token_type.is_empty() || self.token_type.eq_ignore_ascii_case("bearer")
        {
            "Bearer"
        } else {
            self.token_type.as_str()
        };
        format!("{} {}", scheme, self.access_token)
    }

    /// True once `expires_at` has passed. Tokens without expiry never expire.
    pub fn is_expired(&self) -> bool {
        self.expires_within(Duration::zero())
    }

    /// True if the token expires within `window` (or already has).
    ///
    /// Callers use this to refresh ahead of expiry; the runtime never
    /// refreshes on its own.
    pub fn expires_within(&self, window: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= Utc::now() + window,
            None => false,
        }
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Looks up a provider-specific field from the raw token response
    /// (e.g. a workspace id).
    pub fn raw_field(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }
}
