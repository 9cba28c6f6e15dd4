//! Error taxonomy shared by the token lifecycle manager, the fetch pipeline
//! and every connector built on them.
//!
//! The set is closed: callers match on variants instead of inspecting
//! messages. Two of them are structural signals for the retry loop
//! ([`IntegrationError::TokenExpired`], [`IntegrationError::RateLimited`]);
//! the rest are terminal for the attempt that produced them.

use std::time::Duration;

use serde_json::Value;

/// Result alias used across the runtime.
pub type Result<T, E = IntegrationError> = std::result::Result<T, E>;

/// Error surfaced by the connector runtime.
#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
    /// Authorization, token exchange, refresh or revoke call failed.
    #[error("OAuth error: {error}{}", description_suffix(.description))]
    OAuth {
        /// Provider error code (`error` field), or a local label.
        error: String,
        /// Provider `error_description`, or the raw body when unparsable.
        description: Option<String>,
    },

    /// Provider answered 401 and a refresh token is available. The caller
    /// refreshes and re-issues the call.
    #[error("access token expired or invalid")]
    TokenExpired,

    /// Provider answered 429.
    #[error("rate limited by provider, retry after {retry_after}s")]
    RateLimited {
        /// Seconds to wait before the next attempt.
        retry_after: u64,
    },

    /// Any other non-2xx provider response.
    #[error("provider returned HTTP {status}")]
    Provider {
        /// HTTP status observed from the provider.
        status: u16,
        /// 502 for upstream 5xx, 400 otherwise.
        normalized_status: u16,
        /// Response body (JSON when parseable, otherwise a JSON string).
        body: Value,
    },

    /// Generic failure, including retry budget exhaustion.
    #[error("{message}")]
    Integration { message: String },

    #[error("request timed out after {}s", .after.as_secs())]
    Timeout { after: Duration },

    #[error("request cancelled")]
    Cancelled,

    /// Network-level failure (DNS, connect, TLS, body read).
    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("failed to decode provider response: {message}")]
    Decode { message: String },

    #[error("invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Caller-supplied widget parameter rejected before any request.
    #[error("invalid parameter `{param}`: {reason}")]
    InvalidParam { param: String, reason: String },

    #[error("unknown widget `{widget_id}`")]
    UnknownWidget { widget_id: String },

    #[error("unknown connector `{connector}`")]
    UnknownConnector { connector: String },
}

fn description_suffix(description: &Option<String>) -> String {
    match description {
        Some(d) => format!(" - {d}"),
        None => String::new(),
    }
}

impl IntegrationError {
    pub fn integration(message: impl Into<String>) -> Self {
        Self::Integration {
            message: message.into(),
        }
    }

    pub fn oauth(error: impl Into<String>, description: Option<String>) -> Self {
        Self::OAuth {
            error: error.into(),
            description,
        }
    }

    /// Builds a provider error from an upstream status and body.
    ///
    /// Upstream 5xx normalize to 502, everything else to 400.
    pub fn provider(status: u16, body: Value) -> Self {
        let normalized_status = if (500..600).contains(&status) { 502 } else { 400 };
        Self::Provider {
            status,
            normalized_status,
            body,
        }
    }

    pub fn invalid_param(param: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParam {
            param: param.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn transport(err: reqwest::Error) -> Self {
        Self::Transport {
            message: err.to_string(),
        }
    }

    /// True when the fetch pipeline may retry after exponential backoff.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } => true,
            Self::Provider {
                normalized_status, ..
            } => *normalized_status == 502,
            _ => false,
        }
    }

    /// Seconds the caller should wait, for rate-limit errors.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    /// Stable machine-readable label, used in API error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OAuth { .. } => "oauth",
            Self::TokenExpired => "token_expired",
            Self::RateLimited { .. } => "rate_limited",
            Self::Provider { .. } => "provider",
            Self::Integration { .. } => "integration",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled => "cancelled",
            Self::Transport { .. } => "transport",
            Self::Decode { .. } => "decode",
            Self::InvalidUrl { .. } => "invalid_url",
            Self::InvalidParam { .. } => "invalid_param",
            Self::UnknownWidget { .. } => "unknown_widget",
            Self::UnknownConnector { .. } => "unknown_connector",
        }
    }

    /// HTTP status a caller-facing API should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::TokenExpired => 401,
            Self::RateLimited { .. } => 429,
            Self::Provider {
                normalized_status, ..
            } => *normalized_status,
            Self::OAuth { .. } | Self::Transport { .. } | Self::Decode { .. } => 502,
            Self::Timeout { .. } => 504,
            Self::InvalidParam { .. } => 400,
            Self::UnknownWidget { .. } | Self::UnknownConnector { .. } => 404,
            Self::InvalidUrl { .. } | Self::Integration { .. } | Self::Cancelled => 500,
        }
    }
}
