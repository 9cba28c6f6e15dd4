//! Shared connector runtime for the integration hub.
//!
//! Every provider connector builds on the pieces here:
//!
//! - [`oauth`] - authorization URLs, code exchange, refresh, revocation
//! - [`fetch`] - authenticated provider calls with timeout, retry and
//!   rate-limit handling
//! - [`error`] - the closed error taxonomy both of them produce
//! - [`credentials`] - the [`OAuthTokens`] snapshot passed into every call
//! - [`config`] - hub configuration (TOML + environment)

pub mod config;
pub mod credentials;
pub mod error;
pub mod fetch;
pub mod oauth;

pub use credentials::OAuthTokens;
pub use error::{IntegrationError, Result};
pub use fetch::{FetchOptions, FetchPipeline, FetchResult};
pub use oauth::{OAuthConfig, TokenManager};

/// URL type returned by [`TokenManager::build_authorization_url`].
pub use reqwest::Url;
