//! Authenticated fetch: one logical provider call with bounded retries.
//!
//! See [`FetchPipeline`] for the attempt loop. [`FetchOptions`] is built per
//! call; [`FetchResult`] carries the decoded payload plus status and headers.

mod pipeline;
pub mod retry;

pub use pipeline::FetchPipeline;
pub use reqwest::header::HeaderMap;
pub use reqwest::Method;
pub use retry::{RecordingSleeper, Sleeper, TokioSleeper};
pub use tokio_util::sync::CancellationToken;

use serde_json::Value;
use std::time::Duration;

use crate::config::FetchConfig;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RETRIES: u32 = 3;

/// Per-call request parameters.
///
/// # Example
/// ```
/// use integration_hub::fetch::{FetchOptions, Method};
/// use std::time::Duration;
///
/// let options = FetchOptions::new()
///     .method(Method::POST)
///     .query("per_page", "30")
///     .header("X-GitHub-Api-Version", "2022-11-28")
///     .json(serde_json::json!({"name": "hub"}))
///     .timeout(Duration::from_secs(10))
///     .retries(2);
/// assert_eq!(options.retries, 2);
/// ```
#[derive(Clone, Debug)]
pub struct FetchOptions {
    pub method: Method,
    /// Appended to the endpoint URL in order
    pub query: Vec<(String, String)>,
    /// Applied after the defaults; caller headers win on conflict
    pub headers: Vec<(String, String)>,
    /// JSON request body; sets `Content-Type: application/json` when present
    pub body: Option<Value>,
    /// Per-attempt timeout
    pub timeout: Duration,
    /// Additional attempts after the first
    pub retries: u32,
    /// Caller-driven cancellation, composed with the timeout
    pub cancel: Option<CancellationToken>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            cancel: None,
        }
    }
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults taken from the hub configuration instead of the constants.
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            retries: config.retries,
            ..Self::default()
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Successful outcome of a fetch.
#[derive(Clone, Debug)]
pub struct FetchResult<T> {
    pub data: T,
    pub status: u16,
    pub headers: HeaderMap,
}

impl<T> FetchResult<T> {
    /// Maps the payload, keeping status and headers.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FetchResult<U> {
        FetchResult {
            data: f(self.data),
            status: self.status,
            headers: self.headers,
        }
    }
}
