//! The attempt loop.
//!
//! Structural signals drive the loop: a 401 with a refresh token available
//! stops it and hands control back to the caller ([`IntegrationError::TokenExpired`]),
//! a 429 sleeps `Retry-After` and consumes one unit of the retry budget.
//! Transient failures (network, timeout, upstream 5xx) back off `2^attempt`
//! seconds. Anything else is terminal.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::retry::{backoff_delay, parse_retry_after, Sleeper, TokioSleeper};
use super::{FetchOptions, FetchResult};
use crate::credentials::OAuthTokens;
use crate::error::{IntegrationError, Result};

/// Response captured from one attempt, body fully read.
struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

/// Executes authenticated provider calls against one API base URL.
///
/// Holds no credentials: the token snapshot is an argument of every call, so
/// one pipeline serves any number of accounts concurrently.
#[derive(Clone)]
pub struct FetchPipeline {
    http_client: Client,
    base_url: String,
    sleeper: Arc<dyn Sleeper>,
}

impl FetchPipeline {
    /// Create a pipeline for `base_url` (e.g. `https://api.github.com`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http_client: Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the sleeper used between attempts.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve `endpoint` against the base URL and append the query.
    ///
    /// Absolute `http(s)://` endpoints are used as-is.
    pub fn resolve_url(&self, endpoint: &str, query: &[(String, String)]) -> Result<Url> {
        let raw = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                endpoint.trim_start_matches('/')
            )
        };

        let mut url = Url::parse(&raw).map_err(|e| IntegrationError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    /// [`fetch`](Self::fetch) with an untyped JSON payload.
    pub async fn fetch_json(
        &self,
        tokens: &OAuthTokens,
        endpoint: &str,
        options: &FetchOptions,
    ) -> Result<FetchResult<Value>> {
        self.fetch(tokens, endpoint, options).await
    }

    /// Execute one logical request with `tokens`.
    ///
    /// Attempts run `0..=options.retries`, strictly one after another.
    /// Returns the decoded 2xx payload or the error that ended the loop.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        tokens: &OAuthTokens,
        endpoint: &str,
        options: &FetchOptions,
    ) -> Result<FetchResult<T>> {
        let url = self.resolve_url(endpoint, &options.query)?;
        let headers = build_headers(tokens, options)?;
        let cancel = options.cancel.as_ref();

        let mut last_error = None;

        for attempt in 0..=options.retries {
            let attempts_remain = attempt < options.retries;

            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(IntegrationError::Cancelled);
            }

            debug!(
                method = %options.method,
                path = url.path(),
                attempt = attempt,
                "Sending provider request"
            );

            let outcome = match self.send(&url, &headers, options).await {
                Ok(response) => classify(response, tokens, attempts_remain),
                Err(e) => Err(e),
            };

            let err = match outcome {
                Ok(response) => return decode(response),
                Err(e) => e,
            };

            let delay = match &err {
                IntegrationError::RateLimited { retry_after } => {
                    Some(Duration::from_secs(*retry_after))
                }
                e if e.is_transient() => Some(backoff_delay(attempt)),
                _ => None,
            };

            let delay = match delay {
                Some(delay) if attempts_remain => delay,
                _ => {
                    debug!(attempt = attempt, error = %err, kind = err.kind(), "Provider request failed");
                    return Err(err);
                }
            };

            warn!(
                path = url.path(),
                attempt = attempt + 1,
                max_attempts = options.retries + 1,
                delay_secs = delay.as_secs(),
                error = %err,
                "Provider request failed, will retry"
            );

            self.pause(delay, cancel).await?;
            last_error = Some(err);
        }

        Err(last_error.unwrap_or_else(|| IntegrationError::integration("max retries exceeded")))
    }

    /// One HTTP round trip under the per-attempt timeout.
    ///
    /// Dropping the request future on timeout or cancellation aborts the
    /// underlying connection.
    async fn send(
        &self,
        url: &Url,
        headers: &HeaderMap,
        options: &FetchOptions,
    ) -> Result<RawResponse> {
        let mut request = self
            .http_client
            .request(options.method.clone(), url.clone())
            .headers(headers.clone());
        if let Some(body) = &options.body {
            let bytes = serde_json::to_vec(body).map_err(|e| {
                IntegrationError::integration(format!("failed to encode request body: {}", e))
            })?;
            request = request.body(bytes);
        }

        let round_trip = async {
            let response = request.send().await.map_err(IntegrationError::transport)?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response
                .bytes()
                .await
                .map_err(IntegrationError::transport)?
                .to_vec();
            Ok(RawResponse {
                status,
                headers,
                body,
            })
        };

        let timed = async {
            match tokio::time::timeout(options.timeout, round_trip).await {
                Ok(result) => result,
                Err(_) => Err(IntegrationError::Timeout {
                    after: options.timeout,
                }),
            }
        };

        match &options.cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => Err(IntegrationError::Cancelled),
                result = timed => result,
            },
            None => timed.await,
        }
    }

    async fn pause(&self, delay: Duration, cancel: Option<&CancellationToken>) -> Result<()> {
        match cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => Err(IntegrationError::Cancelled),
                _ = self.sleeper.sleep(delay) => Ok(()),
            },
            None => {
                self.sleeper.sleep(delay).await;
                Ok(())
            }
        }
    }
}

/// Default headers, then caller headers overwriting on conflict.
fn build_headers(tokens: &OAuthTokens, options: &FetchOptions) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    let mut authorization = HeaderValue::from_str(&tokens.authorization_value())
        .map_err(|_| IntegrationError::integration("access token is not a valid header value"))?;
    authorization.set_sensitive(true);
    headers.insert(AUTHORIZATION, authorization);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if options.body.is_some() {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    for (name, value) in &options.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| IntegrationError::integration(format!("invalid header name `{}`", name)))?;
        let value = HeaderValue::from_str(value).map_err(|_| {
            IntegrationError::integration(format!("invalid value for header `{}`", name))
        })?;
        headers.insert(name, value);
    }

    Ok(headers)
}

/// Map an HTTP outcome onto the retry signals and the error taxonomy.
fn classify(
    response: RawResponse,
    tokens: &OAuthTokens,
    attempts_remain: bool,
) -> Result<RawResponse> {
    let status = response.status;

    if status == StatusCode::UNAUTHORIZED && tokens.can_refresh() && attempts_remain {
        return Err(IntegrationError::TokenExpired);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(IntegrationError::RateLimited {
            retry_after: parse_retry_after(&response.headers),
        });
    }
    if !status.is_success() {
        return Err(IntegrationError::provider(
            status.as_u16(),
            error_body(&response.body),
        ));
    }

    Ok(response)
}

/// JSON if parseable, otherwise the raw text.
fn error_body(body: &[u8]) -> Value {
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

fn decode<T: DeserializeOwned>(response: RawResponse) -> Result<FetchResult<T>> {
    let body: &[u8] = if response.body.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        &response.body
    };

    let data = serde_json::from_slice(body).map_err(|e| IntegrationError::Decode {
        message: e.to_string(),
    })?;

    Ok(FetchResult {
        data,
        status: response.status.as_u16(),
        headers: response.headers,
    })
}
