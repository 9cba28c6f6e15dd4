//! Delay policy for the fetch pipeline.
//!
//! Two kinds of waits exist between attempts: the provider-requested
//! `Retry-After` for 429s, and `2^attempt` seconds of exponential backoff
//! for transient failures. Both go through a [`Sleeper`] so tests can
//! observe them without waiting.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::sync::Mutex;
use std::time::Duration;

/// Used when a 429 carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Cap on the backoff exponent; keeps the shift from overflowing.
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Seconds from a `Retry-After` header, defaulting to 60.
///
/// Only the delta-seconds form is understood; HTTP dates fall back to the
/// default.
pub fn parse_retry_after(headers: &HeaderMap) -> u64 {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

/// Exponential backoff before the attempt after `attempt`: 1s, 2s, 4s, ...
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(MAX_BACKOFF_EXPONENT))
}

/// Suspends the current call between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by `tokio::time::sleep`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested delays and returns immediately.
///
/// Lets connector tests assert the retry schedule without wall-clock waits.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, in order.
    pub fn delays(&self) -> Vec<Duration> {
        self.delays
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(duration);
    }
}
