//! OAuth state management for CSRF protection.
//!
//! Tracks the temporary `state` tokens handed out with authorization URLs,
//! together with whatever the callback needs to finish the flow (which
//! connector, which account, the PKCE verifier).

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// What the callback needs to finish a flow started with a given `state`.
#[derive(Clone, Debug)]
pub struct StateEntry {
    pub connector: String,
    pub account: String,
    /// PKCE verifier, for connectors that sent a `code_challenge`.
    pub code_verifier: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Pending authorization flows keyed by their `state` parameter.
///
/// Cloning shares the underlying map, so the API handlers and the cleanup
/// loop see the same entries.
#[derive(Clone)]
pub struct StateManager {
    states: Arc<Mutex<HashMap<String, StateEntry>>>,
    ttl: Duration,
}

impl StateManager {
    /// Entries older than `ttl_secs` are refused by the callback.
    pub fn new(ttl_secs: u64) -> Self {
        let ttl = i64::try_from(ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        Self {
            states: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StateEntry>> {
        // Entries stay consistent even if a holder panicked mid-insert.
        self.states.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a flow for `(connector, account)` and returns its UUIDv4
    /// `state` value.
    pub fn create_state(
        &self,
        connector: &str,
        account: &str,
        code_verifier: Option<String>,
    ) -> String {
        let state = Uuid::new_v4().to_string();
        self.lock().insert(
            state.clone(),
            StateEntry {
                connector: connector.to_string(),
                account: account.to_string(),
                code_verifier,
                created_at: Utc::now(),
            },
        );
        state
    }

    /// Removes the entry for `state`. Unknown and stale states yield `None`;
    /// either way a second call with the same value yields `None`.
    pub fn validate_and_consume(&self, state: &str) -> Option<StateEntry> {
        let entry = self.lock().remove(state)?;
        (Utc::now() - entry.created_at <= self.ttl).then_some(entry)
    }

    /// Drops every entry past its TTL.
    pub fn cleanup_expired(&self) {
        let now = Utc::now();
        let ttl = self.ttl;
        self.lock().retain(|_, entry| now - entry.created_at <= ttl);
    }

    /// Number of flows awaiting a callback.
    pub fn count(&self) -> usize {
        self.lock().len()
    }
}

/// Purges stale flows every `interval_secs` (at least one second).
pub async fn run_state_cleanup(manager: StateManager, interval_secs: u64) {
    let period = std::time::Duration::from_secs(interval_secs.max(1));
    let mut interval = tokio::time::interval(period);

    loop {
        interval.tick().await;
        manager.cleanup_expired();
        tracing::debug!(pending = manager.count(), "Expired OAuth states purged");
    }
}
