//! Connector registry - maps provider ids to connector instances.

use integration_hub::config::HubConfig;
use integration_hub::IntegrationError;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::providers::calendar::{self, config::CalendarConfig, CalendarConnector};
use crate::providers::github::{self, config::GitHubConfig, GitHubConnector};
use crate::runtime::ConnectorRuntime;
use crate::Connector;

/// Closed set of supported providers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Provider {
    Github,
    GoogleCalendar,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Github, Provider::GoogleCalendar];

    /// Registry key, also used in API paths.
    pub fn id(&self) -> &'static str {
        match self {
            Provider::Github => github::ID,
            Provider::GoogleCalendar => calendar::ID,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Provider {
    type Err = IntegrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|p| p.id() == s)
            .ok_or_else(|| IntegrationError::UnknownConnector {
                connector: s.to_string(),
            })
    }
}

/// OAuth callback URL the hub registers with a provider.
pub fn callback_url(base_url: &str, provider: Provider) -> String {
    format!(
        "{}/api/connectors/{}/oauth/callback",
        base_url.trim_end_matches('/'),
        provider.id()
    )
}

/// Registered connectors, keyed by provider.
#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    connectors: HashMap<Provider, Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every provider whose client credentials are present in the
    /// environment. Missing credentials skip the provider with a warning.
    pub fn from_env(config: &HubConfig) -> Self {
        let mut registry = Self::new();

        for provider in Provider::ALL {
            let redirect_uri = callback_url(&config.server.callback_base_url, provider);
            let connector: anyhow::Result<Arc<dyn Connector>> = match provider {
                Provider::Github => GitHubConfig::from_env().map(|c| {
                    let c = c.with_redirect_uri(redirect_uri);
                    let runtime = ConnectorRuntime::new(c.oauth_config(), github::config::BASE_URL)
                        .with_fetch_defaults(config.fetch.clone());
                    Arc::new(GitHubConnector::with_runtime(runtime)) as Arc<dyn Connector>
                }),
                Provider::GoogleCalendar => CalendarConfig::from_env().map(|c| {
                    let c = c.with_redirect_uri(redirect_uri);
                    let runtime =
                        ConnectorRuntime::new(c.oauth_config(), calendar::config::BASE_URL)
                            .with_fetch_defaults(config.fetch.clone());
                    Arc::new(CalendarConnector::with_runtime(runtime)) as Arc<dyn Connector>
                }),
            };

            match connector {
                Ok(connector) => {
                    tracing::info!(connector = %provider, "Registered connector");
                    registry.register(provider, connector);
                }
                Err(e) => {
                    tracing::warn!(connector = %provider, error = %e, "Connector not configured, skipping");
                }
            }
        }

        registry
    }

    pub fn register(&mut self, provider: Provider, connector: Arc<dyn Connector>) {
        self.connectors.insert(provider, connector);
    }

    /// Look up a connector by id. Unknown and unconfigured ids both fail with
    /// [`IntegrationError::UnknownConnector`].
    pub fn get(&self, id: &str) -> Result<Arc<dyn Connector>, IntegrationError> {
        let provider = Provider::from_str(id)?;
        self.connectors
            .get(&provider)
            .cloned()
            .ok_or_else(|| IntegrationError::UnknownConnector {
                connector: id.to_string(),
            })
    }

    /// Registered connectors in provider order.
    pub fn list(&self) -> Vec<Arc<dyn Connector>> {
        Provider::ALL
            .iter()
            .filter_map(|p| self.connectors.get(p).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}
