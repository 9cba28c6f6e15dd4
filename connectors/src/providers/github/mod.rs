pub mod api;
pub mod config;
pub mod transformer;

use async_trait::async_trait;
use integration_hub::{IntegrationError, OAuthTokens, Result};
use serde_json::{json, Value};

use crate::runtime::ConnectorRuntime;
use crate::types::{
    Category, ConnectorMetadata, PricingTier, UserRole, WidgetData, WidgetDefinition,
};
use crate::Connector;

use self::api::GitHubClient;
use self::config::{GitHubConfig, BASE_URL};
use self::transformer::{
    issue_to_item, notifications_payload, open_issues_payload, repositories_payload,
};

pub const ID: &str = "github";

const WIDGET_REPOSITORIES: &str = "repositories";
const WIDGET_NOTIFICATIONS: &str = "notifications";
const WIDGET_OPEN_ISSUES: &str = "open-issues";

const DEFAULT_PER_PAGE: u64 = 30;
const MAX_PER_PAGE: u64 = 100;
const DEFAULT_ISSUE_REPOS: u64 = 10;

/// GitHub connector: repositories, notifications and open issues for the
/// authorized user.
pub struct GitHubConnector {
    metadata: ConnectorMetadata,
    runtime: ConnectorRuntime,
    widgets: Vec<WidgetDefinition>,
}

impl GitHubConnector {
    /// Connector against the real GitHub API.
    pub fn new(config: &GitHubConfig) -> Self {
        Self::with_runtime(ConnectorRuntime::new(config.oauth_config(), BASE_URL))
    }

    /// Connector over a prepared runtime (custom API base URL, fetch
    /// defaults, sleeper).
    pub fn with_runtime(runtime: ConnectorRuntime) -> Self {
        Self {
            metadata: metadata(),
            runtime,
            widgets: widgets(),
        }
    }

    fn client<'a>(&'a self, tokens: &'a OAuthTokens) -> GitHubClient<'a> {
        GitHubClient::new(self.runtime.pipeline(), tokens, self.runtime.fetch_options())
    }

    async fn open_issues(&self, tokens: &OAuthTokens, repo_limit: usize) -> Result<Value> {
        let client = self.client(tokens);
        let repos = client.fetch_repos(DEFAULT_PER_PAGE as u32).await?;

        let mut items = Vec::new();
        for repo in repos.iter().filter(|r| r.open_issues_count > 0).take(repo_limit) {
            let Some((owner, name)) = repo.full_name.split_once('/') else {
                continue;
            };
            match client.fetch_issues(owner, name).await {
                Ok(issues) => {
                    items.extend(issues.iter().map(|issue| issue_to_item(owner, name, issue)));
                }
                // A single inaccessible repo does not fail the widget.
                Err(e @ IntegrationError::Provider { .. }) => {
                    tracing::warn!(
                        connector = ID,
                        repository = %repo.full_name,
                        error = %e,
                        "Failed to fetch issues, skipping repository"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Ok(open_issues_payload(items))
    }
}

fn metadata() -> ConnectorMetadata {
    ConnectorMetadata {
        id: ID.to_string(),
        name: "GitHub".to_string(),
        description: "Repositories, notifications and open issues from GitHub".to_string(),
        category: Category::DeveloperTools,
        applicable_roles: vec![UserRole::Freelancer, UserRole::Client],
        pricing_tier: PricingTier::Free,
        logo_url: Some("https://github.githubassets.com/favicons/favicon.svg".to_string()),
    }
}

fn widgets() -> Vec<WidgetDefinition> {
    vec![
        WidgetDefinition::new(
            WIDGET_REPOSITORIES,
            "Repositories",
            "Recently updated repositories",
            900,
        )
        .with_scopes(&["repo"])
        .with_config_schema(json!({
            "type": "object",
            "properties": {
                "per_page": {"type": "integer", "minimum": 1, "maximum": MAX_PER_PAGE}
            }
        })),
        WidgetDefinition::new(
            WIDGET_NOTIFICATIONS,
            "Notifications",
            "Unread and recent notifications",
            300,
        )
        .with_scopes(&["notifications"])
        .with_config_schema(json!({
            "type": "object",
            "properties": {
                "all": {"type": "boolean"}
            }
        })),
        WidgetDefinition::new(
            WIDGET_OPEN_ISSUES,
            "Open Issues",
            "Open issues across recently updated repositories",
            600,
        )
        .with_scopes(&["repo"])
        .with_config_schema(json!({
            "type": "object",
            "properties": {
                "repositories": {"type": "integer", "minimum": 1, "maximum": 30}
            }
        })),
    ]
}

#[async_trait]
impl Connector for GitHubConnector {
    fn metadata(&self) -> &ConnectorMetadata {
        &self.metadata
    }

    fn runtime(&self) -> &ConnectorRuntime {
        &self.runtime
    }

    async fn test_connection(&self, tokens: &OAuthTokens) -> bool {
        match self.client(tokens).fetch_user().await {
            Ok(user) => {
                tracing::debug!(connector = ID, login = %user.login, "Connection verified");
                true
            }
            Err(e) => {
                tracing::info!(connector = ID, error = %e, "Connection test failed");
                false
            }
        }
    }

    fn widgets(&self) -> &[WidgetDefinition] {
        &self.widgets
    }

    async fn get_widget_data(
        &self,
        tokens: &OAuthTokens,
        widget_id: &str,
        params: &Value,
    ) -> Result<WidgetData> {
        let widget = self
            .widget(widget_id)
            .ok_or_else(|| IntegrationError::UnknownWidget {
                widget_id: widget_id.to_string(),
            })?;

        let data = match widget.id.as_str() {
            WIDGET_REPOSITORIES => {
                let per_page = params
                    .get("per_page")
                    .and_then(Value::as_u64)
                    .unwrap_or(DEFAULT_PER_PAGE)
                    .clamp(1, MAX_PER_PAGE);
                let repos = self.client(tokens).fetch_repos(per_page as u32).await?;
                repositories_payload(&repos)
            }
            WIDGET_NOTIFICATIONS => {
                let all = params.get("all").and_then(Value::as_bool).unwrap_or(false);
                let notifications = self.client(tokens).fetch_notifications(all).await?;
                notifications_payload(&notifications)
            }
            WIDGET_OPEN_ISSUES => {
                let repo_limit = params
                    .get("repositories")
                    .and_then(Value::as_u64)
                    .unwrap_or(DEFAULT_ISSUE_REPOS)
                    .clamp(1, 30);
                self.open_issues(tokens, repo_limit as usize).await?
            }
            other => {
                return Err(IntegrationError::UnknownWidget {
                    widget_id: other.to_string(),
                })
            }
        };

        Ok(WidgetData::for_widget(widget, data))
    }
}
