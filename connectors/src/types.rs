use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Catalog grouping shown on the dashboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    DeveloperTools,
    Productivity,
    Communication,
    Finance,
    Security,
    Analytics,
}

/// Which users may connect a provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Freelancer,
    Client,
    Admin,
}

/// Minimum plan a provider is available on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingTier {
    Free,
    Pro,
    Business,
    Enterprise,
}

/// Identity metadata for a connector.
#[derive(Clone, Debug, Serialize)]
pub struct ConnectorMetadata {
    /// Unique identifier, lowercase with dashes (e.g. "github")
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub applicable_roles: Vec<UserRole>,
    pub pricing_tier: PricingTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

/// Static catalog entry describing one widget a connector can produce.
///
/// # Example
/// ```
/// use hub_connectors::WidgetDefinition;
///
/// let widget = WidgetDefinition::new("open-issues", "Open Issues", "Open issues across repositories", 600)
///     .with_scopes(&["repo"]);
/// assert_eq!(widget.required_scopes, vec!["repo".to_string()]);
/// ```
#[derive(Clone, Debug, Serialize)]
pub struct WidgetDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    /// How often the scheduler should refresh this widget (seconds)
    pub refresh_interval: u64,
    pub required_scopes: Vec<String>,
    /// JSON schema for the widget's `params`, if it takes any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_schema: Option<Value>,
}

impl WidgetDefinition {
    pub fn new(id: &str, name: &str, description: &str, refresh_interval: u64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            refresh_interval,
            required_scopes: Vec::new(),
            config_schema: None,
        }
    }

    pub fn with_scopes(mut self, scopes: &[&str]) -> Self {
        self.required_scopes = scopes.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_config_schema(mut self, schema: Value) -> Self {
        self.config_schema = Some(schema);
        self
    }
}

/// Normalized widget payload returned by every connector.
///
/// `expires_at` tells the caller how long the payload may be cached.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetData {
    pub widget_id: String,
    pub data: Value,
    pub fetched_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl WidgetData {
    /// Payload fetched now, without a cache lifetime.
    pub fn new(widget_id: impl Into<String>, data: Value) -> Self {
        Self {
            widget_id: widget_id.into(),
            data,
            fetched_at: Utc::now(),
            expires_at: None,
        }
    }

    /// Payload fetched now, cacheable until the widget's next refresh.
    /// An interval too large to represent leaves the expiry unset.
    pub fn for_widget(widget: &WidgetDefinition, data: Value) -> Self {
        let fetched_at = Utc::now();
        let expires_at = i64::try_from(widget.refresh_interval)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| fetched_at.checked_add_signed(ttl));
        Self {
            widget_id: widget.id.clone(),
            data,
            fetched_at,
            expires_at,
        }
    }
}
