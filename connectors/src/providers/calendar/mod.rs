pub mod api;
pub mod config;
pub mod transformer;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use integration_hub::{IntegrationError, OAuthTokens, Result};
use serde_json::{json, Value};

use crate::runtime::ConnectorRuntime;
use crate::types::{
    Category, ConnectorMetadata, PricingTier, UserRole, WidgetData, WidgetDefinition,
};
use crate::Connector;

use self::api::CalendarClient;
use self::config::{CalendarConfig, BASE_URL, SCOPES};
use self::transformer::upcoming_events_payload;

pub const ID: &str = "google-calendar";

const WIDGET_UPCOMING_EVENTS: &str = "upcoming-events";

const DEFAULT_CALENDAR: &str = "primary";
const DEFAULT_MAX_RESULTS: u64 = 10;
const MAX_RESULTS_LIMIT: u64 = 50;
const DEFAULT_DAYS: u64 = 7;
const MAX_DAYS: u64 = 31;

/// Google Calendar connector: upcoming events from one calendar.
pub struct CalendarConnector {
    metadata: ConnectorMetadata,
    runtime: ConnectorRuntime,
    widgets: Vec<WidgetDefinition>,
}

impl CalendarConnector {
    /// Connector against the real Calendar API.
    pub fn new(config: &CalendarConfig) -> Self {
        Self::with_runtime(ConnectorRuntime::new(config.oauth_config(), BASE_URL))
    }

    pub fn with_runtime(runtime: ConnectorRuntime) -> Self {
        Self {
            metadata: ConnectorMetadata {
                id: ID.to_string(),
                name: "Google Calendar".to_string(),
                description: "Upcoming meetings and deadlines from Google Calendar".to_string(),
                category: Category::Productivity,
                applicable_roles: vec![UserRole::Freelancer, UserRole::Client, UserRole::Admin],
                pricing_tier: PricingTier::Free,
                logo_url: None,
            },
            runtime,
            widgets: vec![WidgetDefinition::new(
                WIDGET_UPCOMING_EVENTS,
                "Upcoming Events",
                "Events in the next days, ordered by start time",
                300,
            )
            .with_scopes(SCOPES)
            .with_config_schema(json!({
                "type": "object",
                "properties": {
                    "calendar_id": {"type": "string"},
                    "max_results": {"type": "integer", "minimum": 1, "maximum": MAX_RESULTS_LIMIT},
                    "days": {"type": "integer", "minimum": 1, "maximum": MAX_DAYS}
                }
            }))],
        }
    }

    fn client<'a>(&'a self, tokens: &'a OAuthTokens) -> CalendarClient<'a> {
        CalendarClient::new(self.runtime.pipeline(), tokens, self.runtime.fetch_options())
    }
}

#[async_trait]
impl Connector for CalendarConnector {
    fn metadata(&self) -> &ConnectorMetadata {
        &self.metadata
    }

    fn runtime(&self) -> &ConnectorRuntime {
        &self.runtime
    }

    fn supports_pkce(&self) -> bool {
        true
    }

    async fn test_connection(&self, tokens: &OAuthTokens) -> bool {
        match self.client(tokens).list_calendars(1).await {
            Ok(_) => true,
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

        let calendar_id = params
            .get("calendar_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_CALENDAR);
        let max_results = params
            .get("max_results")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_MAX_RESULTS)
            .clamp(1, MAX_RESULTS_LIMIT);
        let days = params
            .get("days")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_DAYS)
            .clamp(1, MAX_DAYS);

        let now = Utc::now();
        let list = self
            .client(tokens)
            .list_events(
                calendar_id,
                now,
                now + Duration::days(days as i64),
                max_results as u32,
            )
            .await?;

        tracing::debug!(
            connector = ID,
            calendar = calendar_id,
            events = list.items.len(),
            "Fetched upcoming events"
        );

        Ok(WidgetData::for_widget(
            widget,
            upcoming_events_payload(calendar_id, &list),
        ))
    }
}
