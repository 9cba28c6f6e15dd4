use chrono::{DateTime, Utc};
use integration_hub::{FetchOptions, FetchPipeline, IntegrationError, OAuthTokens, Result};
use serde::Deserialize;

/// Start or end of an event: `date_time` for timed events, `date` for
/// all-day ones.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    pub date_time: Option<String>,
    pub date: Option<String>,
    pub time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventOrganizer {
    pub email: Option<String>,
}

/// Calendar API v3 event (fields the widget uses).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub summary: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub html_link: Option<String>,
    pub hangout_link: Option<String>,
    #[serde(default)]
    pub start: EventTime,
    #[serde(default)]
    pub end: EventTime,
    pub organizer: Option<EventOrganizer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventList {
    pub summary: Option<String>,
    pub time_zone: Option<String>,
    #[serde(default)]
    pub items: Vec<CalendarEvent>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarListEntry {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct CalendarList {
    #[serde(default)]
    pub items: Vec<CalendarListEntry>,
}

/// Google Calendar API v3 calls for one account.
pub struct CalendarClient<'a> {
    pipeline: &'a FetchPipeline,
    tokens: &'a OAuthTokens,
    options: FetchOptions,
}

impl<'a> CalendarClient<'a> {
    pub fn new(pipeline: &'a FetchPipeline, tokens: &'a OAuthTokens, options: FetchOptions) -> Self {
        Self {
            pipeline,
            tokens,
            options,
        }
    }

    /// Lists at most `max_results` calendars.
    pub async fn list_calendars(&self, max_results: u32) -> Result<CalendarList> {
        let options = self
            .options
            .clone()
            .query("maxResults", max_results.to_string());
        let result = self
            .pipeline
            .fetch(self.tokens, "/users/me/calendarList", &options)
            .await?;
        Ok(result.data)
    }

    /// Single (expanded recurring) events in `[time_min, time_max)`, ordered
    /// by start time.
    pub async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        max_results: u32,
    ) -> Result<EventList> {
        let endpoint = events_path(calendar_id)?;
        let options = self
            .options
            .clone()
            .query("timeMin", time_min.to_rfc3339())
            .query("timeMax", time_max.to_rfc3339())
            .query("singleEvents", "true")
            .query("orderBy", "startTime")
            .query("maxResults", max_results.to_string());
        let result = self.pipeline.fetch(self.tokens, &endpoint, &options).await?;
        Ok(result.data)
    }
}

/// `/calendars/{id}/events` with the id as one percent-encoded segment.
///
/// Calendar ids are emails and may contain `#` (holiday calendars). Dot
/// segments survive encoding and would be resolved as path navigation, so
/// they are refused.
fn events_path(calendar_id: &str) -> Result<String> {
    if calendar_id.is_empty() || calendar_id == "." || calendar_id == ".." {
        return Err(IntegrationError::invalid_param(
            "calendar_id",
            format!("`{}` is not a calendar id", calendar_id),
        ));
    }
    Ok(format!("/calendars/{}/events", urlencoding::encode(calendar_id)))
}
