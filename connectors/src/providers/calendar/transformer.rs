use serde_json::{json, Value};

use super::api::{CalendarEvent, EventList};

/// Dashboard row for an event.
pub fn event_to_item(event: &CalendarEvent) -> Value {
    let all_day = event.start.date_time.is_none() && event.start.date.is_some();
    json!({
        "id": event.id,
        "title": event.summary.as_deref().unwrap_or("(no title)"),
        "location": event.location,
        "status": event.status,
        "all_day": all_day,
        "start": event.start.date_time.as_ref().or(event.start.date.as_ref()),
        "end": event.end.date_time.as_ref().or(event.end.date.as_ref()),
        "link": event.html_link,
        "meeting_link": event.hangout_link,
        "organizer": event.organizer.as_ref().and_then(|o| o.email.as_ref()),
    })
}

/// Cancelled instances are dropped.
pub fn upcoming_events_payload(calendar_id: &str, list: &EventList) -> Value {
    let events: Vec<Value> = list
        .items
        .iter()
        .filter(|e| e.status.as_deref() != Some("cancelled"))
        .map(event_to_item)
        .collect();
    json!({
        "calendar": calendar_id,
        "time_zone": list.time_zone,
        "total": events.len(),
        "events": events,
    })
}
