//! Reference connectors.

pub mod calendar;
pub mod github;

pub use calendar::CalendarConnector;
pub use github::GitHubConnector;
