//! Integration Hub connectors - the connector contract, widget types and the
//! reference providers.
//!
//! Every connector builds on the shared runtime in `integration_hub`: OAuth
//! token lifecycle and the authenticated fetch pipeline. A connector only
//! supplies its metadata, its widget catalog and the mapping from provider
//! responses to widget payloads.
//!
//! # Architecture
//!
//! ```text
//! Dashboard / scheduler
//!          ↓  (tokens in, widget data out)
//! ┌─────────────────────────────────────────┐
//! │       HTTP API (api)                     │
//! │  - OAuth start / callback / refresh      │
//! │  - Widget data, connection test          │
//! └─────────────────────────────────────────┘
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │       Connector (implements trait)       │
//! │  - Widget catalog                        │
//! │  - Provider response → WidgetData        │
//! └─────────────────────────────────────────┘
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │       ConnectorRuntime                   │
//! │  - TokenManager (OAuth 2.0)              │
//! │  - FetchPipeline (retry, rate limits)    │
//! └─────────────────────────────────────────┘
//!          ↓
//!     Provider API (GitHub, Google Calendar)
//! ```
//!
//! # Core Types
//!
//! - [`Connector`] - Trait every connector implements
//! - [`ConnectorRuntime`] - Default OAuth + fetch implementation
//! - [`WidgetDefinition`] / [`WidgetData`] - Widget catalog and payloads
//! - [`ConnectorRegistry`] - Provider id → connector

pub mod api;
mod connector;
pub mod providers;
pub mod registry;
mod runtime;
mod types;

pub use connector::Connector;
pub use registry::{ConnectorRegistry, Provider};
pub use runtime::ConnectorRuntime;
pub use types::{Category, ConnectorMetadata, PricingTier, UserRole, WidgetData, WidgetDefinition};

#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
