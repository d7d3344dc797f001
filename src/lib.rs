//! # telemetry-gate
//!
//! Consent-gated usage telemetry for host applications.
//!
//! This library provides:
//! - A dispatch core that forwards, buffers, or drops events depending on
//!   the user's live consent state
//! - Typed event builders (actions, startup/shutdown) with PII scrubbing
//! - A Segment broker, anonymous identity, and environment enrichment
//! - Configuration and logging infrastructure
//!
//! ## Consent model
//!
//! Every event passes through [`TelemetryService`]. While the user has not
//! answered the consent prompt, events buffer in memory and the prompt is
//! triggered once; after an opt-in the buffer flushes in order, preceded by
//! a one-time identity event; after an opt-out events are dropped. The
//! enabled flag is re-read on every send, so a decision takes effect on the
//! very next event.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use telemetry_gate::{
//!     AnonymousId, Application, ConsentNotifier, Environment, FileConfiguration,
//!     MessageBuilder, SegmentBroker, ServiceFacade, TelemetryConfig, TelemetryService,
//! };
//!
//! struct PromptOnUiThread;
//! impl ConsentNotifier for PromptOnUiThread {
//!     fn query_user_consent(&self) { /* show the opt-in dialog */ }
//! }
//!
//! let facade = Arc::new(ServiceFacade::new(|| {
//!     let config = TelemetryConfig::load().unwrap_or_default();
//!     let environment = Environment::builder()
//!         .application(Application::new("editor", "2026.2"))
//!         .plugin(Application::new("sql-tools", "1.4.0"))
//!         .build();
//!     let broker = SegmentBroker::new(
//!         &config.segment,
//!         config.is_debug(),
//!         AnonymousId::new().get(),
//!         environment,
//!     )
//!     .expect("segment configuration");
//!     TelemetryService::new(
//!         Arc::new(FileConfiguration::new()),
//!         Arc::new(broker),
//!         Arc::new(PromptOnUiThread),
//!     )
//! }));
//!
//! let builder = MessageBuilder::new(facade.clone());
//! builder.action_performed("open editor").success().finished().send();
//!
//! // From the host's shutdown hook:
//! facade.notify_shutdown();
//! ```

// Re-export commonly used items at the crate root
pub use anonymize::anonymize;
pub use broker::{Broker, SegmentBroker};
pub use builder::{ActionMessage, MessageBuilder, ServiceFacade};
pub use config::{FileConfiguration, Mode, SegmentConfig, TelemetryConfig};
pub use environment::{Application, Environment, EnvironmentBuilder, Platform};
pub use error::{Error, Result};
pub use event::{Event, EventKind};
pub use identity::AnonymousId;
pub use service::{ConfigurationReader, ConsentNotifier, TelemetryService};

// Public modules
pub mod anonymize;
pub mod broker;
pub mod builder;
pub mod config;
pub mod environment;
pub mod error;
pub mod event;
pub mod format;
pub mod identity;
pub mod logging;
pub mod service;
