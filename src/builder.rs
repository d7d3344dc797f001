//! Ergonomic event construction
//!
//! [`MessageBuilder`] produces typed event drafts so call sites never juggle
//! timing or property keys by hand. Drafts are plain mutable structs whose
//! chained mutators consume and return the draft; `send(self)` finalizes it
//! into an immutable [`Event`], so mutation after send is impossible by
//! construction.
//!
//! The [`ServiceFacade`] underneath is the process-wide entry point: the
//! first `send` of its lifetime lazily constructs the dispatch service,
//! emits exactly one startup event, and arms the one-shot shutdown path.
//! This holds even when the first sends race on different threads.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Duration, Utc};

use crate::anonymize::anonymize;
use crate::event::{Event, EventKind};
use crate::format::format_duration;
use crate::service::TelemetryService;

const PROP_TIME: &str = "time";
const PROP_DURATION: &str = "duration";
const PROP_ERROR: &str = "error";
const PROP_RESULT: &str = "result";
const PROP_SESSION_DURATION: &str = "session_duration";

/// Builds typed telemetry events against a shared [`ServiceFacade`].
#[derive(Clone)]
pub struct MessageBuilder {
    facade: Arc<ServiceFacade>,
}

impl MessageBuilder {
    pub fn new(facade: Arc<ServiceFacade>) -> Self {
        Self { facade }
    }

    /// Start a draft for a user action. The draft records its own start
    /// time, so `finished()` can compute the duration later.
    pub fn action_performed(&self, name: impl Into<String>) -> ActionMessage {
        ActionMessage::new(name, self.facade.clone())
    }
}

/// Draft of a user-action event.
pub struct ActionMessage {
    facade: Arc<ServiceFacade>,
    name: String,
    properties: HashMap<String, String>,
    started_at: DateTime<Utc>,
}

impl ActionMessage {
    fn new(name: impl Into<String>, facade: Arc<ServiceFacade>) -> Self {
        Self {
            facade,
            name: name.into(),
            properties: HashMap::new(),
            started_at: Utc::now(),
        }
    }

    /// Set an arbitrary property. Last write wins.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Set the duration property explicitly.
    pub fn duration(self, duration: Duration) -> Self {
        self.property(PROP_DURATION, format_duration(duration))
    }

    /// Set the duration from the draft's recorded start time to now.
    pub fn finished(self) -> Self {
        let elapsed = Utc::now() - self.started_at;
        self.duration(elapsed)
    }

    /// Mark the action as successful.
    pub fn success(self) -> Self {
        self.success_with("success")
    }

    /// Mark the action as successful with a custom result message.
    pub fn success_with(self, message: impl Into<String>) -> Self {
        self.property(PROP_RESULT, message)
    }

    /// Record an error message. The value is scrubbed of PII before it is
    /// stored.
    pub fn error(self, message: &str) -> Self {
        self.property(PROP_ERROR, anonymize(message))
    }

    /// Record an error from an error value's display message.
    pub fn error_from(self, error: &dyn std::error::Error) -> Self {
        self.error(&error.to_string())
    }

    /// Finalize the draft and hand the event to the dispatch core.
    pub fn send(self) {
        self.facade
            .send(Event::with_properties(EventKind::Action, self.name, self.properties));
    }
}

/// Build the startup event, stamping the creation time.
fn startup_event(now: DateTime<Utc>) -> Event {
    let mut properties = HashMap::new();
    properties.insert(PROP_TIME.to_string(), now.to_rfc3339());
    Event::with_properties(EventKind::Startup, "startup", properties)
}

/// Build the shutdown event carrying the wall-clock session duration.
fn shutdown_event(session: Duration) -> Event {
    let mut properties = HashMap::new();
    properties.insert(PROP_SESSION_DURATION.to_string(), format_duration(session));
    Event::with_properties(EventKind::Shutdown, "shutdown", properties)
}

/// Lazily-initialized entry point to the dispatch service.
///
/// Owned by the host and shared by reference with every call site. The
/// dispatch service, and with it the broker, only comes into existence on
/// the first `send`; a host that never reports anything never opens a
/// network path.
pub struct ServiceFacade {
    factory: Box<dyn Fn() -> TelemetryService + Send + Sync>,
    service: OnceLock<Arc<TelemetryService>>,
    started_at: DateTime<Utc>,
    shutdown_sent: AtomicBool,
}

impl ServiceFacade {
    /// Create a facade over a service factory. The factory runs at most
    /// once, on the first `send`.
    pub fn new(factory: impl Fn() -> TelemetryService + Send + Sync + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            service: OnceLock::new(),
            started_at: Utc::now(),
            shutdown_sent: AtomicBool::new(false),
        }
    }

    /// When this facade (and with it the host session) came up.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Dispatch an event, initializing the service first if this is the
    /// facade's first send. Initialization emits the startup event before
    /// the incoming one.
    pub fn send(&self, event: Event) {
        let service = self.service.get_or_init(|| {
            tracing::debug!("first send, initializing telemetry dispatch");
            let service = Arc::new((self.factory)());
            service.send(startup_event(Utc::now()));
            service
        });
        service.send(event);
    }

    /// Host shutdown signal. Emits the shutdown event exactly once; repeated
    /// signals and shutdown before any send are both no-ops.
    pub fn notify_shutdown(&self) {
        if self.shutdown_sent.swap(true, Ordering::SeqCst) {
            return;
        }
        let Some(service) = self.service.get() else {
            return;
        };
        service.send(shutdown_event(Utc::now() - self.started_at));
    }
}
