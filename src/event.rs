//! The telemetry event record
//!
//! An [`Event`] is an immutable snapshot of a single trackable occurrence.
//! Builders in [`crate::builder`] mutate a draft and hand a finished `Event`
//! to the dispatch core; after that point nothing mutates it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Classification of a telemetry event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// System-level event emitted once when the host starts reporting.
    Startup,
    /// System-level event emitted once when the host begins termination.
    Shutdown,
    /// A user-triggered action in the host application.
    Action,
    /// The one-time identity event that precedes all other traffic.
    UserIdentity,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Startup => "startup",
            EventKind::Shutdown => "shutdown",
            EventKind::Action => "action",
            EventKind::UserIdentity => "identity",
        }
    }
}

/// An immutable telemetry event.
///
/// Property keys are unique; when a draft sets the same key twice the last
/// write wins. Insertion order is not meaningful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    kind: EventKind,
    name: String,
    properties: HashMap<String, String>,
}

impl Event {
    pub fn new(kind: EventKind, name: impl Into<String>) -> Self {
        Self::with_properties(kind, name, HashMap::new())
    }

    pub fn with_properties(
        kind: EventKind,
        name: impl Into<String>,
        properties: HashMap<String, String>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            properties,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    /// Look up a single property value.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}
