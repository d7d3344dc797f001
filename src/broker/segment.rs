//! Segment HTTP broker
//!
//! Delivers events to the Segment API: `identify` for the one-time
//! user-identity event, `track` for everything else. All requests carry the
//! anonymous id and the environment context.
//!
//! The broker owns a background thread with a current-thread tokio runtime
//! and a `reqwest` client; [`Broker::send`] is a channel handoff and never
//! blocks on the network. Dropping the broker disconnects the channel, lets
//! the worker drain its backlog, and joins it.

use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;

use crate::config::SegmentConfig;
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::event::{Event, EventKind};

use super::Broker;

pub struct SegmentBroker {
    sender: Option<mpsc::Sender<Event>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl SegmentBroker {
    /// Spawn the delivery worker.
    ///
    /// `debug` selects the debug destination write key (falling back to the
    /// production key). Fails fast on incomplete configuration.
    pub fn new(
        config: &SegmentConfig,
        debug: bool,
        anonymous_id: String,
        environment: Environment,
    ) -> Result<Self> {
        config.validate()?;
        let write_key = config
            .key_for(debug)
            .ok_or_else(|| Error::Config("segment write key is required".to_string()))?
            .to_string();
        let endpoint = config.endpoint.trim_end_matches('/').to_string();
        let timeout = Duration::from_secs(config.timeout_secs);

        let (sender, receiver) = mpsc::channel::<Event>();
        let worker = thread::Builder::new()
            .name("telemetry-broker".to_string())
            .spawn(move || {
                worker_loop(receiver, endpoint, write_key, timeout, anonymous_id, environment)
            })?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }
}

impl Broker for SegmentBroker {
    fn send(&self, event: Event) {
        let Some(sender) = &self.sender else {
            return;
        };
        if sender.send(event).is_err() {
            tracing::warn!("telemetry worker stopped, dropping event");
        }
    }
}

impl Drop for SegmentBroker {
    fn drop(&mut self) {
        // Disconnecting the channel ends the worker loop after the backlog.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(
    receiver: Receiver<Event>,
    endpoint: String,
    write_key: String,
    timeout: Duration,
    anonymous_id: String,
    environment: Environment,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::warn!(error = %e, "failed to create telemetry runtime, delivery disabled");
            // Keep draining so senders never see a full channel.
            while receiver.recv().is_ok() {}
            return;
        }
    };

    let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "failed to create HTTP client, delivery disabled");
            while receiver.recv().is_ok() {}
            return;
        }
    };

    let context = match serde_json::to_value(&environment) {
        Ok(context) => context,
        Err(e) => {
            tracing::warn!(error = %e, "failed to serialize environment context");
            serde_json::Value::Null
        }
    };

    while let Ok(event) = receiver.recv() {
        let (path, body) = request_parts(&event, &anonymous_id, &context);
        let url = format!("{}/{}", endpoint, path);
        let result = runtime.block_on(async {
            let response = client
                .post(&url)
                .basic_auth(&write_key, Some(""))
                .json(&body)
                .send()
                .await
                .map_err(|e| Error::Broker(format!("HTTP request failed: {}", e)))?;

            let status = response.status();
            if status.is_success() {
                Ok(())
            } else {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unknown".to_string());
                Err(Error::Broker(format!("API error ({}): {}", status, error_text)))
            }
        });

        match result {
            Ok(()) => {
                tracing::debug!(name = %event.name(), kind = event.kind().as_str(), "delivered telemetry event");
            }
            Err(e) => {
                // Best effort, no retry: the dispatch core already moved on.
                tracing::warn!(error = %e, name = %event.name(), "failed to deliver telemetry event");
            }
        }
    }
}

/// Map an event onto the Segment API: endpoint path plus request body.
fn request_parts(
    event: &Event,
    anonymous_id: &str,
    context: &serde_json::Value,
) -> (&'static str, serde_json::Value) {
    let timestamp = Utc::now().to_rfc3339();
    match event.kind() {
        EventKind::UserIdentity => (
            "identify",
            json!({
                "anonymousId": anonymous_id,
                "traits": event.properties(),
                "context": context,
                "timestamp": timestamp,
            }),
        ),
        _ => (
            "track",
            json!({
                "anonymousId": anonymous_id,
                "event": event.name(),
                "properties": event.properties(),
                "context": context,
                "timestamp": timestamp,
            }),
        ),
    }
}
