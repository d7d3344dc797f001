//! Consent gate and dispatch core
//!
//! [`TelemetryService`] decides, per event, whether it may be forwarded to
//! the broker now, must wait for the user's consent decision, or gets
//! dropped because the user opted out.
//!
//! ## State machine
//!
//! Each `send` re-reads the live configuration and lands in one of three
//! branches:
//!
//! - **enabled**: flush anything queued, then forward the event. The first
//!   forward of this instance's lifetime is preceded by exactly one
//!   user-identity event.
//! - **not enabled, consent undecided**: queue the event (FIFO, unbounded)
//!   and trigger the consent prompt, at most once per instance.
//! - **not enabled, consent decided**: drop the event. Queuing forever for a
//!   user who declined would leak memory.
//!
//! Enablement is never cached: the user may answer the prompt between two
//! `send` calls, and the next call must observe the new value.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::broker::Broker;
use crate::event::{Event, EventKind};

/// Live view of the user's telemetry settings.
///
/// Both flags are re-read on every dispatch decision; implementations must
/// not hand out stale values.
pub trait ConfigurationReader: Send + Sync {
    /// True when the user has opted in.
    fn is_enabled(&self) -> bool;

    /// True once the user has answered the consent prompt, either way.
    fn is_configured(&self) -> bool;
}

/// Triggers the user-facing consent prompt.
///
/// Called at most once per [`TelemetryService`] instance, possibly from a
/// non-UI thread; implementations redirect to the right thread themselves.
pub trait ConsentNotifier: Send + Sync {
    fn query_user_consent(&self);
}

/// Name of the synthesized user-identity event.
const IDENTITY_EVENT_NAME: &str = "identity";

/// The consent-gated dispatch core.
///
/// `send` is safe to call from any number of threads; calls serialize on an
/// internal mutex so the broker never observes interleaved partial flushes,
/// a duplicated identity event, or a duplicated consent prompt.
pub struct TelemetryService {
    configuration: Arc<dyn ConfigurationReader>,
    broker: Arc<dyn Broker>,
    notifier: Arc<dyn ConsentNotifier>,
    state: Mutex<DispatchState>,
}

/// Shared mutable state, guarded by the service mutex.
struct DispatchState {
    /// Events awaiting the consent decision, in submission order.
    pending: VecDeque<Event>,
    /// Set once the identity event has been handed to the broker.
    identity_sent: bool,
    /// Set once the consent prompt has been triggered.
    consent_requested: bool,
}

impl TelemetryService {
    pub fn new(
        configuration: Arc<dyn ConfigurationReader>,
        broker: Arc<dyn Broker>,
        notifier: Arc<dyn ConsentNotifier>,
    ) -> Self {
        Self {
            configuration,
            broker,
            notifier,
            state: Mutex::new(DispatchState {
                pending: VecDeque::new(),
                identity_sent: false,
                consent_requested: false,
            }),
        }
    }

    /// Dispatch one event.
    ///
    /// Best-effort and non-fatal: nothing here performs I/O, and broker
    /// delivery failures are the broker's own concern.
    pub fn send(&self, event: Event) {
        let mut state = self.lock_state();

        if self.configuration.is_enabled() {
            self.flush_pending(&mut state);
            self.forward(&mut state, event);
        } else if !self.configuration.is_configured() {
            tracing::debug!(name = %event.name(), "consent undecided, queueing event");
            state.pending.push_back(event);
            self.request_consent(&mut state);
        } else {
            // Asked and declined. Drop, don't queue.
            tracing::trace!(name = %event.name(), "telemetry disabled, dropping event");
        }
    }

    /// Number of events waiting on the consent decision.
    pub fn pending_count(&self) -> usize {
        self.lock_state().pending.len()
    }

    fn lock_state(&self) -> MutexGuard<'_, DispatchState> {
        // A panic while holding the lock leaves the state consistent enough
        // to keep dispatching; telemetry must not take the host down.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Drain the pending queue through the identity-first path, FIFO.
    fn flush_pending(&self, state: &mut DispatchState) {
        if state.pending.is_empty() {
            return;
        }
        tracing::debug!(count = state.pending.len(), "consent granted, flushing queued events");
        while let Some(event) = state.pending.pop_front() {
            self.forward(state, event);
        }
    }

    /// Hand one event to the broker, preceded by the one-time identity event.
    fn forward(&self, state: &mut DispatchState, event: Event) {
        if !state.identity_sent {
            state.identity_sent = true;
            self.broker
                .send(Event::new(EventKind::UserIdentity, IDENTITY_EVENT_NAME));
        }
        self.broker.send(event);
    }

    fn request_consent(&self, state: &mut DispatchState) {
        if state.consent_requested {
            return;
        }
        state.consent_requested = true;
        self.notifier.query_user_consent();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct RecordingBroker {
        events: Mutex<Vec<Event>>,
    }

    impl RecordingBroker {
        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }
    }

    impl Broker for RecordingBroker {
        fn send(&self, event: Event) {
            self.events.lock().unwrap().push(event);
        }
    }

    struct FixedConfiguration {
        enabled: AtomicBool,
        configured: AtomicBool,
    }

    impl FixedConfiguration {
        fn new(enabled: bool, configured: bool) -> Self {
            Self {
                enabled: AtomicBool::new(enabled),
                configured: AtomicBool::new(configured),
            }
        }

        fn set_enabled(&self, enabled: bool) {
            self.enabled.store(enabled, Ordering::SeqCst);
        }
    }

    impl ConfigurationReader for FixedConfiguration {
        fn is_enabled(&self) -> bool {
            self.enabled.load(Ordering::SeqCst)
        }

        fn is_configured(&self) -> bool {
            self.configured.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct CountingNotifier {
        calls: AtomicUsize,
    }

    impl ConsentNotifier for CountingNotifier {
        fn query_user_consent(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn service(
        enabled: bool,
        configured: bool,
    ) -> (
        TelemetryService,
        Arc<RecordingBroker>,
        Arc<FixedConfiguration>,
        Arc<CountingNotifier>,
    ) {
        let broker = Arc::new(RecordingBroker::default());
        let configuration = Arc::new(FixedConfiguration::new(enabled, configured));
        let notifier = Arc::new(CountingNotifier::default());
        let service = TelemetryService::new(
            configuration.clone(),
            broker.clone(),
            notifier.clone(),
        );
        (service, broker, configuration, notifier)
    }

    fn action(name: &str) -> Event {
        Event::new(EventKind::Action, name)
    }

    #[test]
    fn test_send_forwards_identity_first_when_enabled() {
        let (service, broker, _, notifier) = service(true, true);

        service.send(action("first"));

        let events = broker.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind(), EventKind::UserIdentity);
        assert_eq!(events[1].name(), "first");
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_identity_is_sent_only_once() {
        let (service, broker, _, _) = service(true, true);

        service.send(action("first"));
        service.send(action("second"));
        service.send(action("third"));

        let events = broker.events();
        assert_eq!(events.len(), 4);
        let identities = events
            .iter()
            .filter(|e| e.kind() == EventKind::UserIdentity)
            .count();
        assert_eq!(identities, 1);
        assert_eq!(events[0].kind(), EventKind::UserIdentity);
    }

    #[test]
    fn test_send_drops_events_when_declined() {
        let (service, broker, _, notifier) = service(false, true);

        for i in 0..5 {
            service.send(action(&format!("event-{i}")));
        }

        assert!(broker.events().is_empty());
        assert_eq!(service.pending_count(), 0);
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_send_queues_and_prompts_while_consent_undecided() {
        let (service, broker, _, notifier) = service(false, false);

        service.send(action("one"));
        service.send(action("two"));
        service.send(action("three"));

        assert!(broker.events().is_empty());
        assert_eq!(service.pending_count(), 3);
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_queued_events_flush_in_order_once_enabled() {
        let (service, broker, configuration, _) = service(false, false);

        service.send(action("one"));
        service.send(action("two"));
        service.send(action("three"));
        assert!(broker.events().is_empty());

        configuration.set_enabled(true);
        service.send(action("four"));

        let events = broker.events();
        let names: Vec<&str> = events.iter().map(Event::name).collect();
        assert_eq!(names, vec!["identity", "one", "two", "three", "four"]);
        assert_eq!(events[0].kind(), EventKind::UserIdentity);
        assert_eq!(service.pending_count(), 0);
    }

    #[test]
    fn test_prompt_fires_once_across_threads() {
        let (service, _, _, notifier) = service(false, false);
        let service = Arc::new(service);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let service = service.clone();
                std::thread::spawn(move || {
                    for i in 0..20 {
                        service.send(action(&format!("t{t}-{i}")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.pending_count(), 160);
    }

    #[test]
    fn test_identity_first_under_concurrent_sends() {
        let (service, broker, _, _) = service(true, true);
        let service = Arc::new(service);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let service = service.clone();
                std::thread::spawn(move || {
                    for i in 0..10 {
                        service.send(action(&format!("t{t}-{i}")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let events = broker.events();
        assert_eq!(events.len(), 81);
        assert_eq!(events[0].kind(), EventKind::UserIdentity);
        let identities = events
            .iter()
            .filter(|e| e.kind() == EventKind::UserIdentity)
            .count();
        assert_eq!(identities, 1);
    }
}
