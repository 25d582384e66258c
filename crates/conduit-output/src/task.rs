//! Units of work queued between the output front-end and its workers.

use std::fmt;

use conduit_core::{Event, Signal, Signaler};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Per-event delivery options supplied by the producer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOptions {
    /// Keep retrying regardless of the configured retry limit.
    pub guaranteed: bool,
}

impl DeliveryOptions {
    /// Options for an event that must not be dropped after retries.
    pub fn guaranteed() -> Self {
        Self { guaranteed: true }
    }
}

/// An event waiting for delivery together with its completion handle.
///
/// The signaler is consumed by [`SendTask::complete`] or
/// [`SendTask::cancel`]. A task dropped before either is called signals
/// `Canceled` on drop, so a producer never waits on an event that no longer
/// exists.
pub struct SendTask {
    id: u64,
    event: Event,
    options: DeliveryOptions,
    signaler: Option<Box<dyn Signaler>>,
}

impl SendTask {
    /// Wraps an event for delivery.
    pub fn new(
        id: u64,
        event: Event,
        signaler: Box<dyn Signaler>,
        options: DeliveryOptions,
    ) -> Self {
        Self { id, event, options, signaler: Some(signaler) }
    }

    /// Identifier assigned at submission, used in logs.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The event to deliver.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Producer-supplied delivery options.
    pub fn options(&self) -> DeliveryOptions {
        self.options
    }

    /// Signals that the output is done with this event.
    pub fn complete(self) {
        self.finish(Signal::Completed);
    }

    /// Signals that this event was abandoned on shutdown.
    pub fn cancel(self) {
        self.finish(Signal::Canceled);
    }

    fn finish(mut self, signal: Signal) {
        if let Some(signaler) = self.signaler.take() {
            signaler.signal(signal);
        }
    }
}

impl Drop for SendTask {
    fn drop(&mut self) {
        if let Some(signaler) = self.signaler.take() {
            warn!(task_id = self.id, "send task dropped without a signal, reporting it canceled");
            signaler.signal(Signal::Canceled);
        }
    }
}

impl fmt::Debug for SendTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendTask")
            .field("id", &self.id)
            .field("event", &self.event)
            .field("options", &self.options)
            .field("signaled", &self.signaler.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use conduit_core::signal_fn;

    use super::*;

    fn recording_task(id: u64) -> (SendTask, Arc<Mutex<Vec<Signal>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let signaler = signal_fn(move |signal| sink.lock().expect("lock poisoned").push(signal));
        let task = SendTask::new(id, Event::default(), Box::new(signaler), DeliveryOptions::default());
        (task, received)
    }

    #[test]
    fn complete_signals_exactly_once() {
        let (task, received) = recording_task(1);

        task.complete();

        assert_eq!(*received.lock().expect("lock poisoned"), vec![Signal::Completed]);
    }

    #[test]
    fn cancel_signals_exactly_once() {
        let (task, received) = recording_task(2);

        task.cancel();

        assert_eq!(*received.lock().expect("lock poisoned"), vec![Signal::Canceled]);
    }

    #[test]
    fn dropped_task_reports_canceled() {
        let (task, received) = recording_task(3);

        drop(task);

        assert_eq!(*received.lock().expect("lock poisoned"), vec![Signal::Canceled]);
    }

    #[test]
    fn guaranteed_options_constructor() {
        assert!(DeliveryOptions::guaranteed().guaranteed);
        assert!(!DeliveryOptions::default().guaranteed);
    }
}
