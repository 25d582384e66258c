//! Signalers that record what the output reports back.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use anyhow::{bail, Result};
use conduit_core::{signal_fn, Signal, Signaler};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Recorded {
    signals: Mutex<Vec<(u64, Signal)>>,
    notify: Notify,
}

/// Collects the signals of many events in one place.
///
/// Hand out one signaler per event with [`RecordingSignaler::signaler`] and
/// inspect or await the outcomes afterwards.
#[derive(Debug, Clone, Default)]
pub struct RecordingSignaler {
    recorded: Arc<Recorded>,
}

impl RecordingSignaler {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signaler for the event identified by `event_id`.
    pub fn signaler(&self, event_id: u64) -> Box<dyn Signaler> {
        let recorded = self.recorded.clone();
        Box::new(signal_fn(move |signal| {
            recorded
                .signals
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((event_id, signal));
            recorded.notify.notify_waiters();
        }))
    }

    /// All recorded `(event_id, signal)` pairs, in the order received.
    pub fn signals(&self) -> Vec<(u64, Signal)> {
        self.recorded.signals.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Signals recorded for one event.
    pub fn signals_for(&self, event_id: u64) -> Vec<Signal> {
        self.signals()
            .into_iter()
            .filter(|(id, _)| *id == event_id)
            .map(|(_, signal)| signal)
            .collect()
    }

    /// Total number of signals received.
    pub fn total(&self) -> usize {
        self.recorded.signals.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Number of `Completed` signals.
    pub fn completed(&self) -> usize {
        self.count(Signal::Completed)
    }

    /// Number of `Canceled` signals.
    pub fn canceled(&self) -> usize {
        self.count(Signal::Canceled)
    }

    /// Waits until at least `expected` signals have been recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer signals arrived within `timeout`.
    pub async fn wait_for(&self, expected: usize, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.recorded.notify.notified();
            let received = self.total();
            if received >= expected {
                return Ok(());
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                bail!("expected {expected} signals within {timeout:?}, received {}", self.total());
            }
        }
    }

    /// Asserts that every id in `event_ids` was signaled exactly once and
    /// nothing else was signaled.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first event that violates this.
    pub fn assert_exactly_once(&self, event_ids: impl IntoIterator<Item = u64>) -> Result<()> {
        let mut expected: Vec<u64> = event_ids.into_iter().collect();
        expected.sort_unstable();

        let mut seen: Vec<u64> = self.signals().into_iter().map(|(id, _)| id).collect();
        seen.sort_unstable();

        for id in &expected {
            let count = seen.iter().filter(|seen_id| *seen_id == id).count();
            if count != 1 {
                bail!("event {id} was signaled {count} times");
            }
        }
        if seen.len() != expected.len() {
            bail!("received {} signals for {} events", seen.len(), expected.len());
        }
        Ok(())
    }

    fn count(&self, wanted: Signal) -> usize {
        self.signals().iter().filter(|(_, signal)| *signal == wanted).count()
    }
}
