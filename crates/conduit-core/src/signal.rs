//! Completion signals delivered back to event producers.
//!
//! Each submitted event carries a [`Signaler`]. The output consumes it
//! exactly once, when the event's delivery attempt sequence has ended. The
//! signal says that delivery is over, not whether the collector accepted the
//! event: an event dropped after exhausting its retries is still
//! [`Signal::Completed`].

use std::fmt;

use tokio::sync::oneshot;

/// Terminal outcome reported to a producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// The output is done with the event (delivered, or given up on).
    Completed,
    /// The event was abandoned because the output shut down.
    Canceled,
}

impl Signal {
    /// Whether this is `Signal::Completed`.
    pub fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

/// Completion handle for one submitted event.
///
/// `signal` takes the boxed handle by value, so a signaler can be invoked at
/// most once.
pub trait Signaler: Send + 'static {
    /// Reports the terminal outcome for the event.
    fn signal(self: Box<Self>, signal: Signal);
}

impl Signaler for oneshot::Sender<Signal> {
    fn signal(self: Box<Self>, signal: Signal) {
        // Producer may have stopped waiting; nothing else to notify.
        let _ = (*self).send(signal);
    }
}

/// Signaler that ignores the outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSignaler;

impl Signaler for NoopSignaler {
    fn signal(self: Box<Self>, _signal: Signal) {}
}

/// Signaler backed by a closure.
pub struct SignalFn<F>(F);

impl<F> fmt::Debug for SignalFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalFn").finish_non_exhaustive()
    }
}

impl<F> Signaler for SignalFn<F>
where
    F: FnOnce(Signal) + Send + 'static,
{
    fn signal(self: Box<Self>, signal: Signal) {
        (self.0)(signal);
    }
}

/// Wraps a closure into a [`Signaler`].
pub fn signal_fn<F>(f: F) -> SignalFn<F>
where
    F: FnOnce(Signal) + Send + 'static,
{
    SignalFn(f)
}

/// Creates a oneshot-backed signaler and the receiver the producer awaits.
pub fn oneshot_signal() -> (Box<dyn Signaler>, oneshot::Receiver<Signal>) {
    let (tx, rx) = oneshot::channel();
    (Box::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;

    #[tokio::test]
    async fn oneshot_signaler_delivers_outcome() {
        let (signaler, rx) = oneshot_signal();

        signaler.signal(Signal::Canceled);

        assert_eq!(rx.await, Ok(Signal::Canceled));
    }

    #[test]
    fn oneshot_signaler_tolerates_dropped_receiver() {
        let (signaler, rx) = oneshot_signal();
        drop(rx);

        // Must not panic
        signaler.signal(Signal::Completed);
    }

    #[test]
    fn closure_signaler_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let signaler: Box<dyn Signaler> = Box::new(signal_fn(move |signal| {
            assert!(signal.is_completed());
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        signaler.signal(Signal::Completed);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn signal_display_format() {
        assert_eq!(Signal::Completed.to_string(), "completed");
        assert_eq!(Signal::Canceled.to_string(), "canceled");
    }
}
