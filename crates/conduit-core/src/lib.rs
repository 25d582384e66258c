//! Core event model and producer-facing primitives.
//!
//! Provides the structured [`Event`] record shipped by the output, the
//! [`Signaler`] handle producers use to learn that delivery of an event has
//! ended, and the [`Clock`] abstraction that keeps retry timing testable.
//! The output crate and the binary depend on these types.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod event;
pub mod signal;
pub mod time;

pub use error::{FieldError, Result};
pub use event::Event;
pub use signal::{oneshot_signal, signal_fn, NoopSignaler, Signal, SignalFn, Signaler};
pub use time::{Clock, RealClock, TestClock};
