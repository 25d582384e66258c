//! Test infrastructure and utilities for deterministic testing.
//!
//! Provides mock collector backends, signal recorders, event fixtures and a
//! controllable clock, so output tests can assert on exactly what was sent
//! and what each producer was told.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod fixtures;
pub mod http;
pub mod signal;

pub use conduit_core::{Clock, TestClock};
pub use fixtures::{event_with_numeric_topic, orders_event, plain_event, topic_event, EventBuilder};
pub use http::{FailThenSucceed, MockBackend};
pub use signal::RecordingSignaler;
