//! Event builders and fixtures for deterministic testing.
//!
//! Provides a builder for events with the `fields.topic` layout the output's
//! uri templating reads, plus shorthand constructors for the common cases.

use conduit_core::Event;
use serde_json::{json, Map, Value};

/// Builder for test events.
#[derive(Debug, Clone, Default)]
pub struct EventBuilder {
    body: Map<String, Value>,
    fields: Option<Map<String, Value>>,
}

impl EventBuilder {
    /// Creates a builder for an empty event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder with a message and a sequence number set.
    pub fn with_defaults(sequence: u64) -> Self {
        Self::new().set("message", format!("test event {sequence}")).set("sequence", sequence)
    }

    /// Sets a top-level key.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.body.insert(key.into(), value.into());
        self
    }

    /// Sets a key inside the `fields` object, creating it if needed.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.get_or_insert_with(Map::new).insert(key.into(), value.into());
        self
    }

    /// Sets `fields.topic`.
    #[must_use]
    pub fn topic(self, topic: impl Into<String>) -> Self {
        self.field("topic", topic.into())
    }

    /// Builds the event.
    pub fn build(self) -> Event {
        let mut body = self.body;
        if let Some(fields) = self.fields {
            body.insert("fields".to_string(), Value::Object(fields));
        }
        Event::from(body)
    }
}

/// Event with only a sequence number and message.
pub fn plain_event(sequence: u64) -> Event {
    EventBuilder::with_defaults(sequence).build()
}

/// Event routed by `topic`.
pub fn topic_event(sequence: u64, topic: &str) -> Event {
    EventBuilder::with_defaults(sequence).topic(topic).build()
}

/// The canonical templating example: `{"a":1,"fields":{"topic":"orders"}}`.
pub fn orders_event() -> Event {
    EventBuilder::new().set("a", 1).topic("orders").build()
}

/// Event whose `fields.topic` is not a string.
pub fn event_with_numeric_topic() -> Event {
    EventBuilder::new().set("a", 1).field("topic", json!(42)).build()
}
