//! Per-event request path templating.
//!
//! A configured uri such as `/ingest/{#TOPIC}` is resolved against each
//! event by substituting the string at `fields.topic`. Without the
//! placeholder the uri is used verbatim.

use std::borrow::Cow;

use conduit_core::{Event, FieldError};

/// Placeholder replaced with the event topic.
pub const TOPIC_PLACEHOLDER: &str = "{#TOPIC}";

/// Location of the topic inside an event.
pub const TOPIC_PATH: [&str; 2] = ["fields", "topic"];

/// Request path template, parsed once per worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    raw: String,
    has_topic: bool,
}

impl UriTemplate {
    /// Parses a configured uri.
    pub fn new(uri: impl Into<String>) -> Self {
        let raw = uri.into();
        let has_topic = raw.contains(TOPIC_PLACEHOLDER);
        Self { raw, has_topic }
    }

    /// Whether the uri contains the topic placeholder.
    pub fn has_topic(&self) -> bool {
        self.has_topic
    }

    /// The uri as configured.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Resolves the request path for `event`.
    ///
    /// Every occurrence of the placeholder is replaced.
    ///
    /// # Errors
    ///
    /// Returns `FieldError` when the template needs a topic and the event
    /// has no `fields` object, no `topic` in it, or a non-string topic.
    pub fn resolve<'a>(&'a self, event: &Event) -> Result<Cow<'a, str>, FieldError> {
        if !self.has_topic {
            return Ok(Cow::Borrowed(&self.raw));
        }

        let topic = event.get_str(&TOPIC_PATH)?;
        Ok(Cow::Owned(self.raw.replace(TOPIC_PLACEHOLDER, topic)))
    }
}
