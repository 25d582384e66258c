//! Output configuration.
//!
//! [`OutputConfig`] is validated once when the output starts and then shared
//! read-only by every worker.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    error::{OutputError, Result},
    retry::RetryPolicy,
};

/// Configuration for the HTTP output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Request path, optionally containing the `{#TOPIC}` placeholder.
    pub uri: String,

    /// Collector addresses as `host:port`, rotated per attempt.
    pub addresses: Vec<String>,

    /// Maximum time to establish a connection.
    pub connect_timeout: Duration,

    /// Maximum time for a whole request, including the response.
    pub request_timeout: Duration,

    /// Number of concurrent workers.
    pub worker_count: usize,

    /// Retries after the first failed attempt; `-1` retries forever.
    pub max_retries: i32,

    /// Number of events that can wait in the queue.
    pub queue_capacity: usize,

    /// Fixed delay between attempts for the same event.
    pub retry_interval: Duration,

    /// `Content-Type` header sent with every request.
    pub content_type: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            uri: String::new(),
            addresses: Vec::new(),
            connect_timeout: Duration::from_millis(crate::DEFAULT_CONNECT_TIMEOUT_MS),
            request_timeout: Duration::from_secs(crate::DEFAULT_REQUEST_TIMEOUT_SECONDS),
            worker_count: crate::DEFAULT_WORKER_COUNT,
            max_retries: crate::DEFAULT_MAX_RETRIES,
            queue_capacity: crate::DEFAULT_QUEUE_CAPACITY,
            retry_interval: Duration::from_millis(crate::DEFAULT_RETRY_INTERVAL_MS),
            content_type: crate::DEFAULT_CONTENT_TYPE.to_string(),
        }
    }
}

impl OutputConfig {
    /// Creates a configuration with defaults for everything but the target.
    pub fn new<I, S>(uri: impl Into<String>, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            uri: uri.into(),
            addresses: addresses.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `OutputError::ConfigurationError` if the uri or address list
    /// is empty, an address is blank, `worker_count` or `queue_capacity` is
    /// zero, or `max_retries` is below `-1`.
    pub fn validate(&self) -> Result<()> {
        if self.uri.is_empty() {
            return Err(OutputError::configuration("uri must be set"));
        }
        if self.addresses.is_empty() {
            return Err(OutputError::configuration("addresses must contain at least one host"));
        }
        if let Some(position) = self.addresses.iter().position(|a| a.trim().is_empty()) {
            return Err(OutputError::configuration(format!("address {position} is empty")));
        }
        if self.worker_count == 0 {
            return Err(OutputError::configuration("worker_count must be at least 1"));
        }
        if self.queue_capacity == 0 {
            return Err(OutputError::configuration("queue_capacity must be at least 1"));
        }
        if self.max_retries < -1 {
            return Err(OutputError::configuration(format!(
                "max_retries must be -1 (unlimited) or non-negative, got {}",
                self.max_retries
            )));
        }
        if self.content_type.trim().is_empty() {
            return Err(OutputError::configuration("content_type must be set"));
        }
        Ok(())
    }

    /// Retry policy shared by all workers.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_max_retries(self.max_retries, self.retry_interval)
    }
}
