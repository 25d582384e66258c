//! Error types for the HTTP output.
//!
//! Covers configuration rejection at startup, producer-facing submit
//! failures, per-attempt delivery failures that feed the retry loop, and
//! worker lifecycle problems during shutdown. Attempt-level errors never
//! reach producers; they are logged and counted.

use std::{fmt, time::Duration};

use conduit_core::FieldError;
use thiserror::Error;

/// Result type alias for output operations.
pub type Result<T> = std::result::Result<T, OutputError>;

/// Error conditions raised by the HTTP output.
#[derive(Debug, Clone, Error)]
pub enum OutputError {
    /// Invalid output configuration.
    #[error("invalid output configuration: {message}")]
    ConfigurationError {
        /// Configuration error message
        message: String,
    },

    /// The output has been shut down and accepts no more events.
    #[error("output is closed")]
    Closed,

    /// The queue has no room and the caller asked not to wait.
    #[error("queue is full ({capacity} pending events)")]
    QueueFull {
        /// Configured queue capacity
        capacity: usize,
    },

    /// Network-level connectivity failure.
    #[error("network connection failed: {message}")]
    NetworkError {
        /// Error message describing the network failure
        message: String,
    },

    /// HTTP request timeout exceeded.
    #[error("request timeout after {timeout_ms}ms")]
    Timeout {
        /// Request timeout in milliseconds
        timeout_ms: u64,
    },

    /// Collector answered with something other than 200.
    #[error("unexpected response status {status_code} from {url}")]
    UnexpectedStatus {
        /// HTTP status code
        status_code: u16,
        /// URL the request was sent to
        url: String,
    },

    /// Request path could not be resolved from the event.
    #[error("cannot resolve request uri: {0}")]
    Template(#[from] FieldError),

    /// Event could not be encoded as a request body.
    #[error("cannot serialize event: {message}")]
    SerializationError {
        /// Serializer error message
        message: String,
    },

    /// Workers did not stop within the shutdown timeout.
    #[error("worker shutdown timed out after {timeout:?}")]
    ShutdownTimeout {
        /// Timeout that was exceeded
        timeout: Duration,
    },

    /// A worker task panicked.
    #[error("worker {worker_id} panicked: {error}")]
    WorkerPanic {
        /// Identifier of the failed worker
        worker_id: usize,
        /// Join error description
        error: String,
    },
}

impl OutputError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError { message: message.into() }
    }

    /// Creates a network error from a message.
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError { message: message.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(timeout: Duration) -> Self {
        Self::Timeout { timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX) }
    }

    /// Creates an unexpected status error.
    pub fn unexpected_status(status_code: u16, url: impl Into<String>) -> Self {
        Self::UnexpectedStatus { status_code, url: url.into() }
    }

    /// Creates a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError { message: message.into() }
    }

    /// Whether a send attempt that failed with this error goes back through
    /// the retry loop.
    ///
    /// Transport failures, non-200 responses and unresolvable request paths
    /// are retried. Serialization errors are not: the payload would fail the
    /// same way every time.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkError { .. }
            | Self::Timeout { .. }
            | Self::UnexpectedStatus { .. }
            | Self::Template(_) => true,

            Self::ConfigurationError { .. }
            | Self::Closed
            | Self::QueueFull { .. }
            | Self::SerializationError { .. }
            | Self::ShutdownTimeout { .. }
            | Self::WorkerPanic { .. } => false,
        }
    }
}

/// Category of output error for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection failures and timeouts.
    Network,
    /// Non-200 responses.
    Status,
    /// Event lacked the fields the request path needs.
    Template,
    /// Event could not be encoded.
    Serialization,
    /// Configuration problems.
    Configuration,
    /// Queue admission and worker lifecycle.
    Lifecycle,
}

impl From<&OutputError> for ErrorCategory {
    fn from(error: &OutputError) -> Self {
        match error {
            OutputError::NetworkError { .. } | OutputError::Timeout { .. } => Self::Network,
            OutputError::UnexpectedStatus { .. } => Self::Status,
            OutputError::Template(_) => Self::Template,
            OutputError::SerializationError { .. } => Self::Serialization,
            OutputError::ConfigurationError { .. } => Self::Configuration,
            OutputError::Closed
            | OutputError::QueueFull { .. }
            | OutputError::ShutdownTimeout { .. }
            | OutputError::WorkerPanic { .. } => Self::Lifecycle,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Status => write!(f, "status"),
            Self::Template => write!(f, "template"),
            Self::Serialization => write!(f, "serialization"),
            Self::Configuration => write!(f, "configuration"),
            Self::Lifecycle => write!(f, "lifecycle"),
        }
    }
}
