//! HTTP output with a bounded queue and a pool of delivery workers.
//!
//! Producers hand structured events to an [`HttpOutput`] together with a
//! completion signaler. Events wait in a bounded queue until one of the
//! workers picks them up and POSTs them as JSON to one of the configured
//! collector addresses.
//!
//! # Architecture
//!
//! Each worker owns its HTTP client and its own rotation cursor over the
//! addresses. Every attempt, including the first, moves the cursor to the
//! next address. Failed attempts are retried after a fixed interval until
//! the retry limit is reached, at which point the event is dropped.
//!
//! 1. **Submit** - Producer enqueues an event, waiting while the queue is full
//! 2. **Resolve** - Worker substitutes `{#TOPIC}` in the uri from the event
//! 3. **Deliver** - POST to `http://{address}{uri}`; only status 200 succeeds
//! 4. **Signal** - Producer receives exactly one `Completed` or `Canceled`
//!
//! # Example
//!
//! ```no_run
//! use conduit_core::{oneshot_signal, Event};
//! use conduit_output::{DeliveryOptions, HttpOutput, OutputConfig, OutputError};
//! use serde_json::json;
//!
//! # async fn example() -> std::result::Result<(), OutputError> {
//! let config = OutputConfig::new("/ingest/{#TOPIC}", ["10.0.0.1:8080", "10.0.0.2:8080"]);
//! let output = HttpOutput::start(config).await?;
//!
//! let event = Event::from_value(json!({"fields": {"topic": "orders"}, "id": 1}))?;
//! let (signaler, done) = oneshot_signal();
//! output.submit(event, signaler, DeliveryOptions::default()).await?;
//!
//! let _signal = done.await;
//! output.shutdown()?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod output;
pub mod retry;
pub mod stats;
pub mod task;
pub mod template;
mod worker;
pub mod worker_pool;

// Re-export main public API
pub use config::OutputConfig;
pub use error::{ErrorCategory, OutputError, Result};
pub use output::HttpOutput;
pub use retry::{RetryLimit, RetryPolicy};
pub use stats::{OutputStats, StatsHandle};
pub use task::{DeliveryOptions, SendTask};

/// Default connection timeout in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 200;

/// Default whole-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 3;

/// Default number of delivery workers.
pub const DEFAULT_WORKER_COUNT: usize = 1;

/// Default retry limit; `-1` retries forever.
pub const DEFAULT_MAX_RETRIES: i32 = -1;

/// Default number of events the queue holds.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Default delay between attempts in milliseconds.
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 300;

/// Default `Content-Type` of request bodies.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";
