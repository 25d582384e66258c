//! HTTP output front-end.
//!
//! [`HttpOutput`] owns the producer side of the bounded queue and the
//! shutdown token shared with the worker pool.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐  submit  ┌──────────────┐  recv  ┌──────────────┐  POST  ┌───────────┐
//! │ Producer   │─────────▶│ Bounded      │───────▶│ Worker Pool  │───────▶│ Collector │
//! │ + Signaler │          │ Queue (MPMC) │        │ (N workers)  │        │ addresses │
//! └────────────┘          └──────────────┘        └──────────────┘        └───────────┘
//!       ▲                                                │
//!       └────────────── Completed / Canceled ────────────┘
//! ```
//!
//! Shutdown closes the queue first and then cancels the token. A submit that
//! lost the race with shutdown gets `OutputError::Closed` and its signaler
//! receives `Canceled`; anything that made it into the queue is either sent
//! or canceled by a worker.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use async_channel::{Sender, TrySendError};
use conduit_core::{Clock, Event, RealClock, Signaler};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::OutputConfig,
    error::{OutputError, Result},
    stats::{OutputStats, StatsHandle},
    task::{DeliveryOptions, SendTask},
    worker_pool::WorkerPool,
};

/// Running HTTP output accepting events for delivery.
pub struct HttpOutput {
    config: Arc<OutputConfig>,
    sender: Sender<SendTask>,
    stats: Arc<RwLock<OutputStats>>,
    cancellation_token: CancellationToken,
    worker_pool: Option<WorkerPool>,
    next_task_id: AtomicU64,
}

impl HttpOutput {
    /// Validates `config`, spawns the workers and returns once all of them
    /// are running.
    ///
    /// # Errors
    ///
    /// Returns `OutputError::ConfigurationError` if the configuration is
    /// invalid or an HTTP client cannot be built. No worker is spawned in
    /// either case.
    pub async fn start(config: OutputConfig) -> Result<Self> {
        Self::start_with_clock(config, Arc::new(RealClock::new())).await
    }

    /// Like [`HttpOutput::start`], with the clock used for retry waits.
    ///
    /// # Errors
    ///
    /// Same as [`HttpOutput::start`].
    pub async fn start_with_clock(config: OutputConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        info!(
            uri = %config.uri,
            addresses = ?config.addresses,
            worker_count = config.worker_count,
            queue_capacity = config.queue_capacity,
            max_retries = config.max_retries,
            "starting http output"
        );

        let config = Arc::new(config);
        let (sender, receiver) = async_channel::bounded(config.queue_capacity);
        let stats = Arc::new(RwLock::new(OutputStats::default()));
        let cancellation_token = CancellationToken::new();

        let mut worker_pool = WorkerPool::new(
            config.clone(),
            receiver,
            stats.clone(),
            cancellation_token.clone(),
            clock,
        );
        worker_pool.spawn_workers().await?;

        info!("http output started successfully");

        Ok(Self {
            config,
            sender,
            stats,
            cancellation_token,
            worker_pool: Some(worker_pool),
            next_task_id: AtomicU64::new(1),
        })
    }

    /// Queues `event` for delivery, waiting while the queue is full.
    ///
    /// `Ok` only acknowledges the enqueue; the outcome arrives later through
    /// `signaler`.
    ///
    /// # Errors
    ///
    /// Returns `OutputError::Closed` if the output is shut down before or
    /// while waiting. The signaler has then already received `Canceled`.
    pub async fn submit(
        &self,
        event: Event,
        signaler: Box<dyn Signaler>,
        options: DeliveryOptions,
    ) -> Result<()> {
        let task = self.new_task(event, signaler, options);

        if self.cancellation_token.is_cancelled() {
            debug!(task_id = task.id(), "rejecting event, output is shut down");
            task.cancel();
            return Err(OutputError::Closed);
        }

        if let Err(rejected) = self.sender.send(task).await {
            let task = rejected.0;
            debug!(task_id = task.id(), "rejecting event, output shut down while waiting");
            task.cancel();
            return Err(OutputError::Closed);
        }

        self.record_submitted().await;
        Ok(())
    }

    /// Queues `event` for delivery without waiting.
    ///
    /// # Errors
    ///
    /// - `QueueFull` when the queue has no room
    /// - `Closed` when the output is shut down
    ///
    /// The signaler receives `Canceled` in both cases.
    pub async fn try_submit(
        &self,
        event: Event,
        signaler: Box<dyn Signaler>,
        options: DeliveryOptions,
    ) -> Result<()> {
        let task = self.new_task(event, signaler, options);

        if self.cancellation_token.is_cancelled() {
            task.cancel();
            return Err(OutputError::Closed);
        }

        match self.sender.try_send(task) {
            Ok(()) => {
                self.record_submitted().await;
                Ok(())
            },
            Err(TrySendError::Full(task)) => {
                warn!(
                    task_id = task.id(),
                    capacity = self.config.queue_capacity,
                    "queue full, rejecting event"
                );
                task.cancel();
                Err(OutputError::QueueFull { capacity: self.config.queue_capacity })
            },
            Err(TrySendError::Closed(task)) => {
                task.cancel();
                Err(OutputError::Closed)
            },
        }
    }

    /// Stops accepting events and tells the workers to stop.
    ///
    /// Returns without waiting for the workers. Calling it again has no
    /// effect.
    ///
    /// # Errors
    ///
    /// Currently always succeeds.
    pub fn shutdown(&self) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Ok(());
        }

        info!(queued = self.sender.len(), "shutting down http output");

        self.sender.close();
        self.cancellation_token.cancel();

        Ok(())
    }

    /// Shuts down and waits up to `timeout` for every worker to exit.
    ///
    /// # Errors
    ///
    /// - `ShutdownTimeout` if workers are still running at the deadline
    /// - `WorkerPanic` if a worker panicked
    pub async fn shutdown_graceful(mut self, timeout: Duration) -> Result<()> {
        self.shutdown()?;

        match self.worker_pool.take() {
            Some(worker_pool) => worker_pool.shutdown_graceful(timeout).await,
            None => Ok(()),
        }
    }

    /// Returns a snapshot of the output counters.
    pub async fn stats(&self) -> OutputStats {
        self.stats.read().await.clone()
    }

    /// Shared handle to the counters, usable after the output is consumed by
    /// [`HttpOutput::shutdown_graceful`].
    pub fn stats_handle(&self) -> StatsHandle {
        StatsHandle::new(self.stats.clone())
    }

    /// Whether [`HttpOutput::shutdown`] has been called.
    pub fn is_closed(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Number of events waiting in the queue.
    pub fn queue_len(&self) -> usize {
        self.sender.len()
    }

    /// Configuration the output was started with.
    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    fn new_task(
        &self,
        event: Event,
        signaler: Box<dyn Signaler>,
        options: DeliveryOptions,
    ) -> SendTask {
        let id = self.next_task_id.fetch_add(1, Ordering::Relaxed);
        SendTask::new(id, event, signaler, options)
    }

    async fn record_submitted(&self) {
        let mut stats = self.stats.write().await;
        stats.events_submitted += 1;
    }
}

impl std::fmt::Debug for HttpOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpOutput")
            .field("config", &self.config)
            .field("queued", &self.sender.len())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
