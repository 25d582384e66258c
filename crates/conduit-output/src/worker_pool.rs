//! Worker pool management with structured concurrency.
//!
//! Builds one worker per configured slot, each with its own HTTP client,
//! spawns them onto the runtime and keeps their join handles so shutdown can
//! optionally wait for them.

use std::{sync::Arc, time::Duration};

use async_channel::Receiver;
use conduit_core::Clock;
use tokio::{sync::RwLock, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    client::{ClientConfig, DeliveryClient},
    config::OutputConfig,
    endpoint::EndpointSelector,
    error::{OutputError, Result},
    stats::OutputStats,
    task::SendTask,
    worker::DeliveryWorker,
};

/// Worker pool that owns the spawned delivery workers.
pub struct WorkerPool {
    config: Arc<OutputConfig>,
    queue: Receiver<SendTask>,
    stats: Arc<RwLock<OutputStats>>,
    cancellation_token: CancellationToken,
    worker_handles: Vec<JoinHandle<()>>,
    clock: Arc<dyn Clock>,
}

impl WorkerPool {
    /// Create a new worker pool bound to the shared queue.
    pub fn new(
        config: Arc<OutputConfig>,
        queue: Receiver<SendTask>,
        stats: Arc<RwLock<OutputStats>>,
        cancellation_token: CancellationToken,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { config, queue, stats, cancellation_token, worker_handles: Vec::new(), clock }
    }

    /// Spawn all configured workers and begin processing.
    ///
    /// Every worker's HTTP client is built before any worker is spawned, so a
    /// failure leaves nothing running. Returns once all workers are spawned.
    ///
    /// # Errors
    ///
    /// Returns `OutputError::ConfigurationError` if an HTTP client cannot be
    /// built.
    pub async fn spawn_workers(&mut self) -> Result<()> {
        info!(worker_count = self.config.worker_count, "spawning delivery workers");

        let client_config = ClientConfig {
            connect_timeout: self.config.connect_timeout,
            request_timeout: self.config.request_timeout,
            ..Default::default()
        };
        let addresses: Arc<[String]> = self.config.addresses.iter().cloned().collect();

        let mut workers = Vec::with_capacity(self.config.worker_count);
        for worker_id in 0..self.config.worker_count {
            let client = DeliveryClient::new(client_config.clone())?;
            workers.push(DeliveryWorker::new(
                worker_id,
                self.config.clone(),
                client,
                EndpointSelector::with_random_start(addresses.clone()),
                self.queue.clone(),
                self.stats.clone(),
                self.cancellation_token.clone(),
                self.clock.clone(),
            ));
        }

        {
            let mut stats = self.stats.write().await;
            stats.active_workers += workers.len();
        }

        for (worker_id, worker) in workers.into_iter().enumerate() {
            let handle = tokio::spawn(async move {
                info!(worker_id, "delivery worker starting");
                worker.run().await;
            });
            self.worker_handles.push(handle);
        }

        info!(spawned_workers = self.worker_handles.len(), "all delivery workers spawned");

        Ok(())
    }

    /// Waits for all workers to exit after cancellation.
    ///
    /// Cancels the shared token (a no-op if already canceled) and joins every
    /// worker within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `OutputError::ShutdownTimeout` if workers are still running
    /// when the timeout expires, or `OutputError::WorkerPanic` for the first
    /// worker that panicked.
    pub async fn shutdown_graceful(mut self, timeout: Duration) -> Result<()> {
        info!(
            worker_count = self.worker_handles.len(),
            timeout_ms = timeout.as_millis(),
            "waiting for delivery workers to stop"
        );

        self.cancellation_token.cancel();
        let handles = std::mem::take(&mut self.worker_handles);

        let join_all = async {
            let mut first_panic = None;
            for (worker_id, handle) in handles.into_iter().enumerate() {
                if let Err(join_error) = handle.await {
                    error!(
                        worker_id,
                        error = %join_error,
                        "worker task panicked during shutdown"
                    );
                    first_panic.get_or_insert(OutputError::WorkerPanic {
                        worker_id,
                        error: join_error.to_string(),
                    });
                }
            }
            first_panic
        };

        match tokio::time::timeout(timeout, join_all).await {
            Ok(None) => {
                info!("worker pool shutdown completed");
                Ok(())
            },
            Ok(Some(panic)) => Err(panic),
            Err(_elapsed) => {
                error!(
                    timeout_ms = timeout.as_millis(),
                    "worker shutdown timed out, some workers may still be running"
                );
                Err(OutputError::ShutdownTimeout { timeout })
            },
        }
    }

    /// Number of spawned workers.
    pub fn worker_count(&self) -> usize {
        self.worker_handles.len()
    }

    /// Check if any workers are still running.
    pub fn has_active_workers(&self) -> bool {
        self.worker_handles.iter().any(|h| !h.is_finished())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        let active_count = self.worker_handles.iter().filter(|h| !h.is_finished()).count();

        if active_count > 0 && !self.cancellation_token.is_cancelled() {
            error!(
                active_workers = active_count,
                "worker pool dropped with active workers, cancelling them"
            );

            self.cancellation_token.cancel();

            warn!("output was not shut down; call shutdown() before dropping it");
        }
    }
}

#[cfg(test)]
mod tests {
    use conduit_core::RealClock;

    use super::*;

    fn create_test_worker_pool(
        worker_count: usize,
    ) -> (WorkerPool, async_channel::Sender<SendTask>, Arc<RwLock<OutputStats>>, CancellationToken)
    {
        let config = OutputConfig { worker_count, ..OutputConfig::new("/ingest", ["127.0.0.1:9"]) };
        let (tx, rx) = async_channel::bounded(config.queue_capacity);
        let stats = Arc::new(RwLock::new(OutputStats::default()));
        let token = CancellationToken::new();
        let pool =
            WorkerPool::new(Arc::new(config), rx, stats.clone(), token.clone(), Arc::new(RealClock));
        (pool, tx, stats, token)
    }

    #[tokio::test]
    async fn worker_pool_spawns_configured_number_of_workers() {
        let (mut pool, _tx, stats, _token) = create_test_worker_pool(5);

        pool.spawn_workers().await.expect("workers should spawn successfully");

        assert_eq!(pool.worker_count(), 5);
        assert!(pool.has_active_workers());
        assert_eq!(stats.read().await.active_workers, 5);

        pool.shutdown_graceful(Duration::from_secs(1))
            .await
            .expect("graceful shutdown should succeed");

        assert_eq!(stats.read().await.active_workers, 0);
    }

    #[tokio::test]
    async fn worker_pool_shuts_down_quickly_when_idle() {
        let (mut pool, _tx, _stats, _token) = create_test_worker_pool(3);
        pool.spawn_workers().await.expect("workers should spawn successfully");

        tokio::time::sleep(Duration::from_millis(10)).await;

        let shutdown_start = std::time::Instant::now();
        pool.shutdown_graceful(Duration::from_secs(3))
            .await
            .expect("graceful shutdown should complete within timeout");

        assert!(shutdown_start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn unspawned_pool_shuts_down_immediately() {
        let (pool, _tx, _stats, _token) = create_test_worker_pool(2);

        let result = pool.shutdown_graceful(Duration::from_millis(1)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn dropping_running_pool_cancels_workers() {
        let (mut pool, _tx, _stats, token) = create_test_worker_pool(2);
        pool.spawn_workers().await.expect("workers should spawn successfully");

        drop(pool);

        assert!(token.is_cancelled(), "Drop should have cancelled the token");
    }
}
