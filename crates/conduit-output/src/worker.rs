//! Delivery workers.
//!
//! A worker drains the shared queue one task at a time. For each task it
//! serializes the event once and then runs the send-retry loop: advance the
//! endpoint cursor, stop if shutdown was requested, POST, and on failure wait
//! the fixed retry interval before the next attempt. Every task leaves the
//! worker with exactly one signal: `Completed` when delivered or given up
//! on, `Canceled` when abandoned on shutdown.

use std::sync::Arc;

use async_channel::Receiver;
use bytes::Bytes;
use conduit_core::{Clock, Event};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    client::{DeliveryClient, DeliveryRequest, DeliveryResponse},
    config::OutputConfig,
    endpoint::EndpointSelector,
    error::{ErrorCategory, OutputError, Result},
    retry::{RetryDecision, RetryPolicy},
    stats::OutputStats,
    task::SendTask,
    template::UriTemplate,
};

/// How a task left the send-retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskOutcome {
    /// Collector answered 200.
    Delivered,
    /// Retries exhausted or payload unserializable.
    Dropped,
    /// Shutdown observed before delivery.
    Canceled,
}

/// Individual worker owning its HTTP client and rotation cursor.
pub(crate) struct DeliveryWorker {
    id: usize,
    config: Arc<OutputConfig>,
    client: DeliveryClient,
    selector: EndpointSelector,
    template: UriTemplate,
    retry_policy: RetryPolicy,
    queue: Receiver<SendTask>,
    stats: Arc<RwLock<OutputStats>>,
    cancellation_token: CancellationToken,
    clock: Arc<dyn Clock>,
}

impl DeliveryWorker {
    /// Creates a worker with its own client and a randomly started cursor.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: usize,
        config: Arc<OutputConfig>,
        client: DeliveryClient,
        selector: EndpointSelector,
        queue: Receiver<SendTask>,
        stats: Arc<RwLock<OutputStats>>,
        cancellation_token: CancellationToken,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let template = UriTemplate::new(config.uri.clone());
        let retry_policy = config.retry_policy();

        Self {
            id,
            config,
            client,
            selector,
            template,
            retry_policy,
            queue,
            stats,
            cancellation_token,
            clock,
        }
    }

    /// Main worker loop - receives and processes tasks until shutdown.
    ///
    /// Shutdown wins when it races with an available task. After the loop
    /// ends, whatever is still queued is canceled rather than sent.
    pub(crate) async fn run(mut self) {
        debug!(
            worker_id = self.id,
            cursor = self.selector.cursor(),
            topic_template = self.template.has_topic(),
            "delivery worker running"
        );

        loop {
            tokio::select! {
                biased;

                () = self.cancellation_token.cancelled() => {
                    info!(worker_id = self.id, "delivery worker received shutdown signal");
                    break;
                }
                received = self.queue.recv() => match received {
                    Ok(task) => {
                        self.process_task(task).await;
                    },
                    Err(_) => {
                        debug!(worker_id = self.id, "queue closed and empty");
                        break;
                    },
                },
            }
        }

        self.cancel_queued().await;

        {
            let mut stats = self.stats.write().await;
            stats.active_workers = stats.active_workers.saturating_sub(1);
        }

        info!(worker_id = self.id, "delivery worker stopped");
    }

    /// Serializes the task's event and runs the send-retry loop.
    pub(crate) async fn process_task(&mut self, task: SendTask) -> TaskOutcome {
        let payload = match task.event().to_json_bytes() {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) => {
                let error = OutputError::serialization(e.to_string());
                error!(
                    worker_id = self.id,
                    task_id = task.id(),
                    error = %error,
                    event = %task.event(),
                    "failed to encode event, dropping it"
                );
                return self.finish(task, TaskOutcome::Dropped).await;
            },
        };

        let started = self.clock.now();
        let mut failed_attempts: u32 = 0;

        loop {
            let address = self.selector.advance().to_string();

            if self.cancellation_token.is_cancelled() {
                info!(
                    worker_id = self.id,
                    task_id = task.id(),
                    failed_attempts,
                    "shutdown requested, abandoning event"
                );
                return self.finish(task, TaskOutcome::Canceled).await;
            }

            let attempt_number = failed_attempts.saturating_add(1);
            {
                let mut stats = self.stats.write().await;
                stats.send_attempts += 1;
            }

            let result = self
                .attempt(task.id(), task.event(), &address, payload.clone(), attempt_number)
                .await;

            match result {
                Ok(response) => {
                    {
                        let mut stats = self.stats.write().await;
                        stats.bytes_written += payload.len() as u64;
                    }
                    debug!(
                        worker_id = self.id,
                        task_id = task.id(),
                        address = %address,
                        attempt_number,
                        request_ms = response.duration.as_millis(),
                        elapsed_ms = self.clock.now().duration_since(started).as_millis(),
                        "event delivered"
                    );
                    return self.finish(task, TaskOutcome::Delivered).await;
                },
                Err(error) => {
                    failed_attempts = attempt_number;
                    {
                        let mut stats = self.stats.write().await;
                        stats.send_failures += 1;
                    }

                    match self.next_step(&error, failed_attempts, task.options().guaranteed) {
                        RetryDecision::Retry { delay } => {
                            warn!(
                                worker_id = self.id,
                                task_id = task.id(),
                                address = %address,
                                attempt_number,
                                category = %ErrorCategory::from(&error),
                                error = %error,
                                retry_in_ms = delay.as_millis(),
                                "failed to send event, retrying"
                            );

                            tokio::select! {
                                () = self.clock.sleep(delay) => {}
                                () = self.cancellation_token.cancelled() => {}
                            }
                        },
                        RetryDecision::GiveUp { reason } => {
                            error!(
                                worker_id = self.id,
                                task_id = task.id(),
                                address = %address,
                                attempt_number,
                                reason = %reason,
                                category = %ErrorCategory::from(&error),
                                error = %error,
                                elapsed_ms = self.clock.now().duration_since(started).as_millis(),
                                "failed to send event, dropping it"
                            );
                            return self.finish(task, TaskOutcome::Dropped).await;
                        },
                    }
                },
            }
        }
    }

    /// Decides what follows a failed attempt.
    ///
    /// Errors that are not retryable end the task whatever the retry budget
    /// or the guaranteed flag say.
    fn next_step(
        &self,
        error: &OutputError,
        failed_attempts: u32,
        guaranteed: bool,
    ) -> RetryDecision {
        if !error.is_retryable() {
            return RetryDecision::GiveUp {
                reason: format!("{} error is not retryable", ErrorCategory::from(error)),
            };
        }

        self.retry_policy.decide(failed_attempts, guaranteed)
    }

    /// One POST of the payload to `address`.
    async fn attempt(
        &self,
        task_id: u64,
        event: &Event,
        address: &str,
        body: Bytes,
        attempt_number: u32,
    ) -> Result<DeliveryResponse> {
        let path = self.template.resolve(event)?;
        let url = format!("http://{address}{path}");

        let request = DeliveryRequest {
            task_id,
            url: url.clone(),
            body,
            content_type: self.config.content_type.clone(),
            attempt_number,
        };

        let response = self.client.deliver(request).await?;
        if response.is_success {
            Ok(response)
        } else {
            Err(OutputError::unexpected_status(response.status_code, url))
        }
    }

    /// Records the outcome and delivers the terminal signal for `task`.
    ///
    /// A producer woken by the signal observes the updated counters.
    async fn finish(&self, task: SendTask, outcome: TaskOutcome) -> TaskOutcome {
        {
            let mut stats = self.stats.write().await;
            match outcome {
                TaskOutcome::Delivered => stats.events_delivered += 1,
                TaskOutcome::Dropped => stats.events_dropped += 1,
                TaskOutcome::Canceled => stats.events_canceled += 1,
            }
        }

        match outcome {
            TaskOutcome::Delivered | TaskOutcome::Dropped => task.complete(),
            TaskOutcome::Canceled => task.cancel(),
        }

        outcome
    }

    /// Cancels every task still waiting in the queue.
    async fn cancel_queued(&self) {
        let mut canceled = 0u64;
        while let Ok(task) = self.queue.try_recv() {
            task.cancel();
            canceled += 1;
        }

        if canceled > 0 {
            self.stats.write().await.events_canceled += canceled;
            info!(worker_id = self.id, canceled, "canceled queued events on shutdown");
        }
    }
}
