//! Counters describing output activity.

use std::sync::Arc;

use tokio::sync::RwLock;

/// Statistics for output monitoring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputStats {
    /// Number of workers currently running.
    pub active_workers: usize,
    /// Events accepted into the queue.
    pub events_submitted: u64,
    /// Events acknowledged with status 200.
    pub events_delivered: u64,
    /// Events given up on after exhausting retries or failing to serialize.
    pub events_dropped: u64,
    /// Events abandoned because the output shut down.
    pub events_canceled: u64,
    /// HTTP attempts started.
    pub send_attempts: u64,
    /// HTTP attempts that failed.
    pub send_failures: u64,
    /// Payload bytes sent in successful requests.
    pub bytes_written: u64,
}

impl OutputStats {
    /// Events that reached a terminal signal.
    pub fn events_finished(&self) -> u64 {
        self.events_delivered + self.events_dropped + self.events_canceled
    }
}

/// Read access to the counters that outlives the output.
///
/// Workers keep updating the counters while a graceful shutdown joins them,
/// so a snapshot taken through the handle afterwards includes events
/// finished during shutdown.
#[derive(Debug, Clone)]
pub struct StatsHandle(Arc<RwLock<OutputStats>>);

impl StatsHandle {
    pub(crate) fn new(stats: Arc<RwLock<OutputStats>>) -> Self {
        Self(stats)
    }

    /// Returns a snapshot of the counters.
    pub async fn snapshot(&self) -> OutputStats {
        self.0.read().await.clone()
    }
}
