//! Mock collector backends built on wiremock.

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use wiremock::{matchers::method, Mock, MockServer, Request, Respond, ResponseTemplate};

/// Mock collector accepting POSTed events.
pub struct MockBackend {
    server: MockServer,
}

impl MockBackend {
    /// Starts a backend on a random local port with no responses mounted.
    pub async fn start() -> Self {
        Self { server: MockServer::start().await }
    }

    /// Starts a backend answering every POST with 200.
    pub async fn healthy() -> Self {
        let backend = Self::start().await;
        backend.always_status(200).await;
        backend
    }

    /// Starts a backend answering every POST with `status`.
    pub async fn failing(status: u16) -> Self {
        let backend = Self::start().await;
        backend.always_status(status).await;
        backend
    }

    /// The `host:port` the backend listens on, as used in output addresses.
    pub fn address(&self) -> String {
        self.server.address().to_string()
    }

    /// Underlying wiremock server, for custom mocks.
    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// Answers every POST with `status`.
    pub async fn always_status(&self, status: u16) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Answers the first `failures` POSTs with `status`, then 200.
    pub async fn fail_then_succeed(&self, failures: usize, status: u16) {
        Mock::given(method("POST"))
            .respond_with(FailThenSucceed::new(failures, status))
            .mount(&self.server)
            .await;
    }

    /// Answers every POST with 200 after `delay`.
    pub async fn slow(&self, delay: Duration) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(delay))
            .mount(&self.server)
            .await;
    }

    /// Number of requests received so far.
    pub async fn request_count(&self) -> usize {
        self.server.received_requests().await.map_or(0, |requests| requests.len())
    }

    /// Paths of all received requests, in arrival order.
    pub async fn received_paths(&self) -> Vec<String> {
        self.requests().await.iter().map(|request| request.url.path().to_string()).collect()
    }

    /// Bodies of all received requests parsed as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if a body is not valid JSON.
    pub async fn received_json(&self) -> Result<Vec<Value>> {
        self.requests()
            .await
            .iter()
            .map(|request| {
                serde_json::from_slice(&request.body).context("request body is not valid JSON")
            })
            .collect()
    }

    /// Waits until at least `expected` requests have arrived.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer requests arrived within `timeout`.
    pub async fn wait_for_requests(&self, expected: usize, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let received = self.request_count().await;
            if received >= expected {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                bail!("expected {expected} requests within {timeout:?}, received {received}");
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }
}

/// Responder failing a fixed number of times before succeeding.
#[derive(Debug)]
pub struct FailThenSucceed {
    remaining_failures: AtomicUsize,
    status: u16,
}

impl FailThenSucceed {
    /// Fails the first `failures` requests with `status`.
    pub fn new(failures: usize, status: u16) -> Self {
        Self { remaining_failures: AtomicUsize::new(failures), status }
    }
}

impl Respond for FailThenSucceed {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let failed = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();

        if failed {
            ResponseTemplate::new(self.status)
        } else {
            ResponseTemplate::new(200)
        }
    }
}
