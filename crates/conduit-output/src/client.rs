//! HTTP client for posting events to a collector.
//!
//! Each worker owns one [`DeliveryClient`], so connection pools are never
//! shared between workers. Connect and request timeouts are enforced per
//! attempt by the underlying client. Only the status code of a response is
//! inspected; the body is discarded.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{info_span, Instrument};

use crate::error::{OutputError, Result};

/// Configuration for the delivery client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Maximum time to establish a connection.
    pub connect_timeout: Duration,
    /// Maximum time for the whole request.
    pub request_timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(crate::DEFAULT_CONNECT_TIMEOUT_MS),
            request_timeout: Duration::from_secs(crate::DEFAULT_REQUEST_TIMEOUT_SECONDS),
            user_agent: concat!("conduit/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// HTTP client used by one worker.
#[derive(Debug, Clone)]
pub struct DeliveryClient {
    client: reqwest::Client,
    config: ClientConfig,
}

/// A single POST of an event payload.
#[derive(Debug, Clone)]
pub struct DeliveryRequest {
    /// Task the payload belongs to.
    pub task_id: u64,
    /// Full destination URL.
    pub url: String,
    /// Serialized event.
    pub body: Bytes,
    /// Value of the `Content-Type` header.
    pub content_type: String,
    /// Attempt number for this task (1-based).
    pub attempt_number: u32,
}

/// Outcome of a request that reached the collector.
#[derive(Debug, Clone)]
pub struct DeliveryResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Total duration of the request.
    pub duration: Duration,
    /// Whether the collector accepted the event (status 200).
    pub is_success: bool,
}

impl DeliveryClient {
    /// Creates a new delivery client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `OutputError::ConfigurationError` if the HTTP client cannot
    /// be configured with the provided settings.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .tcp_keepalive(Duration::from_secs(30))
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| OutputError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Creates a new delivery client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns `OutputError::ConfigurationError` if the HTTP client cannot
    /// be built.
    pub fn with_defaults() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    /// Posts the payload and reports the collector's status code.
    ///
    /// A response with any status is returned as `Ok`; callers decide what
    /// counts as success.
    ///
    /// # Errors
    ///
    /// - `Timeout` when the request exceeds the request timeout
    /// - `NetworkError` for connection and other transport failures
    pub async fn deliver(&self, request: DeliveryRequest) -> Result<DeliveryResponse> {
        let start_time = std::time::Instant::now();

        let span = info_span!(
            "event_delivery",
            task_id = request.task_id,
            url = %request.url,
            attempt = request.attempt_number
        );

        async move {
            tracing::trace!(bytes = request.body.len(), "posting event");

            let result = self
                .client
                .post(&request.url)
                .header(CONTENT_TYPE, &request.content_type)
                .body(request.body)
                .send()
                .await;

            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    let duration = start_time.elapsed();
                    tracing::debug!(duration_ms = duration.as_millis(), error = %e, "request failed");

                    if e.is_timeout() {
                        return Err(OutputError::timeout(self.config.request_timeout));
                    }
                    if e.is_connect() {
                        return Err(OutputError::network(format!("connection failed: {e}")));
                    }
                    return Err(OutputError::network(e.to_string()));
                },
            };

            let duration = start_time.elapsed();
            let status_code = response.status().as_u16();

            tracing::debug!(status = status_code, duration_ms = duration.as_millis(), "received response");

            Ok(DeliveryResponse { status_code, duration, is_success: status_code == 200 })
        }
        .instrument(span)
        .await
    }

    /// Client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    use super::*;

    fn create_test_request(url: String) -> DeliveryRequest {
        DeliveryRequest {
            task_id: 7,
            url,
            body: Bytes::from_static(br#"{"a":1}"#),
            content_type: "application/json".to_string(),
            attempt_number: 1,
        }
    }

    #[tokio::test]
    async fn successful_delivery() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/ingest"))
            .and(matchers::header("content-type", "application/json"))
            .and(matchers::body_string(r#"{"a":1}"#))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = DeliveryClient::with_defaults().unwrap();
        let request = create_test_request(format!("{}/ingest", mock_server.uri()));

        let response = client.deliver(request).await.unwrap();

        assert_eq!(response.status_code, 200);
        assert!(response.is_success);
    }

    #[tokio::test]
    async fn only_status_200_counts_as_success() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let client = DeliveryClient::with_defaults().unwrap();
        let request = create_test_request(format!("{}/ingest", mock_server.uri()));

        let response = client.deliver(request).await.unwrap();

        assert_eq!(response.status_code, 204);
        assert!(!response.is_success);
    }

    #[tokio::test]
    async fn server_error_is_a_response_not_an_error() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&mock_server)
            .await;

        let client = DeliveryClient::with_defaults().unwrap();
        let request = create_test_request(format!("{}/ingest", mock_server.uri()));

        let response = client.deliver(request).await.unwrap();

        assert_eq!(response.status_code, 500);
        assert!(!response.is_success);
    }

    #[tokio::test]
    async fn configured_content_type_is_sent() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::header("content-type", "application/octet-stream"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = DeliveryClient::with_defaults().unwrap();
        let mut request = create_test_request(format!("{}/ingest", mock_server.uri()));
        request.content_type = "application/octet-stream".to_string();

        let response = client.deliver(request).await.unwrap();
        assert!(response.is_success);
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&mock_server)
            .await;

        let config =
            ClientConfig { request_timeout: Duration::from_millis(100), ..Default::default() };
        let client = DeliveryClient::new(config).unwrap();
        let request = create_test_request(format!("{}/ingest", mock_server.uri()));

        let error = client.deliver(request).await.unwrap_err();

        assert!(matches!(error, OutputError::Timeout { timeout_ms: 100 }));
        assert!(error.is_retryable());
    }

    #[tokio::test]
    async fn refused_connection_is_network_error() {
        // Bind and drop a listener to get a port nobody is listening on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let client = DeliveryClient::with_defaults().unwrap();
        let request = create_test_request(format!("http://{address}/ingest"));

        let error = client.deliver(request).await.unwrap_err();

        assert!(matches!(error, OutputError::NetworkError { .. }));
    }
}
