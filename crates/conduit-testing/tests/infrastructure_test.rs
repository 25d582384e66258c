//! Integration tests for test infrastructure components.
//!
//! Checks that fixtures, mock backends and recorders behave the way the
//! output tests rely on, without starting an output.

use std::time::Duration;

use conduit_core::{Clock, Signal, Signaler};
use conduit_testing::{orders_event, EventBuilder, MockBackend, RecordingSignaler, TestClock};
use serde_json::json;

#[tokio::test]
async fn backend_records_posted_fixture() {
    let backend = MockBackend::healthy().await;
    let body = orders_event().to_json_bytes().unwrap();

    let status = reqwest::Client::new()
        .post(format!("http://{}/ingest/orders", backend.address()))
        .body(body)
        .send()
        .await
        .unwrap()
        .status();

    assert_eq!(status.as_u16(), 200);
    backend.wait_for_requests(1, Duration::from_secs(1)).await.unwrap();
    assert_eq!(backend.received_paths().await, ["/ingest/orders"]);
    assert_eq!(
        backend.received_json().await.unwrap(),
        vec![json!({"a": 1, "fields": {"topic": "orders"}})]
    );
}

#[tokio::test]
async fn failing_backend_answers_configured_status() {
    let backend = MockBackend::failing(503).await;

    let status = reqwest::Client::new()
        .post(format!("http://{}/ingest", backend.address()))
        .send()
        .await
        .unwrap()
        .status();

    assert_eq!(status.as_u16(), 503);
    assert_eq!(backend.request_count().await, 1);
}

#[test]
fn builder_nests_fields() {
    let event = EventBuilder::new().set("id", 9).topic("audit").field("tenant", "t1").build();

    assert_eq!(
        serde_json::to_value(&event).unwrap(),
        json!({"id": 9, "fields": {"topic": "audit", "tenant": "t1"}})
    );
}

#[tokio::test]
async fn recorder_counts_by_kind() {
    let recorder = RecordingSignaler::new();
    for id in 0..3 {
        recorder.signaler(id).signal(Signal::Completed);
    }
    recorder.signaler(3).signal(Signal::Canceled);

    recorder.wait_for(4, Duration::from_millis(100)).await.unwrap();
    assert_eq!(recorder.completed(), 3);
    assert_eq!(recorder.canceled(), 1);
    assert!(recorder.assert_exactly_once(0..4).is_ok());
}

#[tokio::test]
async fn test_clock_sleep_is_virtual() {
    let clock = TestClock::new();
    let wall = std::time::Instant::now();

    clock.sleep(Duration::from_secs(3600)).await;

    assert_eq!(clock.elapsed(), Duration::from_secs(3600));
    assert!(wall.elapsed() < Duration::from_secs(1));
}
