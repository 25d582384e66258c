//! Integration tests for event access and completion signals.
//!
//! Exercises the public surface the output crate builds on: parsing events
//! from JSON, walking nested fields, and consuming signalers.

use std::sync::{Arc, Mutex};

use conduit_core::{oneshot_signal, signal_fn, Event, FieldError, NoopSignaler, Signal, Signaler};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

#[test]
fn event_round_trips_through_wire_bytes_in_field_order() {
    let event = Event::from_value(json!({"z": 1, "a": {"topic": "orders"}, "m": [1, 2]})).unwrap();

    let bytes = event.to_json_bytes().unwrap();

    assert_eq!(String::from_utf8(bytes).unwrap(), r#"{"z":1,"a":{"topic":"orders"},"m":[1,2]}"#);
    assert_eq!(event.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(), ["z", "a", "m"]);
}

#[test]
fn non_object_json_is_rejected() {
    for value in [json!(null), json!(3), json!("text"), json!([1])] {
        let error = Event::try_from(value).unwrap_err();
        assert!(matches!(error, FieldError::TypeMismatch { expected: "object", .. }));
    }
}

#[test]
fn nested_lookup_reports_failing_path() {
    let event = Event::from_value(json!({"fields": {"meta": {"topic": 7}}})).unwrap();

    assert_eq!(event.lookup(&["fields", "meta", "topic"]), Ok(&json!(7)));
    assert_eq!(
        event.get_str(&["fields", "meta", "topic"]),
        Err(FieldError::type_mismatch("fields.meta.topic", "string", "number"))
    );
    assert_eq!(
        event.lookup(&["fields", "meta", "name"]),
        Err(FieldError::missing("fields.meta.name"))
    );
    assert_eq!(
        event.lookup(&["fields", "meta", "topic", "deeper"]),
        Err(FieldError::type_mismatch("fields.meta.topic", "object", "number"))
    );
    assert_eq!(event.get_object(&["fields"]).map(|m| m.len()), Ok(1));
}

#[test]
fn display_renders_compact_json() {
    let event = Event::from_value(json!({"a": 1})).unwrap();
    assert_eq!(event.to_string(), r#"{"a":1}"#);
}

#[tokio::test]
async fn oneshot_signal_reaches_waiting_producer() {
    let (signaler, receiver) = oneshot_signal();

    tokio::spawn(async move { signaler.signal(Signal::Completed) });

    assert_eq!(receiver.await.unwrap(), Signal::Completed);
}

#[test]
fn signaling_after_producer_left_is_harmless() {
    let (signaler, receiver) = oneshot_signal();
    drop(receiver);

    signaler.signal(Signal::Canceled);
    Box::new(NoopSignaler).signal(Signal::Completed);
}

#[test]
fn closure_signaler_runs_once() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let signaler: Box<dyn Signaler> = Box::new(signal_fn(move |s| sink.lock().unwrap().push(s)));

    signaler.signal(Signal::Canceled);

    assert_eq!(*seen.lock().unwrap(), vec![Signal::Canceled]);
    assert!(!Signal::Canceled.is_completed());
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-z]{0,8}".prop_map(Value::String),
    ]
}

proptest! {
    /// A value placed at any nested path is found again at that path.
    #[test]
    fn lookup_finds_value_at_built_path(
        path in prop::collection::vec("[a-z]{1,6}", 1..5),
        leaf in scalar(),
    ) {
        let mut value = leaf.clone();
        for segment in path.iter().rev() {
            let mut object = Map::new();
            object.insert(segment.clone(), value);
            value = Value::Object(object);
        }
        let event = Event::from_value(value).unwrap();
        let segments: Vec<&str> = path.iter().map(String::as_str).collect();

        prop_assert_eq!(event.lookup(&segments), Ok(&leaf));
    }
}
