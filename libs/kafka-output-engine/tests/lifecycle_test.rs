mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{batch, harness};
use kafka_output_api::{FlbStatus, OutputPlugin};
use kafka_output_engine::{ConnectorState, OutputFormat};
use rmpv::Value;

#[test]
fn init_succeeds_when_broker_answers_inside_window() {
    let h = harness(OutputFormat::Structured, 2, 300);
    assert_eq!(h.output.init(), FlbStatus::Ok);
    assert_eq!(h.output.state(), ConnectorState::Ready);
    assert_eq!(h.connector.attempts(), 3);
    assert_eq!(h.clock.elapsed(), Duration::from_secs(60));
}

#[test]
fn init_fails_when_window_closes_first() {
    let h = harness(OutputFormat::Structured, 2, 45);
    assert_eq!(h.output.init(), FlbStatus::Error);
    assert_eq!(h.output.state(), ConnectorState::Failed);
    assert_eq!(h.connector.attempts(), 2);
}

#[test]
fn empty_batch_is_ok_without_publish() {
    let h = harness(OutputFormat::Structured, 0, 60);
    assert!(h.output.init().is_ok());
    assert_eq!(h.output.flush(&[], "app.logs"), FlbStatus::Ok);
    assert!(h.connector.client.published().is_empty());
}

#[test]
fn structured_record_is_published_once() {
    let h = harness(OutputFormat::Structured, 0, 60);
    assert!(h.output.init().is_ok());

    let data = batch(&[(1_700_000_000, vec![("msg", Value::from("hello")), ("level", Value::from("info"))])]);
    assert_eq!(h.output.flush(&data, "app.logs"), FlbStatus::Ok);

    let published = h.connector.client.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].topic, "logs_default");
    assert!(published[0].key.is_none());
    assert!(!published[0].value.is_empty());

    let json: serde_json::Value = serde_json::from_slice(&published[0].value).unwrap();
    assert_eq!(json["time"], "2023-11-14T22:13:20Z");
    assert_eq!(json["record"]["msg"], "hello");
    assert_eq!(json["record"]["level"], "info");
}

#[test]
fn compact_binary_carries_only_the_timestamp() {
    let h = harness(OutputFormat::CompactBinary, 0, 60);
    assert!(h.output.init().is_ok());

    let data = batch(&[(1_700_000_000, vec![("a", Value::from(1))])]);
    assert_eq!(h.output.flush(&data, "app"), FlbStatus::Ok);

    let published = h.connector.client.published();
    assert_eq!(published.len(), 1);
    let decoded = rmpv::decode::read_value(&mut published[0].value.as_slice()).unwrap();
    match decoded {
        Value::Ext(0, bytes) => {
            assert_eq!(bytes.len(), 8);
            assert_eq!(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]), 1_700_000_000);
            assert_eq!(u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), 0);
        }
        other => panic!("expected event time, got {other:?}"),
    }
}

#[test]
fn every_record_of_a_batch_is_published_in_order() {
    let h = harness(OutputFormat::Structured, 0, 60);
    assert!(h.output.init().is_ok());

    let data = batch(&[
        (1, vec![("n", Value::from(1))]),
        (2, vec![("n", Value::from(2))]),
        (3, vec![("n", Value::from(3))]),
    ]);
    assert_eq!(h.output.flush(&data, "app"), FlbStatus::Ok);

    let seen: Vec<i64> = h
        .connector
        .client
        .published()
        .iter()
        .map(|p| serde_json::from_slice::<serde_json::Value>(&p.value).unwrap()["record"]["n"].as_i64().unwrap())
        .collect();
    assert_eq!(seen, vec![1, 2, 3]);
}

#[test]
fn truncated_tail_keeps_the_records_before_it() {
    let h = harness(OutputFormat::Structured, 0, 60);
    assert!(h.output.init().is_ok());

    let mut data = batch(&[(1, vec![("n", Value::from(1))])]);
    data.extend([0x92, 0x01]);
    assert_eq!(h.output.flush(&data, "app"), FlbStatus::Ok);
    assert_eq!(h.connector.client.published().len(), 1);
}

#[test]
fn concurrent_flushes_share_one_session() {
    let h = harness(OutputFormat::Structured, 0, 60);
    assert!(h.output.init().is_ok());
    let output = Arc::new(h.output);

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let output = output.clone();
            thread::spawn(move || {
                let entries = vec![(i, vec![("worker", Value::from(i))]); 5];
                output.flush(&batch(&entries), "app")
            })
        })
        .collect();

    for worker in workers {
        assert_eq!(worker.join().unwrap(), FlbStatus::Ok);
    }
    assert_eq!(h.connector.client.published().len(), 20);
    assert_eq!(h.connector.attempts(), 1);
}

#[test]
fn exit_returns_zero() {
    let h = harness(OutputFormat::Structured, 0, 60);
    assert!(h.output.init().is_ok());
    assert_eq!(h.output.exit(), 0);
}
