#![allow(dead_code)]

use std::sync::Arc;

use kafka_output_engine::test_support::{ManualClock, StubConnector};
use kafka_output_engine::{KafkaOutput, OutputConfig, OutputFormat};
use rmpv::Value;

pub struct Harness {
    pub connector: Arc<StubConnector>,
    pub clock: Arc<ManualClock>,
    pub output: KafkaOutput,
}

pub fn harness(format: OutputFormat, failures: u32, timeout_secs: u64) -> Harness {
    let connector = Arc::new(StubConnector::new(failures));
    let clock = Arc::new(ManualClock::new());
    let config = OutputConfig {
        brokers: vec!["broker:9092".to_string()],
        connect_timeout_secs: timeout_secs,
        retry_interval_secs: 30,
        format,
        ..OutputConfig::default()
    };
    let output = KafkaOutput::with_clock(config, connector.clone(), clock.clone()).unwrap();
    Harness { connector, clock, output }
}

/// Encode `[ts, record]` entries back to back, the way the host hands them over.
pub fn batch(entries: &[(i64, Vec<(&str, Value)>)]) -> Vec<u8> {
    let mut buf = Vec::new();
    for (ts, fields) in entries {
        let record = fields
            .iter()
            .map(|(k, v)| (Value::from(*k), v.clone()))
            .collect();
        let entry = Value::Array(vec![Value::from(*ts), Value::Map(record)]);
        rmpv::encode::write_value(&mut buf, &entry).unwrap();
    }
    buf
}
