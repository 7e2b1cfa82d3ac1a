use std::sync::Arc;

use kafka_output_api::broker::BrokerConnector;
use kafka_output_api::lifecycle::{FlbStatus, OutputPlugin, PluginInfo};

use crate::backoff::{Clock, SystemClock};
use crate::config::OutputConfig;
use crate::connection::ConnectionManager;
use crate::connector::{Connector, ConnectorState};
use crate::error::EngineError;
use crate::flush::FlushOrchestrator;

/// Kafka output: one broker session shared by every flush.
pub struct KafkaOutput {
    config: OutputConfig,
    connector: Connector,
    orchestrator: FlushOrchestrator,
}

impl KafkaOutput {
    pub fn new(config: OutputConfig, connector: Arc<dyn BrokerConnector>) -> Result<Self, EngineError> {
        Self::with_clock(config, connector, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: OutputConfig,
        connector: Arc<dyn BrokerConnector>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let connections = Arc::new(ConnectionManager::new(connector, config.brokers.clone()));
        let startup = Connector::new(
            connections.clone(),
            clock,
            config.connect_timeout(),
            config.retry_interval(),
        );
        let orchestrator = FlushOrchestrator::new(
            connections,
            config.topic.clone(),
            config.format,
            config.reconnect_on_failure,
        );

        Ok(Self {
            config,
            connector: startup,
            orchestrator,
        })
    }

    pub fn state(&self) -> ConnectorState {
        self.connector.state()
    }
}

impl OutputPlugin for KafkaOutput {
    fn register() -> PluginInfo {
        PluginInfo {
            name: c"out_kafka",
            description: c"Publish records to a Kafka topic",
        }
    }

    fn init(&self) -> FlbStatus {
        match self.connector.start() {
            Ok(()) => {
                tracing::info!(
                    topic = %self.config.topic,
                    format = %self.config.format,
                    "kafka output initialized"
                );
                FlbStatus::Ok
            }
            Err(e) => {
                tracing::error!(error = %e, "kafka output failed to initialize");
                FlbStatus::Error
            }
        }
    }

    fn flush(&self, data: &[u8], tag: &str) -> FlbStatus {
        match self.orchestrator.flush(data, tag) {
            Ok(report) => {
                tracing::debug!(
                    tag,
                    topic = %self.config.topic,
                    records = report.published,
                    bytes = report.bytes,
                    "batch flushed"
                );
                FlbStatus::Ok
            }
            Err(e) => {
                tracing::error!(tag, error = %e, "flush failed");
                FlbStatus::Error
            }
        }
    }

    fn exit(&self) -> i32 {
        self.connector.stop();
        tracing::info!("kafka output stopped");
        0
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rmpv::Value;

    use super::*;
    use crate::config::OutputFormat;
    use crate::test_support::{ManualClock, StubConnector};

    fn output(failures: u32, timeout_secs: u64) -> (Arc<StubConnector>, Arc<ManualClock>, KafkaOutput) {
        let stub = Arc::new(StubConnector::new(failures));
        let clock = Arc::new(ManualClock::new());
        let config = OutputConfig {
            brokers: vec!["broker:9092".to_string()],
            connect_timeout_secs: timeout_secs,
            ..OutputConfig::default()
        };
        let output = KafkaOutput::with_clock(config, stub.clone(), clock.clone()).unwrap();
        (stub, clock, output)
    }

    fn one_record() -> Vec<u8> {
        let mut buf = Vec::new();
        let entry = Value::Array(vec![
            Value::from(1_700_000_000),
            Value::Map(vec![(Value::from("msg"), Value::from("hello"))]),
        ]);
        rmpv::encode::write_value(&mut buf, &entry).unwrap();
        buf
    }

    #[test]
    fn register_announces_out_kafka() {
        let info = KafkaOutput::register();
        assert_eq!(info.name.to_str().unwrap(), "out_kafka");
        assert!(!info.description.is_empty());
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let config = OutputConfig {
            format: OutputFormat::RawString,
            ..OutputConfig::default()
        };
        let err = KafkaOutput::new(config, Arc::new(StubConnector::new(0))).err().unwrap();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn oversized_connect_timeout_is_rejected_up_front() {
        let config = OutputConfig {
            connect_timeout_secs: u64::MAX,
            ..OutputConfig::default()
        };
        let err = KafkaOutput::new(config, Arc::new(StubConnector::new(0))).err().unwrap();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn init_ok_after_retries() {
        let (stub, clock, output) = output(2, 90);
        assert_eq!(output.init(), FlbStatus::Ok);
        assert_eq!(output.state(), ConnectorState::Ready);
        assert_eq!(stub.attempts(), 3);
        assert_eq!(clock.elapsed(), Duration::from_secs(60));
    }

    #[test]
    fn init_error_when_broker_never_answers() {
        let (_, _, output) = output(u32::MAX, 60);
        assert_eq!(output.init(), FlbStatus::Error);
        assert_eq!(output.state(), ConnectorState::Failed);
    }

    #[test]
    fn flush_before_init_is_error() {
        let (stub, _, output) = output(0, 60);
        assert_eq!(output.flush(&one_record(), "app"), FlbStatus::Error);
        assert!(stub.client.published().is_empty());
    }

    #[test]
    fn flush_publishes_to_configured_topic() {
        let (stub, _, output) = output(0, 60);
        assert!(output.init().is_ok());
        assert_eq!(output.flush(&one_record(), "app"), FlbStatus::Ok);

        let published = stub.client.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].topic, "logs_default");
        assert!(!published[0].value.is_empty());
    }

    #[test]
    fn records_before_an_unreadable_entry_are_published() {
        let (stub, _, output) = output(0, 60);
        assert!(output.init().is_ok());

        let mut batch = one_record();
        batch.extend([0x92, 0x01]);
        assert_eq!(output.flush(&batch, "app"), FlbStatus::Ok);
        assert_eq!(stub.client.published().len(), 1);
    }

    #[test]
    fn exit_drops_session_and_returns_zero() {
        let (_, _, output) = output(0, 60);
        output.init();
        assert_eq!(output.exit(), 0);
        assert_eq!(output.state(), ConnectorState::Uninitialized);
        assert_eq!(output.flush(&one_record(), "app"), FlbStatus::Error);
    }

    #[test]
    fn init_after_exit_connects_again() {
        let (stub, _, output) = output(0, 60);
        assert!(output.init().is_ok());
        output.exit();

        assert!(output.init().is_ok());
        assert_eq!(stub.attempts(), 2);
        assert_eq!(output.flush(&one_record(), "app"), FlbStatus::Ok);
    }
}
