//! Fluent Bit output plugin publishing records to Kafka.
//!
//! Built as a `cdylib` exporting the `FLBPlugin*` proxy symbols. Configuration
//! comes from `KAFKA_*` environment variables.

pub mod producer;

use std::sync::Arc;

use kafka_output_engine::{EngineError, KafkaOutput, OutputConfig};

pub use producer::{KafkaClient, KafkaConnector};

/// Build a plugin backed by rdkafka from an already validated config.
pub fn build(config: OutputConfig) -> Result<KafkaOutput, EngineError> {
    let connector = KafkaConnector::new(config.publish_timeout())?;
    KafkaOutput::new(config, Arc::new(connector))
}

fn create_plugin() -> Result<KafkaOutput, EngineError> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .try_init();

    let config = OutputConfig::from_env().map_err(|e| e.with_context("KAFKA_* environment"))?;
    build(config)
}

kafka_output_api::flb_output_plugin!(KafkaOutput, create_plugin);
