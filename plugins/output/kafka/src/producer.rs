use std::sync::Arc;
use std::time::Duration;

use kafka_output_api::{Ack, BrokerClient, BrokerConnector, PluginError};
use rdkafka::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use tokio::runtime::Runtime;

/// Metadata requests used to prove the cluster answers.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds rdkafka producers against the configured bootstrap brokers.
pub struct KafkaConnector {
    publish_timeout: Duration,
    runtime: Arc<Runtime>,
}

impl KafkaConnector {
    pub fn new(publish_timeout: Duration) -> Result<Self, PluginError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("out-kafka")
            .enable_time()
            .build()
            .map_err(|e| PluginError::io(format!("failed to start delivery runtime: {e}")))?;
        Ok(Self {
            publish_timeout,
            runtime: Arc::new(runtime),
        })
    }
}

impl BrokerConnector for KafkaConnector {
    fn connect(&self, endpoints: &[String]) -> Result<Arc<dyn BrokerClient>, PluginError> {
        if endpoints.is_empty() {
            return Err(PluginError::config("no broker endpoints"));
        }
        let bootstrap = endpoints.join(",");

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &bootstrap)
            .set("message.timeout.ms", self.publish_timeout.as_millis().to_string())
            .create()
            .map_err(|e| PluginError::io(format!("create producer for {bootstrap}: {e}")))?;

        // Producer creation is lazy; only a metadata round trip shows a live cluster.
        producer
            .client()
            .fetch_metadata(None, PROBE_TIMEOUT)
            .map_err(|e| PluginError::io(format!("{bootstrap}: {e}")))?;

        tracing::debug!(brokers = %bootstrap, "kafka producer created");
        Ok(Arc::new(KafkaClient {
            producer,
            runtime: self.runtime.clone(),
            publish_timeout: self.publish_timeout,
        }))
    }
}

pub struct KafkaClient {
    producer: FutureProducer,
    runtime: Arc<Runtime>,
    publish_timeout: Duration,
}

impl BrokerClient for KafkaClient {
    fn publish(&self, topic: &str, key: Option<&[u8]>, value: &[u8]) -> Result<Ack, PluginError> {
        let mut record = FutureRecord::<[u8], [u8]>::to(topic).payload(value);
        if let Some(key) = key {
            record = record.key(key);
        }

        let delivery = self
            .runtime
            .block_on(self.producer.send(record, Timeout::After(self.publish_timeout)));

        match delivery {
            Ok((partition, offset)) => {
                tracing::trace!(topic, partition, offset, "record delivered");
                Ok(Ack { partition, offset })
            }
            Err((e, _)) => Err(PluginError::io(format!("deliver to '{topic}': {e}"))),
        }
    }

    fn is_alive(&self) -> bool {
        self.producer.client().fetch_metadata(None, PROBE_TIMEOUT).is_ok()
    }
}
