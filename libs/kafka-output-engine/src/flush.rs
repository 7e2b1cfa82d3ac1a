use std::sync::Arc;

use crate::config::OutputFormat;
use crate::connection::ConnectionManager;
use crate::decoder::BatchDecoder;
use crate::encoder::encode;
use crate::error::EngineError;

/// Per-batch counters, logged by the caller.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub decoded: usize,
    pub published: usize,
    pub bytes: usize,
}

/// Decode → encode → publish for one host batch.
///
/// Reentrant: concurrent flushes share the session held by the
/// [`ConnectionManager`] and never mutate it except through a reconnect.
pub struct FlushOrchestrator {
    connections: Arc<ConnectionManager>,
    topic: String,
    format: OutputFormat,
    reconnect_on_failure: bool,
}

impl FlushOrchestrator {
    pub fn new(
        connections: Arc<ConnectionManager>,
        topic: impl Into<String>,
        format: OutputFormat,
        reconnect_on_failure: bool,
    ) -> Self {
        Self {
            connections,
            topic: topic.into(),
            format,
            reconnect_on_failure,
        }
    }

    /// Publish every decodable record of `batch`, in order, without a key.
    ///
    /// Stops at the first encode or publish failure. Records published before
    /// the failure stay published. `tag` is only used for logging.
    pub fn flush(&self, batch: &[u8], tag: &str) -> Result<FlushReport, EngineError> {
        let mut report = FlushReport::default();
        let mut records = BatchDecoder::new(batch).peekable();
        if records.peek().is_none() {
            return Ok(report);
        }
        let broker = self.connections.current().ok_or(EngineError::NotConnected)?;

        for entry in records {
            report.decoded += 1;

            let payload = encode(self.format, &entry).map_err(|e| {
                tracing::error!(tag, format = %self.format, error = %e, "failed to encode record");
                EngineError::Encode(e)
            })?;

            if let Err(e) = broker.publish(&self.topic, None, &payload) {
                tracing::error!(tag, topic = %self.topic, error = %e, "failed to publish record");
                if self.reconnect_on_failure {
                    self.connections.reconnect_if_dead();
                }
                return Err(EngineError::Publish { topic: self.topic.clone(), source: e });
            }
            report.published += 1;
            report.bytes += payload.len();
        }

        Ok(report)
    }
}
