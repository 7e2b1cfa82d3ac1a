use rmpv::Value;

use kafka_output_api::error::PluginError;
use kafka_output_api::record::{Record, Timestamp, TimestampedRecord};

/// Outcome of one decode step.
#[derive(Debug)]
pub enum DecodeStep {
    Record(TimestampedRecord),
    EndOfStream,
    Error(PluginError),
}

/// Lazy decoder over one batch of concatenated MessagePack entries.
///
/// Each entry is `[timestamp, record]` or `[[timestamp, metadata], record]`.
/// The first unreadable entry ends the stream: no resynchronization is
/// attempted, later bytes are ignored.
pub struct BatchDecoder<'a> {
    remaining: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> BatchDecoder<'a> {
    pub fn new(batch: &'a [u8]) -> Self {
        Self { remaining: batch, offset: 0, failed: false }
    }

    pub fn next_step(&mut self) -> DecodeStep {
        if self.failed || self.remaining.is_empty() {
            return DecodeStep::EndOfStream;
        }

        let mut cursor = self.remaining;
        let result = rmpv::decode::read_value(&mut cursor)
            .map_err(PluginError::from)
            .and_then(decode_entry);

        match result {
            Ok(entry) => {
                self.offset += self.remaining.len() - cursor.len();
                self.remaining = cursor;
                DecodeStep::Record(entry)
            }
            Err(e) => {
                self.failed = true;
                DecodeStep::Error(e.with_context(format!("entry at byte {}", self.offset)))
            }
        }
    }
}

impl Iterator for BatchDecoder<'_> {
    type Item = TimestampedRecord;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_step() {
            DecodeStep::Record(entry) => Some(entry),
            DecodeStep::EndOfStream => None,
            DecodeStep::Error(e) => {
                tracing::warn!(error = %e, "stopping batch decode at unreadable entry");
                None
            }
        }
    }
}

fn decode_entry(value: Value) -> Result<TimestampedRecord, PluginError> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(PluginError::format(format!("entry must be an array, got {other}")));
        }
    };
    let [head, body]: [Value; 2] = items.try_into().map_err(|items: Vec<Value>| {
        PluginError::format(format!("entry must have 2 elements, got {}", items.len()))
    })?;

    // v2 event format wraps the timestamp together with a metadata map.
    let timestamp = match &head {
        Value::Array(header) => {
            let ts = header
                .first()
                .ok_or_else(|| PluginError::format("empty entry header"))?;
            Timestamp::from_msgpack(ts)?
        }
        ts => Timestamp::from_msgpack(ts)?,
    };

    Ok(TimestampedRecord::new(timestamp, Record::from_msgpack(body)?))
}
