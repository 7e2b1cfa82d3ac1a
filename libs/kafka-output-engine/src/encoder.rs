use base64::Engine;
use rmpv::Value;
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use kafka_output_api::error::PluginError;
use kafka_output_api::record::{EVENT_TIME_EXT, Timestamp, TimestampedRecord};

use crate::config::OutputFormat;

/// Serialize one record into the message value for the broker.
pub fn encode(format: OutputFormat, entry: &TimestampedRecord) -> Result<Vec<u8>, PluginError> {
    match format {
        OutputFormat::Structured => encode_structured(entry),
        OutputFormat::CompactBinary => encode_compact_binary(&entry.timestamp),
        OutputFormat::RawString => Err(PluginError::config(
            "output format 'raw-string' is not implemented",
        )),
    }
}

/// JSON envelope: `{"time": "<RFC 3339>", "record": {...}}`.
fn encode_structured(entry: &TimestampedRecord) -> Result<Vec<u8>, PluginError> {
    let envelope = Envelope {
        time: entry.timestamp.to_rfc3339()?,
        record: JsonMap(entry.record.entries()),
    };
    Ok(serde_json::to_vec(&envelope)?)
}

/// Timestamp only, as a MessagePack `EventTime` ext. The record is dropped.
fn encode_compact_binary(timestamp: &Timestamp) -> Result<Vec<u8>, PluginError> {
    let mut buf = Vec::with_capacity(10);
    rmpv::encode::write_value(&mut buf, &timestamp.to_event_time()?)
        .map_err(|e| PluginError::format(format!("msgpack encode: {e}")))?;
    Ok(buf)
}

#[derive(Serialize)]
struct Envelope<'a> {
    time: String,
    record: JsonMap<'a>,
}

struct JsonMap<'a>(&'a [(Value, Value)]);

struct JsonKey<'a>(&'a Value);

struct JsonValue<'a>(&'a Value);

impl Serialize for JsonMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in self.0 {
            map.serialize_entry(&JsonKey(k), &JsonValue(v))?;
        }
        map.end()
    }
}

impl Serialize for JsonKey<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::String(s) => match s.as_str() {
                Some(s) => serializer.serialize_str(s),
                None => Err(S::Error::custom("map key is not valid UTF-8")),
            },
            Value::Binary(b) => match std::str::from_utf8(b) {
                Ok(s) => serializer.serialize_str(s),
                Err(_) => Err(S::Error::custom("binary map key is not valid UTF-8")),
            },
            Value::Integer(n) => serializer.serialize_str(&n.to_string()),
            Value::Boolean(b) => serializer.serialize_str(if *b { "true" } else { "false" }),
            other => Err(S::Error::custom(format!("unsupported map key type: {other}"))),
        }
    }
}

impl Serialize for JsonValue<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Nil => serializer.serialize_unit(),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Integer(n) => {
                if let Some(i) = n.as_i64() {
                    serializer.serialize_i64(i)
                } else if let Some(u) = n.as_u64() {
                    serializer.serialize_u64(u)
                } else {
                    Err(S::Error::custom(format!("integer out of range: {n}")))
                }
            }
            // JSON has no NaN or infinity; serde_json would write `null`.
            Value::F32(f) if !f.is_finite() => Err(S::Error::custom(format!("non-finite float: {f}"))),
            Value::F64(f) if !f.is_finite() => Err(S::Error::custom(format!("non-finite float: {f}"))),
            Value::F32(f) => serializer.serialize_f32(*f),
            Value::F64(f) => serializer.serialize_f64(*f),
            Value::String(s) => match s.as_str() {
                Some(s) => serializer.serialize_str(s),
                None => Err(S::Error::custom("string value is not valid UTF-8")),
            },
            Value::Binary(b) => {
                serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(b))
            }
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&JsonValue(item))?;
                }
                seq.end()
            }
            Value::Map(entries) => JsonMap(entries).serialize(serializer),
            Value::Ext(EVENT_TIME_EXT, _) => {
                let time = Timestamp::from_msgpack(self.0)
                    .and_then(|ts| ts.to_rfc3339())
                    .map_err(|e| S::Error::custom(e.message()))?;
                serializer.serialize_str(&time)
            }
            Value::Ext(ext_type, _) => Err(S::Error::custom(format!(
                "unsupported nested type: msgpack ext type {ext_type}"
            ))),
        }
    }
}
