use chrono::{DateTime, SecondsFormat, Utc};
use rmpv::Value;

use crate::error::PluginError;

/// MessagePack ext type of the Fluent Bit `EventTime` timestamp.
pub const EVENT_TIME_EXT: i8 = 0;

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Event occurrence time: seconds since Unix epoch + sub-second nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    secs: i64,
    nanos: u32,
}

impl Timestamp {
    pub fn new(secs: i64, nanos: u32) -> Result<Self, PluginError> {
        if nanos >= NANOS_PER_SEC {
            return Err(PluginError::format(format!(
                "timestamp nanoseconds out of range: {nanos}"
            )));
        }
        Ok(Self { secs, nanos })
    }

    pub fn from_secs(secs: i64) -> Self {
        Self { secs, nanos: 0 }
    }

    /// Read a timestamp from its MessagePack representation.
    ///
    /// Accepts the `EventTime` ext (type 0, 8 bytes: big-endian u32 seconds
    /// followed by big-endian u32 nanoseconds), integer seconds and float seconds.
    pub fn from_msgpack(value: &Value) -> Result<Self, PluginError> {
        match value {
            Value::Ext(EVENT_TIME_EXT, data) => {
                let bytes: [u8; 8] = data.as_slice().try_into().map_err(|_| {
                    PluginError::format(format!(
                        "EventTime ext must be 8 bytes, got {}",
                        data.len()
                    ))
                })?;
                let secs = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                let nanos = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
                Self::new(i64::from(secs), nanos)
            }
            Value::Integer(n) => n
                .as_i64()
                .map(Self::from_secs)
                .ok_or_else(|| PluginError::format(format!("timestamp out of range: {n}"))),
            Value::F32(f) => Self::from_float(f64::from(*f)),
            Value::F64(f) => Self::from_float(*f),
            other => Err(PluginError::format(format!(
                "unsupported timestamp encoding: {other}"
            ))),
        }
    }

    fn from_float(f: f64) -> Result<Self, PluginError> {
        if !f.is_finite() || f < i64::MIN as f64 || f > i64::MAX as f64 {
            return Err(PluginError::format(format!("timestamp out of range: {f}")));
        }
        let whole = f.floor();
        let nanos = ((f - whole) * f64::from(NANOS_PER_SEC)).round() as u32;
        if nanos >= NANOS_PER_SEC {
            return Ok(Self { secs: whole as i64 + 1, nanos: 0 });
        }
        Ok(Self { secs: whole as i64, nanos })
    }

    /// Encode as the `EventTime` ext value.
    ///
    /// The wire layout only carries unsigned 32-bit seconds.
    pub fn to_event_time(&self) -> Result<Value, PluginError> {
        let secs = u32::try_from(self.secs).map_err(|_| {
            PluginError::format(format!(
                "timestamp {} does not fit EventTime seconds",
                self.secs
            ))
        })?;
        let mut data = Vec::with_capacity(8);
        data.extend_from_slice(&secs.to_be_bytes());
        data.extend_from_slice(&self.nanos.to_be_bytes());
        Ok(Value::Ext(EVENT_TIME_EXT, data))
    }

    /// RFC 3339 in UTC, sub-second digits only as many as needed.
    pub fn to_rfc3339(&self) -> Result<String, PluginError> {
        let dt = DateTime::<Utc>::from_timestamp(self.secs, self.nanos).ok_or_else(|| {
            PluginError::format(format!("timestamp {} out of calendar range", self.secs))
        })?;
        Ok(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn parse_rfc3339(s: &str) -> Result<Self, PluginError> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| PluginError::format(format!("invalid RFC 3339 time '{s}': {e}")))?;
        Self::new(dt.timestamp(), dt.timestamp_subsec_nanos())
    }
}

/// One log entry: key/value pairs in input order.
///
/// Keys are arbitrary MessagePack values, normally strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(Vec<(Value, Value)>);

impl Record {
    pub fn new(entries: Vec<(Value, Value)>) -> Self {
        Self(entries)
    }

    pub fn from_msgpack(value: Value) -> Result<Self, PluginError> {
        match value {
            Value::Map(entries) => Ok(Self(entries)),
            other => Err(PluginError::format(format!(
                "record must be a map, got {other}"
            ))),
        }
    }

    pub fn entries(&self) -> &[(Value, Value)] {
        &self.0
    }

}

/// A record paired with its event time. The unit the encoder serializes.
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampedRecord {
    pub timestamp: Timestamp,
    pub record: Record,
}

impl TimestampedRecord {
    pub fn new(timestamp: Timestamp, record: Record) -> Self {
        Self { timestamp, record }
    }
}
