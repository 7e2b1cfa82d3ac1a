use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::EngineError;

pub const DEFAULT_BROKER: &str = "kafka-0.kafka.default.svc.cluster.local:9092";
pub const DEFAULT_TOPIC: &str = "logs_default";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub const MAX_CONNECT_TIMEOUT_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_PUBLISH_TIMEOUT_MS: u64 = 30_000;

/// Wire format of the message value published to the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// JSON envelope `{"time": ..., "record": {...}}`.
    #[default]
    #[serde(alias = "json")]
    Structured,
    /// MessagePack, timestamp only. The record body is not carried.
    #[serde(alias = "msgpack")]
    CompactBinary,
    /// Recognized but not implemented; rejected by validation.
    #[serde(alias = "string")]
    RawString,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Structured => f.write_str("structured"),
            OutputFormat::CompactBinary => f.write_str("compact-binary"),
            OutputFormat::RawString => f.write_str("raw-string"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structured" | "json" => Ok(OutputFormat::Structured),
            "compact-binary" | "msgpack" => Ok(OutputFormat::CompactBinary),
            "raw-string" | "string" => Ok(OutputFormat::RawString),
            other => Err(EngineError::Config(format!(
                "unknown output format '{other}' (expected structured, compact-binary or raw-string)"
            ))),
        }
    }
}

/// Delivery configuration. Assembled once at startup, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Bootstrap broker endpoints, `host:port`.
    pub brokers: Vec<String>,
    /// Target topic. Static for all batches regardless of tag.
    pub topic: String,
    /// Startup connection window. 0 means the 5 minute default.
    pub connect_timeout_secs: u64,
    /// Pause between failed connection attempts.
    pub retry_interval_secs: u64,
    pub format: OutputFormat,
    /// Try one reconnect after a publish failure when the broker stops
    /// answering liveness probes.
    pub reconnect_on_failure: bool,
    /// Upper bound for a single delivery, enforced by the broker client.
    pub publish_timeout_ms: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            brokers: vec![DEFAULT_BROKER.to_string()],
            topic: DEFAULT_TOPIC.to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT.as_secs(),
            retry_interval_secs: DEFAULT_RETRY_INTERVAL_SECS,
            format: OutputFormat::default(),
            reconnect_on_failure: true,
            publish_timeout_ms: DEFAULT_PUBLISH_TIMEOUT_MS,
        }
    }
}

impl OutputConfig {
    /// Parse and validate configuration from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EngineError::Config(format!("invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Create configuration from `KAFKA_*` environment variables.
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from a key lookup, starting from defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, EngineError> {
        let mut config = Self::default();

        if let Some(brokers) = lookup("KAFKA_BROKERS") {
            config.brokers = brokers
                .split(',')
                .map(str::trim)
                .filter(|b| !b.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(topic) = lookup("KAFKA_TOPIC") {
            config.topic = topic.trim().to_string();
        }
        if let Some(v) = lookup("KAFKA_CONNECT_TIMEOUT_SECS") {
            config.connect_timeout_secs = parse_number("KAFKA_CONNECT_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("KAFKA_RETRY_INTERVAL_SECS") {
            config.retry_interval_secs = parse_number("KAFKA_RETRY_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = lookup("KAFKA_FORMAT") {
            config.format = v.parse()?;
        }
        if let Some(v) = lookup("KAFKA_RECONNECT") {
            config.reconnect_on_failure = parse_bool("KAFKA_RECONNECT", &v)?;
        }
        if let Some(v) = lookup("KAFKA_PUBLISH_TIMEOUT_MS") {
            config.publish_timeout_ms = parse_number("KAFKA_PUBLISH_TIMEOUT_MS", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.brokers.is_empty() {
            return Err(EngineError::Config("broker list cannot be empty".to_string()));
        }
        for broker in &self.brokers {
            validate_endpoint(broker)?;
        }

        if self.topic.trim().is_empty() {
            return Err(EngineError::Config("topic cannot be empty".to_string()));
        }

        if self.format == OutputFormat::RawString {
            return Err(EngineError::Config(
                "output format 'raw-string' is not implemented".to_string(),
            ));
        }

        if self.connect_timeout_secs > MAX_CONNECT_TIMEOUT_SECS {
            return Err(EngineError::Config(format!(
                "connect timeout must be at most {MAX_CONNECT_TIMEOUT_SECS} seconds"
            )));
        }

        if self.retry_interval_secs == 0 {
            return Err(EngineError::Config(
                "retry interval must be greater than 0".to_string(),
            ));
        }

        if self.publish_timeout_ms == 0 {
            return Err(EngineError::Config(
                "publish timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Connection window for startup, 0 falls back to the default.
    pub fn connect_timeout(&self) -> Duration {
        match self.connect_timeout_secs {
            0 => DEFAULT_CONNECT_TIMEOUT,
            secs => Duration::from_secs(secs),
        }
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64, EngineError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| EngineError::Config(format!("{key}: invalid number '{value}': {e}")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, EngineError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(EngineError::Config(format!(
            "{key}: invalid boolean '{value}' (expected true or false)"
        ))),
    }
}

fn validate_endpoint(endpoint: &str) -> Result<(), EngineError> {
    let (host, port) = endpoint
        .rsplit_once(':')
        .ok_or_else(|| EngineError::Config(format!("broker '{endpoint}' must be host:port")))?;
    if host.is_empty() {
        return Err(EngineError::Config(format!("broker '{endpoint}' has an empty host")));
    }
    port.parse::<u16>()
        .map_err(|_| EngineError::Config(format!("broker '{endpoint}' has an invalid port")))?;
    Ok(())
}
