pub mod backoff;
pub mod config;
pub mod connection;
pub mod connector;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod flush;
pub mod plugin;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use backoff::{Clock, SystemClock, retry_until_deadline};
pub use config::{OutputConfig, OutputFormat};
pub use connection::ConnectionManager;
pub use connector::{Connector, ConnectorState};
pub use error::EngineError;
pub use flush::{FlushOrchestrator, FlushReport};
pub use plugin::KafkaOutput;
