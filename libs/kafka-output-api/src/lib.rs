pub mod broker;
pub mod error;
pub mod ffi;
pub mod lifecycle;
pub mod record;

pub use broker::{Ack, BrokerClient, BrokerConnector};
pub use error::{ErrorKind, PluginError};
pub use lifecycle::{FlbStatus, OutputPlugin, PluginInfo};
pub use record::{Record, Timestamp, TimestampedRecord};

#[doc(hidden)]
pub use tracing;
