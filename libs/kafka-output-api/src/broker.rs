use std::sync::Arc;

use crate::error::PluginError;

/// Broker acknowledgement of one published message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub partition: i32,
    pub offset: i64,
}

/// Live session with the broker cluster.
///
/// Implementations must be safe for concurrent `publish` calls from multiple
/// threads without external locking: every flush shares one handle.
pub trait BrokerClient: Send + Sync {
    /// Publish one message and block until the broker acknowledges it or the
    /// client's own delivery policy gives up. No retry is layered on top.
    fn publish(&self, topic: &str, key: Option<&[u8]>, value: &[u8]) -> Result<Ack, PluginError>;

    /// Cheap liveness probe against the cluster.
    fn is_alive(&self) -> bool;
}

/// Factory for broker sessions. One call = one connection attempt.
pub trait BrokerConnector: Send + Sync {
    fn connect(&self, endpoints: &[String]) -> Result<Arc<dyn BrokerClient>, PluginError>;
}
