use std::sync::{Arc, Mutex, PoisonError, RwLock, TryLockError};

use kafka_output_api::broker::{BrokerClient, BrokerConnector};
use kafka_output_api::error::PluginError;

/// Holds the single shared broker session.
///
/// Flushes clone the handle under a short read lock and publish without
/// holding it. Only `connect`, `reconnect_if_dead` and `disconnect` write.
pub struct ConnectionManager {
    connector: Arc<dyn BrokerConnector>,
    endpoints: Vec<String>,
    current: RwLock<Option<Arc<dyn BrokerClient>>>,
    reconnecting: Mutex<()>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn BrokerConnector>, endpoints: Vec<String>) -> Self {
        Self {
            connector,
            endpoints,
            current: RwLock::new(None),
            reconnecting: Mutex::new(()),
        }
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// One connection attempt. On success the new session replaces the
    /// previous one.
    pub fn connect(&self) -> Result<Arc<dyn BrokerClient>, PluginError> {
        let client = self.connector.connect(&self.endpoints)?;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(client.clone());
        Ok(client)
    }

    pub fn current(&self) -> Option<Arc<dyn BrokerClient>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Probe the current session and replace it with one fresh attempt if it
    /// stopped answering. Returns `true` if a new session was installed.
    ///
    /// Single flight: while one caller reconnects, others return `false`
    /// immediately and pick up the new session on their next flush.
    pub fn reconnect_if_dead(&self) -> bool {
        let _guard = match self.reconnecting.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                tracing::debug!("reconnect already in progress");
                return false;
            }
        };

        match self.current() {
            Some(client) if client.is_alive() => false,
            _ => match self.connect() {
                Ok(_) => {
                    tracing::info!(brokers = ?self.endpoints, "reconnected to broker");
                    true
                }
                Err(e) => {
                    tracing::warn!(brokers = ?self.endpoints, error = %e, "reconnect failed");
                    false
                }
            },
        }
    }

    pub fn disconnect(&self) {
        self.current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}
