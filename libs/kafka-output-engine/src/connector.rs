use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::backoff::{Clock, RetryOutcome, retry_until_deadline};
use crate::connection::ConnectionManager;
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorState {
    Uninitialized,
    Connecting,
    Ready,
    Failed,
}

/// Startup lifecycle: establish the broker session within a bounded window.
///
/// `Ready` lasts until [`Connector::stop`]. Losing the session in between is
/// handled by [`ConnectionManager::reconnect_if_dead`], not by re-entering
/// `Connecting`.
pub struct Connector {
    connections: Arc<ConnectionManager>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    retry_interval: Duration,
    state: Mutex<ConnectorState>,
}

impl Connector {
    pub fn new(
        connections: Arc<ConnectionManager>,
        clock: Arc<dyn Clock>,
        timeout: Duration,
        retry_interval: Duration,
    ) -> Self {
        Self {
            connections,
            clock,
            timeout,
            retry_interval,
            state: Mutex::new(ConnectorState::Uninitialized),
        }
    }

    pub fn state(&self) -> ConnectorState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: ConnectorState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Drop the session. A later `start` connects from scratch.
    pub fn stop(&self) {
        self.connections.disconnect();
        self.set_state(ConnectorState::Uninitialized);
    }

    /// Block until connected (`Ok`) or the window is exhausted (`Err`).
    pub fn start(&self) -> Result<(), EngineError> {
        if self.state() == ConnectorState::Ready {
            return Ok(());
        }
        self.set_state(ConnectorState::Connecting);
        tracing::info!(
            brokers = ?self.connections.endpoints(),
            timeout = ?self.timeout,
            "connecting to broker"
        );

        let outcome = retry_until_deadline(&*self.clock, self.timeout, self.retry_interval, |_| {
            self.connections.connect()
        });

        match outcome {
            RetryOutcome::Done { attempts, .. } => {
                self.set_state(ConnectorState::Ready);
                tracing::info!(attempts, "broker connection ready");
                Ok(())
            }
            RetryOutcome::TimedOut { attempts, last_error } => {
                self.set_state(ConnectorState::Failed);
                if let Some(e) = &last_error {
                    tracing::error!(attempts, timeout = ?self.timeout, error = %e, "broker failed to respond");
                }
                Err(EngineError::ConnectTimeout { timeout: self.timeout, attempts })
            }
        }
    }
}
