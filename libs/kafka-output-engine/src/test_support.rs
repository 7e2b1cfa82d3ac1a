//! Fakes for unit and integration tests: manual clock and in-memory broker.
//!
//! Compiled for this crate's tests and behind the `test-support` feature.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use kafka_output_api::broker::{Ack, BrokerClient, BrokerConnector};
use kafka_output_api::error::PluginError;

use crate::backoff::Clock;

/// Clock that only moves when slept on.
pub struct ManualClock {
    start: Instant,
    elapsed: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        *self.elapsed.lock().unwrap() += duration;
        self.sleeps.lock().unwrap().push(duration);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub key: Option<Vec<u8>>,
    pub value: Vec<u8>,
}

/// In-memory broker session.
#[derive(Default)]
pub struct MemoryClient {
    pub published: Mutex<Vec<Published>>,
    pub fail_publish: AtomicBool,
    pub dead: AtomicBool,
}

impl MemoryClient {
    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }
}

impl BrokerClient for MemoryClient {
    fn publish(&self, topic: &str, key: Option<&[u8]>, value: &[u8]) -> Result<Ack, PluginError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(PluginError::io("message timed out"));
        }
        let mut published = self.published.lock().unwrap();
        published.push(Published {
            topic: topic.to_string(),
            key: key.map(<[u8]>::to_vec),
            value: value.to_vec(),
        });
        Ok(Ack { partition: 0, offset: published.len() as i64 - 1 })
    }

    fn is_alive(&self) -> bool {
        !self.dead.load(Ordering::SeqCst)
    }
}

/// Connector that fails `failures` times, then hands out `client`.
pub struct StubConnector {
    pub client: Arc<MemoryClient>,
    failures: AtomicU32,
    pub attempts: AtomicU32,
}

impl StubConnector {
    pub fn new(failures: u32) -> Self {
        Self {
            client: Arc::new(MemoryClient::default()),
            failures: AtomicU32::new(failures),
            attempts: AtomicU32::new(0),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl BrokerConnector for StubConnector {
    fn connect(&self, endpoints: &[String]) -> Result<Arc<dyn BrokerClient>, PluginError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(PluginError::io(format!("{}: connection refused", endpoints.join(","))));
        }
        Ok(self.client.clone())
    }
}
