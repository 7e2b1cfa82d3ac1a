use std::time::{Duration, Instant};

use kafka_output_api::error::PluginError;

/// Time source for retry loops. Swapped for a manual clock in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall clock: real `Instant` and blocking `thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug)]
pub enum RetryOutcome<T> {
    Done { value: T, attempts: u32 },
    TimedOut { attempts: u32, last_error: Option<PluginError> },
}

/// Fixed-interval retry until a deadline.
///
/// `op` receives the 1-based attempt number. Success returns immediately;
/// after each failure the loop sleeps `interval` and tries again while
/// `now < deadline`. A sleep may overshoot the deadline, in which case no
/// further attempt is made. A timeout too large to represent as an `Instant`
/// means no deadline.
pub fn retry_until_deadline<T>(
    clock: &dyn Clock,
    timeout: Duration,
    interval: Duration,
    mut op: impl FnMut(u32) -> Result<T, PluginError>,
) -> RetryOutcome<T> {
    let deadline = clock.now().checked_add(timeout);
    let mut attempts = 0;
    let mut last_error = None;

    while deadline.is_none_or(|deadline| clock.now() < deadline) {
        attempts += 1;
        match op(attempts) {
            Ok(value) => return RetryOutcome::Done { value, attempts },
            Err(e) => {
                tracing::warn!(attempt = attempts, error = %e, retry_in = ?interval, "attempt failed, retrying");
                last_error = Some(e);
                clock.sleep(interval);
            }
        }
    }

    RetryOutcome::TimedOut { attempts, last_error }
}
