//! Time provider abstraction for telemetry operations
//!
//! Separates time acquisition from storage so that TTL expiry and
//! alert-window logic can be tested without sleeping.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Time provider trait for generating timestamps
pub trait TimeProvider: Send + Sync + 'static {
    /// Get current timestamp in milliseconds since Unix epoch
    fn now_millis(&self) -> i64;
}

/// System time provider using the local clock
///
/// This is the default implementation suitable for most use cases.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("System time before Unix epoch")
            .as_millis() as i64
    }
}

/// Fixed time provider for testing
///
/// Starts at a predetermined timestamp and only moves when told to,
/// which makes TTL tests deterministic.
#[derive(Debug)]
pub struct FixedTimeProvider {
    timestamp_ms: AtomicI64,
}

impl FixedTimeProvider {
    /// Create a new fixed time provider with the given timestamp
    pub fn new(timestamp_ms: i64) -> Self {
        Self {
            timestamp_ms: AtomicI64::new(timestamp_ms),
        }
    }

    /// Move the clock forward by `delta_ms` milliseconds
    pub fn advance(&self, delta_ms: i64) {
        self.timestamp_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }

    /// Set the clock to an absolute timestamp
    pub fn set(&self, timestamp_ms: i64) {
        self.timestamp_ms.store(timestamp_ms, Ordering::SeqCst);
    }
}

impl TimeProvider for FixedTimeProvider {
    fn now_millis(&self) -> i64 {
        self.timestamp_ms.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_time_provider_monotonic_enough() {
        let provider = SystemTimeProvider;
        let time1 = provider.now_millis();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let time2 = provider.now_millis();

        assert!(time2 >= time1 + 10);
    }

    #[test]
    fn test_fixed_time_provider_advance() {
        let provider = FixedTimeProvider::new(1_700_000_000_000);
        assert_eq!(provider.now_millis(), 1_700_000_000_000);

        provider.advance(6_000);
        assert_eq!(provider.now_millis(), 1_700_000_006_000);

        provider.set(42);
        assert_eq!(provider.now_millis(), 42);
    }
}
