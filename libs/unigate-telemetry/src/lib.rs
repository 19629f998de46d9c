//! Unigate telemetry cache
//!
//! Provides a unified interface for telemetry storage: a TTL key-value cache
//! plus bounded per-series sliding-window history, with memory and file
//! (jsonl) backends.
//!
//! # Key Components
//!
//! - **TelemetryStore trait**: core storage operations
//! - **MemoryStore**: in-memory backend
//! - **FileStore**: append-only per-series jsonl persistence
//! - **TimeProvider**: injectable clock for deterministic TTL tests

pub mod traits;

#[cfg(feature = "memory-backend")]
pub mod memory_impl;

#[cfg(feature = "file-backend")]
pub mod file_impl;

pub mod error;

pub mod time;

// Re-exports
pub use traits::{SeriesRecord, TelemetryStore, SERIES_CAP};

pub use error::TelemetryError;

#[cfg(feature = "memory-backend")]
pub use memory_impl::{MemoryStats, MemoryStore};

#[cfg(feature = "file-backend")]
pub use file_impl::FileStore;

pub use time::{FixedTimeProvider, SystemTimeProvider, TimeProvider};

/// Helper functions for common operations
#[cfg(feature = "memory-backend")]
pub mod helpers {
    use super::{MemoryStore, TelemetryStore};
    use std::sync::Arc;

    /// Create an in-memory store for unit testing
    ///
    /// This creates a MemoryStore that doesn't require any filesystem access.
    pub fn create_test_store() -> Arc<dyn TelemetryStore> {
        Arc::new(MemoryStore::new())
    }
}
