//! Error types for unigate-telemetry

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Corrupt series record in {file} line {line}: {error}")]
    CorruptRecord {
        file: String,
        line: usize,
        error: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = TelemetryError::StorageError("disk full".to_string());
        assert_eq!(err.to_string(), "Storage error: disk full");
    }

    #[test]
    fn test_corrupt_record_display() {
        let err = TelemetryError::CorruptRecord {
            file: "temperature.jsonl".to_string(),
            line: 7,
            error: "expected value".to_string(),
        };
        assert!(err.to_string().contains("temperature.jsonl"));
        assert!(err.to_string().contains("line 7"));
    }
}
