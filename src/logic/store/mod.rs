//! Append-Only Store
//!
//! One ordered JSON sequence per logical log. Appends are read-merge-write
//! cycles serialized per log; different logs never block each other.
//!
//! ## Structure
//! - `file.rs` - JSON array file per log, atomic replace (durable)
//! - `memory.rs` - In-process map of logs (tests, embedding)
//!
//! Records cross the store as `serde_json::Value`; the typed helpers
//! below convert to and from the recorders' record types.

pub mod file;
pub mod memory;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub use file::FileLogStore;
pub use memory::MemoryLogStore;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid log name '{0}'")]
    InvalidLogName(String),

    #[error("log '{log}' is not a readable JSON array: {source}")]
    CorruptLog {
        log: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("log directory {0:?} does not exist")]
    MissingDir(std::path::PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("append to '{log}' failed after {attempts} attempts: {source}")]
    WriteFailed {
        log: String,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// A set of named, append-only logs
pub trait LogStore: Send + Sync {
    /// Add one record to the end of `log`
    fn append(&self, log: &str, record: Value) -> Result<(), StoreError>;

    /// Every record of `log` in append order; a log never written is empty
    fn read_all(&self, log: &str) -> Result<Vec<Value>, StoreError>;
}

/// Serialize and append a typed record
pub fn append_record<T: Serialize>(
    store: &dyn LogStore,
    log: &str,
    record: &T,
) -> Result<(), StoreError> {
    store.append(log, serde_json::to_value(record)?)
}

/// Read a whole log as typed records
pub fn read_records<T: DeserializeOwned>(
    store: &dyn LogStore,
    log: &str,
) -> Result<Vec<T>, StoreError> {
    store
        .read_all(log)?
        .into_iter()
        .map(|value| serde_json::from_value(value).map_err(StoreError::from))
        .collect()
}

/// Log names become file names, so keep them to a safe alphabet
pub(crate) fn validate_log_name(log: &str) -> Result<(), StoreError> {
    let valid = !log.is_empty()
        && log
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidLogName(log.to_string()))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        id: u32,
        label: String,
    }

    #[test]
    fn test_log_name_validation() {
        assert!(validate_log_name("guardrail_events").is_ok());
        assert!(validate_log_name("telemetry-v2").is_ok());
        assert!(validate_log_name("").is_err());
        assert!(validate_log_name("../etc/passwd").is_err());
        assert!(validate_log_name("a b").is_err());
    }

    #[test]
    fn test_typed_helpers() {
        let store = MemoryLogStore::new();
        for id in 0..3 {
            append_record(&store, "samples", &Sample { id, label: format!("s{}", id) }).unwrap();
        }
        let back: Vec<Sample> = read_records(&store, "samples").unwrap();
        assert_eq!(back.len(), 3);
        assert_eq!(back[2], Sample { id: 2, label: "s2".to_string() });
    }
}
