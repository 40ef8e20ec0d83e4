//! Audit Recorders
//!
//! Thin typed wrappers over the store, one per logical log.
//! A record without its correlation identifier is rejected, never stored.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::constants::{GUARDRAIL_EVENTS_LOG, INTERACTIONS_LOG, TELEMETRY_LOG};
use crate::logic::store::{self, LogStore, StoreError};
use super::records::{Correlated, GuardrailEventRecord, InteractionRecord, TelemetryRecord};

// ============================================================================
// ERRORS
// ============================================================================

/// Failure to record - always distinct from a guardrail decision
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("refusing to append to '{log}': record has no {field}")]
    MissingIdentifier { log: String, field: &'static str },

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// RECORDER
// ============================================================================

/// Appends records of type `T` to one logical log
pub struct Recorder<T> {
    store: Arc<dyn LogStore>,
    log_name: &'static str,
    recorded: AtomicU64,
    _record: PhantomData<fn(T)>,
}

pub type InteractionRecorder = Recorder<InteractionRecord>;
pub type GuardrailEventRecorder = Recorder<GuardrailEventRecord>;
pub type TelemetryRecorder = Recorder<TelemetryRecord>;

impl<T> Recorder<T>
where
    T: Serialize + DeserializeOwned + Correlated,
{
    pub fn new(store: Arc<dyn LogStore>, log_name: &'static str) -> Self {
        Self {
            store,
            log_name,
            recorded: AtomicU64::new(0),
            _record: PhantomData,
        }
    }

    pub fn log_name(&self) -> &'static str {
        self.log_name
    }

    /// Validate and append one record
    pub fn append(&self, record: &T) -> Result<(), RecordError> {
        if let Some(field) = record.missing_identifier() {
            log::error!("Rejected {} record without {}", self.log_name, field);
            return Err(RecordError::MissingIdentifier {
                log: self.log_name.to_string(),
                field,
            });
        }

        store::append_record(self.store.as_ref(), self.log_name, record)?;
        self.recorded.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Everything this log holds (from any writer), in append order
    pub fn read_all(&self) -> Result<Vec<T>, RecordError> {
        Ok(store::read_records(self.store.as_ref(), self.log_name)?)
    }

    /// Records appended through this recorder instance
    pub fn recorded(&self) -> u64 {
        self.recorded.load(Ordering::Relaxed)
    }
}

impl InteractionRecorder {
    pub fn interactions(store: Arc<dyn LogStore>) -> Self {
        Self::new(store, INTERACTIONS_LOG)
    }
}

impl GuardrailEventRecorder {
    pub fn guardrail_events(store: Arc<dyn LogStore>) -> Self {
        Self::new(store, GUARDRAIL_EVENTS_LOG)
    }
}

impl TelemetryRecorder {
    pub fn telemetry(store: Arc<dyn LogStore>) -> Self {
        Self::new(store, TELEMETRY_LOG)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::audit::records::Stage;
    use crate::logic::store::{FileLogStore, MemoryLogStore};
    use serde_json::Value;
    use uuid::Uuid;

    /// Store whose writes always fail
    struct BrokenStore;

    impl LogStore for BrokenStore {
        fn append(&self, log: &str, _record: Value) -> Result<(), StoreError> {
            Err(StoreError::WriteFailed {
                log: log.to_string(),
                attempts: 3,
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            })
        }

        fn read_all(&self, _log: &str) -> Result<Vec<Value>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_round_trip_in_order() {
        let store: Arc<dyn LogStore> = Arc::new(MemoryLogStore::new());
        let recorder = InteractionRecorder::interactions(store);
        let request_id = Uuid::new_v4();

        let written: Vec<InteractionRecord> = [
            Stage::RequestReceived,
            Stage::GuardrailInputPass,
            Stage::LlmInvocationStart,
        ]
        .into_iter()
        .map(|stage| InteractionRecord::new(request_id, stage))
        .collect();

        for record in &written {
            recorder.append(record).unwrap();
        }

        assert_eq!(recorder.read_all().unwrap(), written);
        assert_eq!(recorder.recorded(), 3);
    }

    #[test]
    fn test_reject_missing_request_id() {
        let store = Arc::new(MemoryLogStore::new());
        let recorder = InteractionRecorder::interactions(store.clone());

        let result = recorder.append(&InteractionRecord::new(Uuid::nil(), Stage::RequestReceived));
        match result {
            Err(RecordError::MissingIdentifier { log, field }) => {
                assert_eq!(log, INTERACTIONS_LOG);
                assert_eq!(field, "request_id");
            }
            other => panic!("Expected MissingIdentifier, got {:?}", other),
        }
        assert_eq!(store.len(INTERACTIONS_LOG), 0);
        assert_eq!(recorder.recorded(), 0);
    }

    #[test]
    fn test_store_failure_surfaces() {
        let recorder = InteractionRecorder::interactions(Arc::new(BrokenStore));
        let result = recorder.append(&InteractionRecord::new(Uuid::new_v4(), Stage::RequestReceived));
        assert!(matches!(
            result,
            Err(RecordError::Store(StoreError::WriteFailed { .. }))
        ));
    }

    #[test]
    fn test_recorders_write_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn LogStore> = Arc::new(FileLogStore::open(dir.path()).unwrap());
        let interactions = InteractionRecorder::interactions(store.clone());
        let telemetry = TelemetryRecorder::telemetry(store.clone());
        let events = GuardrailEventRecorder::guardrail_events(store);

        interactions
            .append(&InteractionRecord::new(Uuid::new_v4(), Stage::RequestReceived))
            .unwrap();

        assert!(dir.path().join("interactions.json").exists());
        assert!(!dir.path().join("telemetry.json").exists());
        assert!(telemetry.read_all().unwrap().is_empty());
        assert!(events.read_all().unwrap().is_empty());
        assert_eq!(events.log_name(), GUARDRAIL_EVENTS_LOG);
    }
}
