//! In-memory log store. Same contract as the file store, nothing durable.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

use super::{validate_log_name, LogStore, StoreError};

#[derive(Debug, Default)]
pub struct MemoryLogStore {
    logs: RwLock<HashMap<String, Vec<Value>>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records currently held in `log`
    pub fn len(&self, log: &str) -> usize {
        self.logs.read().get(log).map_or(0, Vec::len)
    }
}

impl LogStore for MemoryLogStore {
    fn append(&self, log: &str, record: Value) -> Result<(), StoreError> {
        validate_log_name(log)?;
        self.logs
            .write()
            .entry(log.to_string())
            .or_default()
            .push(record);
        Ok(())
    }

    fn read_all(&self, log: &str) -> Result<Vec<Value>, StoreError> {
        validate_log_name(log)?;
        Ok(self.logs.read().get(log).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_logs_are_independent() {
        let store = MemoryLogStore::new();
        store.append("a", json!({"n": 1})).unwrap();
        store.append("b", json!({"n": 2})).unwrap();
        store.append("a", json!({"n": 3})).unwrap();

        assert_eq!(store.len("a"), 2);
        assert_eq!(store.len("b"), 1);
        assert_eq!(store.read_all("a").unwrap()[1], json!({"n": 3}));
        assert!(store.read_all("never_written").unwrap().is_empty());
    }
}
