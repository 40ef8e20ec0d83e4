//! File-backed log store
//!
//! Each log is `<dir>/<name>.json` holding a single JSON array.
//! An append reads the array, adds one record and writes the whole array to
//! a temp file in the same directory, then renames it over the original.
//! A crash mid-write leaves the previous array intact.

use std::collections::HashMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::constants::{DEFAULT_WRITE_ATTEMPTS, WRITE_RETRY_BACKOFF_MS};
use super::{validate_log_name, LogStore, StoreError};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Log file extension
const LOG_EXT: &str = "json";

/// One lock per log file for the whole process, shared by every store handle
static LOG_LOCKS: Lazy<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

// ============================================================================
// FILE STORE
// ============================================================================

pub struct FileLogStore {
    dir: PathBuf,
    max_attempts: u32,
}

impl FileLogStore {
    /// Open (creating if needed) a store rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Self::at(dir)
    }

    /// Open a store over an existing directory without creating anything
    pub fn open_existing(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(StoreError::MissingDir(dir));
        }
        Self::at(dir)
    }

    fn at(dir: PathBuf) -> Result<Self, StoreError> {
        // Canonical path so every handle on the same directory shares its locks
        let dir = fs::canonicalize(&dir)?;
        log::debug!("Opened log store at {:?}", dir);

        Ok(Self {
            dir,
            max_attempts: DEFAULT_WRITE_ATTEMPTS,
        })
    }

    /// Bounded retry count for the read-modify-write cycle (min 1)
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding `log`
    pub fn path_for(&self, log: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", log, LOG_EXT))
    }

    fn lock_for(path: &Path) -> Arc<Mutex<()>> {
        let mut locks = LOG_LOCKS.lock();
        Arc::clone(locks.entry(path.to_path_buf()).or_default())
    }

    fn try_append(&self, log: &str, path: &Path, record: &Value) -> Result<(), StoreError> {
        let mut records = read_array(log, path)?;
        records.push(record.clone());
        self.write_atomic(path, &records)
    }

    fn write_atomic(&self, path: &Path, records: &[Value]) -> Result<(), StoreError> {
        let tmp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer(&mut writer, records)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl LogStore for FileLogStore {
    fn append(&self, log: &str, record: Value) -> Result<(), StoreError> {
        validate_log_name(log)?;
        let path = self.path_for(log);
        let lock = Self::lock_for(&path);
        let _guard = lock.lock();

        let mut attempt = 1;
        loop {
            match self.try_append(log, &path, &record) {
                Ok(()) => return Ok(()),
                Err(StoreError::Io(e)) if attempt < self.max_attempts => {
                    log::warn!(
                        "Append to '{}' failed (attempt {}/{}): {}",
                        log, attempt, self.max_attempts, e
                    );
                    std::thread::sleep(Duration::from_millis(WRITE_RETRY_BACKOFF_MS * attempt as u64));
                    attempt += 1;
                }
                Err(StoreError::Io(e)) => {
                    log::error!("Giving up on append to '{}' after {} attempts: {}", log, attempt, e);
                    return Err(StoreError::WriteFailed {
                        log: log.to_string(),
                        attempts: attempt,
                        source: e,
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn read_all(&self, log: &str) -> Result<Vec<Value>, StoreError> {
        validate_log_name(log)?;
        read_array(log, &self.path_for(log))
    }
}

/// Missing or blank file reads as an empty log
fn read_array(log: &str, path: &Path) -> Result<Vec<Value>, StoreError> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    if data.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Vec::new());
    }

    serde_json::from_slice(&data).map_err(|source| StoreError::CorruptLog {
        log: log.to_string(),
        source,
    })
}

// ============================================================================
// TESTS
// ============================================================================
