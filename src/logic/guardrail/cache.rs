//! Compiled Pattern Cache
//!
//! Process-wide cache of compiled rule patterns, keyed by pattern text.
//! Compile failures are cached too, so a bad custom rule repeated across
//! requests is not recompiled every time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};

use crate::constants::PATTERN_SIZE_LIMIT;

// ============================================================================
// STATE
// ============================================================================

static PATTERNS: Lazy<PatternCache> = Lazy::new(PatternCache::new);

/// Shared cache used by every engine in the process
pub fn global() -> &'static PatternCache {
    &PATTERNS
}

// ============================================================================
// CACHE
// ============================================================================

pub struct PatternCache {
    entries: RwLock<HashMap<String, Result<Regex, String>>>,
    compiles: AtomicU64,
}

impl PatternCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            compiles: AtomicU64::new(0),
        }
    }

    /// Compiled pattern, or the compiler message if it does not compile
    pub fn get(&self, pattern: &str) -> Result<Regex, String> {
        if let Some(entry) = self.entries.read().get(pattern) {
            return entry.clone();
        }

        let mut entries = self.entries.write();
        // Another writer may have filled it while we waited
        if let Some(entry) = entries.get(pattern) {
            return entry.clone();
        }

        let compiled = compile(pattern);
        self.compiles.fetch_add(1, Ordering::Relaxed);
        entries.insert(pattern.to_string(), compiled.clone());
        compiled
    }

    /// Number of distinct patterns seen
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Compiles performed so far (cache misses)
    pub fn compiles(&self) -> u64 {
        self.compiles.load(Ordering::Relaxed)
    }
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::new()
    }
}

fn compile(pattern: &str) -> Result<Regex, String> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .size_limit(PATTERN_SIZE_LIMIT)
        .build()
        .map_err(|e| e.to_string())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiles_once_per_pattern() {
        let cache = PatternCache::new();
        assert!(cache.get("abc").is_ok());
        assert!(cache.get("abc").is_ok());
        assert!(cache.get("def").is_ok());
        assert_eq!(cache.compiles(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_failures_are_cached() {
        let cache = PatternCache::new();
        let first = cache.get("(python");
        let second = cache.get("(python");
        assert_eq!(first.unwrap_err(), second.unwrap_err());
        assert_eq!(cache.compiles(), 1);
    }

    #[test]
    fn test_case_insensitive() {
        let cache = PatternCache::new();
        let re = cache.get("password").unwrap();
        assert!(re.is_match("My PASSWORD"));
    }
}
