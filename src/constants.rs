//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Every default can be overridden from the environment.

/// App name (used for the default data directory)
pub const APP_NAME: &str = "guardrail-audit";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Logical log holding interaction stage records
pub const INTERACTIONS_LOG: &str = "interactions";

/// Logical log holding guardrail violation records
pub const GUARDRAIL_EVENTS_LOG: &str = "guardrail_events";

/// Logical log holding invocation telemetry records
pub const TELEMETRY_LOG: &str = "telemetry";

/// Placeholder written over spans matched by MODIFY rules
pub const REDACTION_TOKEN: &str = "[REDACTED]";

/// Compiled size limit for a single rule pattern (bytes)
pub const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// Read-modify-write attempts before an append is reported as failed
pub const DEFAULT_WRITE_ATTEMPTS: u32 = 3;

/// Pause between append attempts (milliseconds)
pub const WRITE_RETRY_BACKOFF_MS: u64 = 25;

/// Issues listed in a correlation report (the summary still counts all)
pub const DEFAULT_MAX_REPORTED_ISSUES: usize = 50;

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Read a boolean flag; "false" / "0" / "off" disable it
pub fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|s| {
            let s = s.trim().to_lowercase();
            !(s == "false" || s == "0" || s == "off")
        })
        .unwrap_or(default)
}

/// Read a number, falling back to the default when unset or unparseable
pub fn env_number<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Read a non-empty string
pub fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
