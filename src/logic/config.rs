//! Audit Configuration
//!
//! Deployment settings passed explicitly to the components that need them.
//! Can be loaded from the environment (and a `.env` file) or built in code.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    env_flag, env_number, env_string, APP_NAME, DEFAULT_MAX_REPORTED_ISSUES, DEFAULT_WRITE_ATTEMPTS,
};
use crate::logic::guardrail::{RuleSet, RuleSetError};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("rules file {path:?} could not be loaded: {source}")]
    Rules {
        path: PathBuf,
        #[source]
        source: RuleSetError,
    },

    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ============================================================================
// AUDIT CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Directory holding the three logs
    pub log_dir: PathBuf,
    /// Record guardrail events whose action is "pass"
    pub pass_logging_enabled: bool,
    /// Issues listed in a correlation report
    pub max_reported_issues: usize,
    /// JSON array of built-in rules; compiled-in defaults when unset
    pub builtin_rules_path: Option<PathBuf>,
    /// Read-modify-write attempts per append
    pub max_write_attempts: u32,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            pass_logging_enabled: true,
            max_reported_issues: DEFAULT_MAX_REPORTED_ISSUES,
            builtin_rules_path: None,
            max_write_attempts: DEFAULT_WRITE_ATTEMPTS,
        }
    }
}

impl AuditConfig {
    /// Load from environment variables, after reading `.env` if present
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("Loaded environment from {:?}", path);
        }

        let defaults = Self::default();
        let config = Self {
            log_dir: env_string("GUARDRAIL_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            pass_logging_enabled: env_flag("GUARDRAIL_PASS_LOGGING", defaults.pass_logging_enabled),
            max_reported_issues: env_number("GUARDRAIL_MAX_ISSUES", defaults.max_reported_issues),
            builtin_rules_path: env_string("GUARDRAIL_RULES_FILE").map(PathBuf::from),
            max_write_attempts: env_number("GUARDRAIL_WRITE_ATTEMPTS", defaults.max_write_attempts),
        };

        config.validate()?;
        Ok(config)
    }

    /// Quiet mode - pass events are not logged
    pub fn quiet() -> Self {
        Self {
            pass_logging_enabled: false,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_write_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "max_write_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.log_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                key: "log_dir",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Built-in rules for this deployment
    pub fn load_rules(&self) -> Result<RuleSet, ConfigError> {
        match &self.builtin_rules_path {
            Some(path) => RuleSet::from_json_file(path).map_err(|source| ConfigError::Rules {
                path: path.clone(),
                source,
            }),
            None => Ok(RuleSet::with_defaults()),
        }
    }
}

/// Default: app data directory
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
        .join("logs")
}

// ============================================================================
// TESTS
// ============================================================================
