//! Correlation Report Types

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_MAX_REPORTED_ISSUES;
use crate::logic::config::AuditConfig;

/// Request id used for issues that are not about a single request
pub const DEPLOYMENT_WIDE: &str = "*";

// ============================================================================
// ISSUES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// No request_received stage for the request
    MissingStage,
    /// Telemetry exists but no terminal stage was recorded
    MissingCompletionStage,
    /// A blocked guardrail event with no matching blocked/modified stage
    BlockedWithoutStage,
    /// Pass events logged while pass logging is disabled
    UnexpectedPassEvents,
    /// Same guardrail event id appended more than once
    DuplicateEvent,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::MissingStage => "missing_stage",
            IssueKind::MissingCompletionStage => "missing_completion_stage",
            IssueKind::BlockedWithoutStage => "blocked_without_stage",
            IssueKind::UnexpectedPassEvents => "unexpected_pass_events",
            IssueKind::DuplicateEvent => "duplicate_event",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub request_id: String,
    pub kind: IssueKind,
    pub detail: String,
}

impl Issue {
    pub fn new(request_id: &str, kind: IssueKind, detail: impl Into<String>) -> Self {
        Self {
            request_id: request_id.to_string(),
            kind,
            detail: detail.into(),
        }
    }
}

// ============================================================================
// SUMMARY
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailActionCounts {
    pub blocked: usize,
    pub modified: usize,
    pub pass: usize,
    /// Anything else (unknown or missing action)
    pub other: usize,
}

/// A log that could not be read; it was treated as empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogParseError {
    pub log: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationSummary {
    /// Distinct correlation ids seen in any log
    pub total_requests: usize,
    pub requests_with_interactions: usize,
    pub requests_with_guardrail_events: usize,
    pub requests_with_telemetry: usize,
    /// Telemetry keyed by telemetry_id instead of request_id
    pub legacy_telemetry_entries: usize,
    /// Records with no usable identifier (not bucketed)
    pub uncorrelated_records: usize,
    /// Array entries that were not records at all
    pub malformed_records: usize,
    pub guardrail_actions: GuardrailActionCounts,
    pub duplicate_event_ids: usize,
    pub parse_errors: Vec<LogParseError>,
    pub total_issues: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationReport {
    pub summary: CorrelationSummary,
    /// First N issues in check order
    pub issues: Vec<Issue>,
}

impl CorrelationReport {
    pub fn is_clean(&self) -> bool {
        self.summary.total_issues == 0 && self.summary.parse_errors.is_empty()
    }

    /// Process exit status: 0 clean, 1 issues or unreadable logs
    pub fn exit_code(&self) -> u8 {
        if self.is_clean() {
            0
        } else {
            1
        }
    }
}

// ============================================================================
// OPTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOptions {
    pub pass_logging_enabled: bool,
    pub max_reported_issues: usize,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            pass_logging_enabled: true,
            max_reported_issues: DEFAULT_MAX_REPORTED_ISSUES,
        }
    }
}

impl From<&AuditConfig> for CheckOptions {
    fn from(config: &AuditConfig) -> Self {
        Self {
            pass_logging_enabled: config.pass_logging_enabled,
            max_reported_issues: config.max_reported_issues,
        }
    }
}
