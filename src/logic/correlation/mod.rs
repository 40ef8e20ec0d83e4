//! Correlation Module - offline consistency check of the audit logs
//!
//! Detects requests whose records drifted out of correlation across the
//! interaction, guardrail event and telemetry logs.
//!
//! # Components
//! - `types.rs`: Report, summary and issue types
//! - `checker.rs`: Loading, grouping and invariant checks

pub mod types;
pub mod checker;


pub use types::{
    CheckOptions, CorrelationReport, CorrelationSummary, GuardrailActionCounts, Issue, IssueKind,
    LogParseError, DEPLOYMENT_WIDE,
};

pub use checker::{check, CorrelationAuditor};
