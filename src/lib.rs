//! Guardrail decision engine and correlated audit trail.
//!
//! The request pipeline calls [`logic::guardrail`] before and after the
//! model invocation and records every stage through [`logic::audit`].
//! [`logic::correlation`] checks the persisted logs offline.

pub mod constants;
pub mod logic;

pub use logic::audit::{AuditTrail, RecordError, Stage};
pub use logic::config::{AuditConfig, ConfigError};
pub use logic::correlation::{CheckOptions, CorrelationAuditor, CorrelationReport};
pub use logic::guardrail::{Decision, DecisionAction, GuardrailEngine, Phase, Rule, RuleSet};
pub use logic::store::{FileLogStore, LogStore, MemoryLogStore, StoreError};
