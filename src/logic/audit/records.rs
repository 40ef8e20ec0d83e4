//! Audit Record Types
//!
//! Immutable, timestamped records for the three audit logs.
//! Each record is created once, when its event happens, and never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::logic::guardrail::{Decision, DecisionAction, Phase, RuleAction, RuleFinding, Severity};

// ============================================================================
// CORRELATION
// ============================================================================

/// Records that must carry an identifier before they may be stored
pub trait Correlated {
    /// Name of the first identifier field that is missing (nil), if any
    fn missing_identifier(&self) -> Option<&'static str>;
}

fn present(id: &Uuid) -> bool {
    !id.is_nil()
}

// ============================================================================
// INTERACTION STAGES
// ============================================================================

/// Lifecycle stages, declared in canonical pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    RequestReceived,
    GuardrailInputPass,
    GuardrailInputBlocked,
    LlmInvocationStart,
    LlmInvocationEnd,
    GuardrailOutputPass,
    GuardrailOutputModified,
    TelemetryPersisted,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::RequestReceived,
        Stage::GuardrailInputPass,
        Stage::GuardrailInputBlocked,
        Stage::LlmInvocationStart,
        Stage::LlmInvocationEnd,
        Stage::GuardrailOutputPass,
        Stage::GuardrailOutputModified,
        Stage::TelemetryPersisted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::RequestReceived => "request_received",
            Stage::GuardrailInputPass => "guardrail_input_pass",
            Stage::GuardrailInputBlocked => "guardrail_input_blocked",
            Stage::LlmInvocationStart => "llm_invocation_start",
            Stage::LlmInvocationEnd => "llm_invocation_end",
            Stage::GuardrailOutputPass => "guardrail_output_pass",
            Stage::GuardrailOutputModified => "guardrail_output_modified",
            Stage::TelemetryPersisted => "telemetry_persisted",
        }
    }

    /// Parse the persisted name; accepts upper case too
    pub fn parse(name: &str) -> Option<Stage> {
        let name = name.trim().to_lowercase();
        Stage::ALL.into_iter().find(|s| s.as_str() == name)
    }

    /// Step in the canonical order (pass/blocked variants share a step)
    pub fn ordinal(&self) -> u8 {
        match self {
            Stage::RequestReceived => 0,
            Stage::GuardrailInputPass | Stage::GuardrailInputBlocked => 1,
            Stage::LlmInvocationStart => 2,
            Stage::LlmInvocationEnd => 3,
            Stage::GuardrailOutputPass | Stage::GuardrailOutputModified => 4,
            Stage::TelemetryPersisted => 5,
        }
    }

    /// Stage the pipeline records after a guardrail decision.
    /// An output block withholds the response, recorded as output_modified.
    pub fn for_decision(phase: Phase, decision: &Decision) -> Stage {
        match (phase, decision.action) {
            (Phase::Input, DecisionAction::Block) => Stage::GuardrailInputBlocked,
            (Phase::Input, _) => Stage::GuardrailInputPass,
            (Phase::Output, DecisionAction::Pass) => Stage::GuardrailOutputPass,
            (Phase::Output, _) => Stage::GuardrailOutputModified,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One lifecycle stage transition of a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub request_id: Uuid,
    pub stage: Stage,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub guardrail_type: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl InteractionRecord {
    pub fn new(request_id: Uuid, stage: Stage) -> Self {
        Self {
            request_id,
            stage,
            result: None,
            action: None,
            guardrail_type: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_result(mut self, result: &str) -> Self {
        self.result = Some(result.to_string());
        self
    }

    pub fn with_action(mut self, action: &str) -> Self {
        self.action = Some(action.to_string());
        self
    }

    pub fn with_guardrail_type(mut self, guardrail_type: &str) -> Self {
        self.guardrail_type = Some(guardrail_type.to_string());
        self
    }

    /// Stage record for a guardrail decision
    pub fn from_decision(request_id: Uuid, phase: Phase, decision: &Decision) -> Self {
        let mut record = Self::new(request_id, Stage::for_decision(phase, decision))
            .with_action(decision.action.as_str())
            .with_guardrail_type(phase.as_str());
        if decision.triggered {
            record = record.with_result(&decision.triggered_rules.join(","));
        }
        record
    }
}

impl Correlated for InteractionRecord {
    fn missing_identifier(&self) -> Option<&'static str> {
        (!present(&self.request_id)).then_some("request_id")
    }
}

// ============================================================================
// GUARDRAIL EVENTS
// ============================================================================

/// What happened to content because of one triggered rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    Blocked,
    Modified,
    Pass,
}

impl EventAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventAction::Blocked => "blocked",
            EventAction::Modified => "modified",
            EventAction::Pass => "pass",
        }
    }
}

impl From<RuleAction> for EventAction {
    fn from(action: RuleAction) -> Self {
        match action {
            RuleAction::Block => EventAction::Blocked,
            RuleAction::Modify => EventAction::Modified,
            RuleAction::LogOnly => EventAction::Pass,
        }
    }
}

/// Violation type for pattern hits
pub const VIOLATION_PATTERN_MATCH: &str = "pattern_match";
/// Violation type for rules whose pattern did not compile
pub const VIOLATION_MALFORMED_RULE: &str = "malformed_rule";

/// One triggered rule for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardrailEventRecord {
    pub event_id: Uuid,
    pub request_id: Uuid,
    pub violation_type: String,
    pub rule_triggered: String,
    pub action: EventAction,
    pub severity: Severity,
    #[serde(default)]
    pub details: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl GuardrailEventRecord {
    pub fn from_finding(request_id: Uuid, phase: Phase, finding: &RuleFinding) -> Self {
        let mut details = Map::new();
        details.insert("phase".to_string(), Value::from(phase.as_str()));
        details.insert("match_count".to_string(), Value::from(finding.match_count));
        if let Some(err) = &finding.error {
            details.insert("error".to_string(), Value::from(err.as_str()));
        }

        let violation_type = if finding.malformed {
            VIOLATION_MALFORMED_RULE
        } else {
            VIOLATION_PATTERN_MATCH
        };

        Self {
            event_id: Uuid::new_v4(),
            request_id,
            violation_type: violation_type.to_string(),
            rule_triggered: finding.rule_id.clone(),
            action: finding.action.into(),
            severity: finding.severity,
            details,
            timestamp: Utc::now(),
        }
    }

    /// One event per triggered rule (none for an untriggered decision)
    pub fn from_decision(request_id: Uuid, phase: Phase, decision: &Decision) -> Vec<Self> {
        decision
            .findings
            .iter()
            .map(|finding| Self::from_finding(request_id, phase, finding))
            .collect()
    }
}

impl Correlated for GuardrailEventRecord {
    fn missing_identifier(&self) -> Option<&'static str> {
        if !present(&self.request_id) {
            Some("request_id")
        } else if !present(&self.event_id) {
            Some("event_id")
        } else {
            None
        }
    }
}

// ============================================================================
// TELEMETRY
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt: u64,
    pub completion: u64,
    pub total: u64,
}

impl TokenUsage {
    pub fn new(prompt: u64, completion: u64) -> Self {
        Self {
            prompt,
            completion,
            total: prompt.saturating_add(completion),
        }
    }
}

/// Result reported by the invocation client; opaque to the guardrails
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationOutcome {
    pub model: String,
    pub success: bool,
    pub latency_ms: u64,
    pub tokens: TokenUsage,
    pub cost_usd: f64,
    pub error: Option<String>,
}

pub const EVENT_INVOCATION: &str = "llm_invocation";
pub const EVENT_INVOCATION_FAILED: &str = "llm_invocation_failed";

/// Cost / latency / usage of one invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,
    /// Identifier carried by records written before request ids existed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telemetry_id: Option<Uuid>,
    pub event_type: String,
    pub cost_usd: f64,
    pub latency_ms: u64,
    pub tokens: TokenUsage,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl TelemetryRecord {
    pub fn from_outcome(request_id: Uuid, outcome: &InvocationOutcome) -> Self {
        let event_type = if outcome.success {
            EVENT_INVOCATION
        } else {
            EVENT_INVOCATION_FAILED
        };

        Self {
            request_id: Some(request_id),
            telemetry_id: None,
            event_type: event_type.to_string(),
            cost_usd: outcome.cost_usd,
            latency_ms: outcome.latency_ms,
            tokens: outcome.tokens,
            model: outcome.model.clone(),
            error: outcome.error.clone(),
            timestamp: Utc::now(),
        }
    }

    /// request_id if present, else telemetry_id
    pub fn correlation_id(&self) -> Option<Uuid> {
        self.request_id
            .filter(present)
            .or_else(|| self.telemetry_id.filter(present))
    }
}

impl Correlated for TelemetryRecord {
    fn missing_identifier(&self) -> Option<&'static str> {
        self.correlation_id().is_none().then_some("request_id")
    }
}

// ============================================================================
// TESTS
// ============================================================================
