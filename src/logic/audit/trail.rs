//! Audit Trail
//!
//! The three recorders over one store, with the helpers the request
//! pipeline calls at each stage boundary.

use std::sync::Arc;

use uuid::Uuid;

use crate::logic::config::AuditConfig;
use crate::logic::guardrail::{Decision, Phase};
use crate::logic::store::{FileLogStore, LogStore, StoreError};
use super::records::{
    EventAction, GuardrailEventRecord, InteractionRecord, InvocationOutcome, Stage, TelemetryRecord,
};
use super::recorder::{GuardrailEventRecorder, InteractionRecorder, RecordError, TelemetryRecorder};

pub struct AuditTrail {
    pub interactions: InteractionRecorder,
    pub guardrail_events: GuardrailEventRecorder,
    pub telemetry: TelemetryRecorder,
    pass_logging_enabled: bool,
}

impl AuditTrail {
    pub fn new(store: Arc<dyn LogStore>, pass_logging_enabled: bool) -> Self {
        Self {
            interactions: InteractionRecorder::interactions(Arc::clone(&store)),
            guardrail_events: GuardrailEventRecorder::guardrail_events(Arc::clone(&store)),
            telemetry: TelemetryRecorder::telemetry(store),
            pass_logging_enabled,
        }
    }

    /// File-backed trail in the configured log directory
    pub fn open(config: &AuditConfig) -> Result<Self, StoreError> {
        let store = FileLogStore::open(&config.log_dir)?.with_max_attempts(config.max_write_attempts);
        Ok(Self::new(Arc::new(store), config.pass_logging_enabled))
    }

    pub fn pass_logging_enabled(&self) -> bool {
        self.pass_logging_enabled
    }

    /// Append a bare stage transition
    pub fn record_stage(&self, request_id: Uuid, stage: Stage) -> Result<(), RecordError> {
        self.interactions.append(&InteractionRecord::new(request_id, stage))
    }

    /// Record a guardrail decision: one event per triggered rule, then the
    /// stage transition. Returns the stage written.
    ///
    /// Events go first so that a failure between the two writes shows up
    /// in the correlation check instead of vanishing.
    pub fn record_decision(
        &self,
        request_id: Uuid,
        phase: Phase,
        decision: &Decision,
    ) -> Result<Stage, RecordError> {
        for event in GuardrailEventRecord::from_decision(request_id, phase, decision) {
            if event.action == EventAction::Pass && !self.pass_logging_enabled {
                continue;
            }
            self.guardrail_events.append(&event)?;
        }

        let record = InteractionRecord::from_decision(request_id, phase, decision);
        let stage = record.stage;
        self.interactions.append(&record)?;
        Ok(stage)
    }

    /// Record the invocation result, then mark telemetry as persisted
    pub fn record_invocation(
        &self,
        request_id: Uuid,
        outcome: &InvocationOutcome,
    ) -> Result<(), RecordError> {
        self.telemetry
            .append(&TelemetryRecord::from_outcome(request_id, outcome))?;
        self.record_stage(request_id, Stage::TelemetryPersisted)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::audit::records::TokenUsage;
    use crate::logic::guardrail::{evaluate, RuleSet};
    use crate::logic::store::MemoryLogStore;

    fn outcome() -> InvocationOutcome {
        InvocationOutcome {
            model: "gpt-4o-mini".to_string(),
            success: true,
            latency_ms: 840,
            tokens: TokenUsage::new(42, 128),
            cost_usd: 0.0011,
            error: None,
        }
    }

    #[test]
    fn test_blocked_input_trail() {
        let trail = AuditTrail::new(Arc::new(MemoryLogStore::new()), true);
        let id = Uuid::new_v4();
        let decision = evaluate("my password is secret123", Phase::Input, &RuleSet::with_defaults());

        trail.record_stage(id, Stage::RequestReceived).unwrap();
        let stage = trail.record_decision(id, Phase::Input, &decision).unwrap();

        assert_eq!(stage, Stage::GuardrailInputBlocked);
        let stages: Vec<Stage> = trail.interactions.read_all().unwrap().iter().map(|r| r.stage).collect();
        assert_eq!(stages, vec![Stage::RequestReceived, Stage::GuardrailInputBlocked]);

        let events = trail.guardrail_events.read_all().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, EventAction::Blocked);
        assert_eq!(events[0].rule_triggered, "block_sensitive_words");
    }

    #[test]
    fn test_pass_events_skipped_when_disabled() {
        let content = "internal docs at http://localhost/wiki";
        let decision = evaluate(content, Phase::Output, &RuleSet::with_defaults());
        assert!(decision.triggered);

        let quiet = AuditTrail::new(Arc::new(MemoryLogStore::new()), false);
        let id = Uuid::new_v4();
        quiet.record_decision(id, Phase::Output, &decision).unwrap();
        assert!(quiet.guardrail_events.read_all().unwrap().is_empty());
        assert_eq!(quiet.interactions.read_all().unwrap().len(), 1);

        let verbose = AuditTrail::new(Arc::new(MemoryLogStore::new()), true);
        verbose.record_decision(id, Phase::Output, &decision).unwrap();
        let events = verbose.guardrail_events.read_all().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, EventAction::Pass);
    }

    #[test]
    fn test_invocation_writes_telemetry_and_stage() {
        let trail = AuditTrail::new(Arc::new(MemoryLogStore::new()), true);
        let id = Uuid::new_v4();
        trail.record_invocation(id, &outcome()).unwrap();

        let telemetry = trail.telemetry.read_all().unwrap();
        assert_eq!(telemetry.len(), 1);
        assert_eq!(telemetry[0].request_id, Some(id));
        assert_eq!(telemetry[0].tokens.total, 170);

        let stages = trail.interactions.read_all().unwrap();
        assert_eq!(stages[0].stage, Stage::TelemetryPersisted);
    }

    #[test]
    fn test_open_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = AuditConfig {
            log_dir: dir.path().to_path_buf(),
            ..AuditConfig::default()
        };
        let trail = AuditTrail::open(&config).unwrap();
        trail.record_stage(Uuid::new_v4(), Stage::RequestReceived).unwrap();
        assert!(dir.path().join("interactions.json").exists());
    }
}
