//! Correlation Checker
//!
//! Offline pass over the three logs. Loads each log independently, groups
//! records by correlation id and checks cross-log invariants.
//! Reads only; never writes to any log.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::constants::{GUARDRAIL_EVENTS_LOG, INTERACTIONS_LOG, TELEMETRY_LOG};
use crate::logic::audit::{EventAction, Stage};
use crate::logic::store::LogStore;
use super::types::*;

// ============================================================================
// LENIENT VIEWS
// ============================================================================
// Only the fields the checks need; everything optional so legacy and
// partially written records still load.

#[derive(Debug, Default, Deserialize)]
struct InteractionView {
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    stage: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EventView {
    #[serde(default)]
    event_id: Option<String>,
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    action: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TelemetryView {
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    telemetry_id: Option<String>,
}

fn non_empty(id: Option<String>) -> Option<String> {
    id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[derive(Debug, Default)]
struct Bucket {
    stages: HashSet<Stage>,
    interactions: usize,
    guardrail_events: usize,
    blocked_events: usize,
    telemetry: usize,
}

// ============================================================================
// AUDITOR
// ============================================================================

pub struct CorrelationAuditor {
    store: Arc<dyn LogStore>,
    options: CheckOptions,
}

impl CorrelationAuditor {
    pub fn new(store: Arc<dyn LogStore>, options: CheckOptions) -> Self {
        Self { store, options }
    }

    pub fn check(&self) -> CorrelationReport {
        check(self.store.as_ref(), &self.options)
    }
}

/// Run every correlation check against the persisted logs
pub fn check(store: &dyn LogStore, options: &CheckOptions) -> CorrelationReport {
    let mut summary = CorrelationSummary::default();

    let interactions: Vec<InteractionView> = load(store, INTERACTIONS_LOG, &mut summary);
    let events: Vec<EventView> = load(store, GUARDRAIL_EVENTS_LOG, &mut summary);
    let telemetry: Vec<TelemetryView> = load(store, TELEMETRY_LOG, &mut summary);

    // Group by correlation id; BTreeMap keeps the issue order stable
    let mut buckets: BTreeMap<String, Bucket> = BTreeMap::new();

    for record in interactions {
        let Some(id) = non_empty(record.request_id) else {
            summary.uncorrelated_records += 1;
            continue;
        };
        let bucket = buckets.entry(id).or_default();
        bucket.interactions += 1;
        if let Some(stage) = record.stage.as_deref().and_then(Stage::parse) {
            bucket.stages.insert(stage);
        }
    }

    let mut event_ids: HashMap<String, (usize, String)> = HashMap::new();
    let mut duplicate_order: Vec<String> = Vec::new();

    for record in events {
        match record.action.as_deref().map(|a| a.trim().to_lowercase()).as_deref() {
            Some("blocked") => summary.guardrail_actions.blocked += 1,
            Some("modified") => summary.guardrail_actions.modified += 1,
            Some("pass") => summary.guardrail_actions.pass += 1,
            _ => summary.guardrail_actions.other += 1,
        }
        let blocked = record
            .action
            .as_deref()
            .map_or(false, |a| a.trim().eq_ignore_ascii_case(EventAction::Blocked.as_str()));

        let Some(id) = non_empty(record.request_id) else {
            summary.uncorrelated_records += 1;
            continue;
        };

        if let Some(event_id) = non_empty(record.event_id) {
            let seen = event_ids.entry(event_id.clone()).or_insert((0, id.clone()));
            seen.0 += 1;
            if seen.0 == 2 {
                duplicate_order.push(event_id);
            }
        }

        let bucket = buckets.entry(id).or_default();
        bucket.guardrail_events += 1;
        if blocked {
            bucket.blocked_events += 1;
        }
    }

    for record in telemetry {
        let request_id = non_empty(record.request_id);
        let id = match request_id {
            Some(id) => id,
            None => match non_empty(record.telemetry_id) {
                Some(legacy) => {
                    summary.legacy_telemetry_entries += 1;
                    legacy
                }
                None => {
                    summary.uncorrelated_records += 1;
                    continue;
                }
            },
        };
        buckets.entry(id).or_default().telemetry += 1;
    }

    // Per-request invariants
    let mut issues = Vec::new();
    for (id, bucket) in &buckets {
        check_bucket(id, bucket, &mut issues);
    }

    summary.total_requests = buckets.len();
    summary.requests_with_interactions = buckets.values().filter(|b| b.interactions > 0).count();
    summary.requests_with_guardrail_events = buckets.values().filter(|b| b.guardrail_events > 0).count();
    summary.requests_with_telemetry = buckets.values().filter(|b| b.telemetry > 0).count();

    // Repeated appends (retries) show up as repeated event ids
    summary.duplicate_event_ids = duplicate_order.len();
    for event_id in duplicate_order {
        if let Some((count, request_id)) = event_ids.get(&event_id) {
            issues.push(Issue::new(
                request_id,
                IssueKind::DuplicateEvent,
                format!("{} appended {} times", event_id, count),
            ));
        }
    }

    // Deployment-wide logging policy
    if !options.pass_logging_enabled && summary.guardrail_actions.pass > 0 {
        issues.push(Issue::new(
            DEPLOYMENT_WIDE,
            IssueKind::UnexpectedPassEvents,
            format!(
                "{} pass events logged while pass logging is disabled",
                summary.guardrail_actions.pass
            ),
        ));
    }

    summary.total_issues = issues.len();
    issues.truncate(options.max_reported_issues);

    log::info!(
        "Correlation check: {} requests, {} issues, {} unreadable logs",
        summary.total_requests,
        summary.total_issues,
        summary.parse_errors.len()
    );

    CorrelationReport { summary, issues }
}

fn check_bucket(id: &str, bucket: &Bucket, issues: &mut Vec<Issue>) {
    let has = |stage: Stage| bucket.stages.contains(&stage);

    if !has(Stage::RequestReceived) {
        issues.push(Issue::new(id, IssueKind::MissingStage, Stage::RequestReceived.as_str()));
    }

    if bucket.telemetry > 0 && !has(Stage::LlmInvocationEnd) && !has(Stage::GuardrailInputBlocked) {
        issues.push(Issue::new(
            id,
            IssueKind::MissingCompletionStage,
            Stage::LlmInvocationEnd.as_str(),
        ));
    }

    if bucket.blocked_events > 0
        && !has(Stage::GuardrailInputBlocked)
        && !has(Stage::GuardrailOutputModified)
    {
        issues.push(Issue::new(
            id,
            IssueKind::BlockedWithoutStage,
            Stage::GuardrailInputBlocked.as_str(),
        ));
    }
}

/// Read one log; an unreadable log is reported and treated as empty
fn load<T: DeserializeOwned>(
    store: &dyn LogStore,
    log: &str,
    summary: &mut CorrelationSummary,
) -> Vec<T> {
    let values = match store.read_all(log) {
        Ok(values) => values,
        Err(e) => {
            log::warn!("Correlation check: log '{}' unreadable, treating as empty: {}", log, e);
            summary.parse_errors.push(LogParseError {
                log: log.to_string(),
                error: e.to_string(),
            });
            return Vec::new();
        }
    };

    let mut records = Vec::with_capacity(values.len());
    for value in values {
        match view::<T>(value) {
            Some(record) => records.push(record),
            None => summary.malformed_records += 1,
        }
    }
    records
}

fn view<T: DeserializeOwned>(value: Value) -> Option<T> {
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value).ok()
}
