//! Guardrail Types
//!
//! Core types for content rules and decisions.
//! No evaluation logic here - only data structures.

use serde::{Deserialize, Serialize};

// ============================================================================
// RULE TYPES
// ============================================================================

/// Severity attached to a rule (and to every event it produces)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low = 1,
    Medium = 2,
    High = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// Which content a rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Input,
    Output,
    Both,
}

impl Scope {
    /// Does a rule with this scope apply during `phase`?
    pub fn covers(&self, phase: Phase) -> bool {
        matches!(
            (self, phase),
            (Scope::Both, _) | (Scope::Input, Phase::Input) | (Scope::Output, Phase::Output)
        )
    }
}

/// What a triggered rule asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    /// Refuse the content outright
    Block,
    /// Redact matched spans and let the rest through
    Modify,
    /// Record the match, change nothing
    LogOnly,
}

impl RuleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleAction::Block => "block",
            RuleAction::Modify => "modify",
            RuleAction::LogOnly => "log_only",
        }
    }

    /// Contribution of this action to the final decision
    pub fn outcome(&self) -> DecisionAction {
        match self {
            RuleAction::Block => DecisionAction::Block,
            RuleAction::Modify => DecisionAction::Modify,
            RuleAction::LogOnly => DecisionAction::Pass,
        }
    }
}

/// A single content-matching rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    /// Regular expression, matched case-insensitively
    pub pattern: String,
    pub severity: Severity,
    pub scope: Scope,
    pub action: RuleAction,
}

impl Rule {
    pub fn new(id: &str, pattern: &str, severity: Severity, scope: Scope, action: RuleAction) -> Self {
        Self {
            id: id.to_string(),
            pattern: pattern.to_string(),
            severity,
            scope,
            action,
        }
    }

    /// Synthetic id reported when this rule's pattern does not compile
    pub fn malformed_id(&self) -> String {
        format!("invalid_pattern:{}", self.id)
    }
}

// ============================================================================
// PHASE
// ============================================================================

/// Pipeline phase being evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Request content, before the model is invoked
    Input,
    /// Model response, before it is released
    Output,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Input => "input",
            Phase::Output => "output",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// DECISION
// ============================================================================

/// Final action of one evaluation. Ordered so that the worst outcome is the max.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    Pass = 0,
    Modify = 1,
    Block = 2,
}

impl DecisionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionAction::Pass => "pass",
            DecisionAction::Modify => "modify",
            DecisionAction::Block => "block",
        }
    }
}

impl std::fmt::Display for DecisionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One triggered rule inside a decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleFinding {
    /// Declared rule id, or the synthetic id for a malformed pattern
    pub rule_id: String,
    pub severity: Severity,
    pub action: RuleAction,
    /// Matched spans (0 for malformed rules)
    pub match_count: usize,
    /// Pattern failed to compile; the finding is a fail-closed block
    pub malformed: bool,
    /// Compiler message for malformed patterns
    pub error: Option<String>,
}

/// Result of evaluating content against a rule set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub triggered: bool,
    /// Rule ids in evaluation order
    pub triggered_rules: Vec<String>,
    pub action: DecisionAction,
    /// Redacted content, present only when the action is Modify
    pub sanitized_content: Option<String>,
    pub findings: Vec<RuleFinding>,
}

impl Decision {
    pub fn pass() -> Self {
        Self {
            triggered: false,
            triggered_rules: Vec::new(),
            action: DecisionAction::Pass,
            sanitized_content: None,
            findings: Vec::new(),
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.action == DecisionAction::Block
    }

    pub fn is_modified(&self) -> bool {
        self.action == DecisionAction::Modify
    }

    /// Content the pipeline may forward, `None` when blocked
    pub fn releasable<'a>(&'a self, original: &'a str) -> Option<&'a str> {
        match self.action {
            DecisionAction::Block => None,
            DecisionAction::Modify => self.sanitized_content.as_deref(),
            DecisionAction::Pass => Some(original),
        }
    }
}

impl Default for Decision {
    fn default() -> Self {
        Self::pass()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_covers_phase() {
        assert!(Scope::Both.covers(Phase::Input));
        assert!(Scope::Both.covers(Phase::Output));
        assert!(Scope::Input.covers(Phase::Input));
        assert!(!Scope::Input.covers(Phase::Output));
        assert!(!Scope::Output.covers(Phase::Input));
    }

    #[test]
    fn test_worst_action_is_max() {
        let worst = [DecisionAction::Modify, DecisionAction::Block, DecisionAction::Pass]
            .into_iter()
            .max()
            .unwrap();
        assert_eq!(worst, DecisionAction::Block);
        assert!(DecisionAction::Modify > DecisionAction::Pass);
    }

    #[test]
    fn test_rule_deserialize_snake_case() {
        let json = r#"{"id":"r1","pattern":"foo","severity":"high","scope":"both","action":"log_only"}"#;
        let rule: Rule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.severity, Severity::High);
        assert_eq!(rule.scope, Scope::Both);
        assert_eq!(rule.action, RuleAction::LogOnly);
        assert_eq!(rule.malformed_id(), "invalid_pattern:r1");
    }

    #[test]
    fn test_releasable_content() {
        let mut decision = Decision::pass();
        assert_eq!(decision.releasable("hello"), Some("hello"));

        decision.action = DecisionAction::Modify;
        decision.sanitized_content = Some("[REDACTED]".to_string());
        assert_eq!(decision.releasable("hello"), Some("[REDACTED]"));

        decision.action = DecisionAction::Block;
        assert_eq!(decision.releasable("hello"), None);
    }
}
