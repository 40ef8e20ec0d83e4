//! Guardrail Rule Sets
//!
//! Built-in rules plus validation of caller-supplied custom rules.
//! Custom rules are merged with the built-ins, never replace them.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use super::types::{Rule, RuleAction, Scope, Severity};

// ============================================================================
// BUILT-IN RULES
// ============================================================================

pub const BLOCK_SENSITIVE_WORDS: &str = "block_sensitive_words";
pub const BLOCK_PROMPT_INJECTION: &str = "block_prompt_injection";
pub const REDACT_EMAIL: &str = "redact_email";
pub const REDACT_CARD_NUMBER: &str = "redact_card_number";
pub const LOG_INTERNAL_URL: &str = "log_internal_url";

/// Compiled-in defaults, in evaluation order
pub fn builtin_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            BLOCK_SENSITIVE_WORDS,
            r"\b(password|passwd|api[_-]?key|secret[_-]?key|private[_-]?key)\b",
            Severity::High,
            Scope::Both,
            RuleAction::Block,
        ),
        Rule::new(
            BLOCK_PROMPT_INJECTION,
            r"ignore\s+(all\s+)?(previous|prior|above)\s+instructions",
            Severity::High,
            Scope::Input,
            RuleAction::Block,
        ),
        Rule::new(
            REDACT_EMAIL,
            r"[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}",
            Severity::Medium,
            Scope::Both,
            RuleAction::Modify,
        ),
        Rule::new(
            REDACT_CARD_NUMBER,
            r"\b(?:\d[ -]?){12,18}\d\b",
            Severity::High,
            Scope::Both,
            RuleAction::Modify,
        ),
        Rule::new(
            LOG_INTERNAL_URL,
            r"https?://(localhost|127\.0\.0\.1|10\.\d{1,3}\.\d{1,3}\.\d{1,3})",
            Severity::Low,
            Scope::Output,
            RuleAction::LogOnly,
        ),
    ]
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RuleSetError {
    #[error("rule at position {0} has an empty id")]
    EmptyRuleId(usize),

    #[error("duplicate rule id '{0}'")]
    DuplicateRuleId(String),

    #[error("failed to read rules file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse rules file: {0}")]
    Parse(#[from] serde_json::Error),
}

// ============================================================================
// RULE SET
// ============================================================================

/// Immutable rules for one evaluation: built-ins first, then custom rules
/// in caller order. Built-in and custom ids are separate namespaces.
#[derive(Debug, Clone)]
pub struct RuleSet {
    builtin: Arc<[Rule]>,
    custom: Vec<Rule>,
}

impl RuleSet {
    /// Build from a list of built-in rules (ids must be unique)
    pub fn new(builtin: Vec<Rule>) -> Result<Self, RuleSetError> {
        validate_ids(&builtin)?;
        Ok(Self {
            builtin: builtin.into(),
            custom: Vec::new(),
        })
    }

    /// Rule set holding only the compiled-in defaults
    pub fn with_defaults() -> Self {
        Self {
            builtin: builtin_rules().into(),
            custom: Vec::new(),
        }
    }

    /// Load built-in rules from a JSON array on disk
    pub fn from_json_file(path: &Path) -> Result<Self, RuleSetError> {
        let data = std::fs::read(path)?;
        let rules: Vec<Rule> = serde_json::from_slice(&data)?;
        log::info!("Loaded {} built-in rules from {:?}", rules.len(), path);
        Self::new(rules)
    }

    /// Same built-ins, with a request's custom rules appended.
    /// Patterns are not checked here; a bad pattern blocks at evaluation.
    pub fn with_custom(&self, custom: Vec<Rule>) -> Result<Self, RuleSetError> {
        validate_ids(&custom)?;
        Ok(Self {
            builtin: Arc::clone(&self.builtin),
            custom,
        })
    }

    pub fn builtin(&self) -> &[Rule] {
        &self.builtin
    }

    pub fn custom(&self) -> &[Rule] {
        &self.custom
    }

    /// All rules in evaluation order
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.builtin.iter().chain(self.custom.iter())
    }

    pub fn len(&self) -> usize {
        self.builtin.len() + self.custom.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn validate_ids(rules: &[Rule]) -> Result<(), RuleSetError> {
    let mut seen = HashSet::new();
    for (idx, rule) in rules.iter().enumerate() {
        if rule.id.trim().is_empty() {
            return Err(RuleSetError::EmptyRuleId(idx));
        }
        if !seen.insert(rule.id.as_str()) {
            return Err(RuleSetError::DuplicateRuleId(rule.id.clone()));
        }
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(id: &str, pattern: &str) -> Rule {
        Rule::new(id, pattern, Severity::Medium, Scope::Both, RuleAction::Block)
    }

    #[test]
    fn test_defaults_have_unique_ids() {
        let rules = builtin_rules();
        assert!(validate_ids(&rules).is_ok());
        assert_eq!(rules[0].id, BLOCK_SENSITIVE_WORDS);
    }

    #[test]
    fn test_custom_rules_follow_builtins() {
        let set = RuleSet::with_defaults()
            .with_custom(vec![custom("a", "x"), custom("b", "y")])
            .unwrap();
        let ids: Vec<&str> = set.iter().map(|r| r.id.as_str()).collect();
        let builtin_count = builtin_rules().len();
        assert_eq!(ids.len(), builtin_count + 2);
        assert_eq!(&ids[builtin_count..], &["a", "b"]);
        assert_eq!(set.builtin().len(), builtin_count);
    }

    #[test]
    fn test_custom_id_may_shadow_builtin() {
        let set = RuleSet::with_defaults()
            .with_custom(vec![custom(BLOCK_SENSITIVE_WORDS, "other")])
            .unwrap();
        let hits = set.iter().filter(|r| r.id == BLOCK_SENSITIVE_WORDS).count();
        assert_eq!(hits, 2);
    }

    #[test]
    fn test_reject_duplicate_custom_ids() {
        let result = RuleSet::with_defaults().with_custom(vec![custom("a", "x"), custom("a", "y")]);
        match result {
            Err(RuleSetError::DuplicateRuleId(id)) => assert_eq!(id, "a"),
            other => panic!("Expected DuplicateRuleId, got {:?}", other),
        }
    }

    #[test]
    fn test_reject_empty_id() {
        let result = RuleSet::with_defaults().with_custom(vec![custom("  ", "x")]);
        assert!(matches!(result, Err(RuleSetError::EmptyRuleId(0))));
    }

    #[test]
    fn test_load_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(
            &path,
            r#"[{"id":"no_foo","pattern":"foo","severity":"low","scope":"input","action":"block"}]"#,
        )
        .unwrap();

        let set = RuleSet::from_json_file(&path).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.builtin()[0].scope, Scope::Input);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = RuleSet::from_json_file(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(RuleSetError::Io(_))));
    }
}
