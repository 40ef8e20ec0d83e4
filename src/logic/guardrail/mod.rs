//! Guardrail Module
//!
//! Decides pass / modify / block for request and response content.
//! Evaluation never touches the audit logs - recording is the caller's job.
//!
//! ## Structure
//! - `types`: Core types (Rule, Scope, Phase, Decision)
//! - `rules`: Built-in rules and rule set validation
//! - `cache`: Process-wide compiled pattern cache
//! - `engine`: Evaluation logic
//!
//! ## Usage
//! ```ignore
//! use guardrail_audit::logic::guardrail::{GuardrailEngine, Phase};
//!
//! let engine = GuardrailEngine::default();
//! let decision = engine.evaluate_with_custom(prompt, Phase::Input, custom_rules)?;
//! if decision.is_blocked() {
//!     return blocked_response(&decision.triggered_rules);
//! }
//! ```

pub mod types;
pub mod rules;
pub mod cache;
pub mod engine;

pub use types::{
    Rule,
    Severity,
    Scope,
    RuleAction,
    Phase,
    Decision,
    DecisionAction,
    RuleFinding,
};

pub use rules::{builtin_rules, RuleSet, RuleSetError};

pub use cache::PatternCache;

pub use engine::{evaluate, evaluate_with_cache, GuardrailEngine};
