//! The named-rule registry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use serde_json::Value;

use super::builtins;
use crate::model::Values;

/// What a rule evaluation reports back.
///
/// Mirrors the `bool | String` contract of rule predicates: `Pass`, a bare
/// failure, or a failure that carries its own message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// The value satisfies the rule.
    Pass,
    /// The value fails the rule; message resolution falls back to the
    /// field's templates.
    Fail,
    /// The value fails the rule with an explicit message that outranks
    /// every template.
    Message(String),
}

impl RuleOutcome {
    /// Whether this outcome counts as a pass.
    pub fn passed(&self) -> bool {
        matches!(self, RuleOutcome::Pass)
    }
}

impl From<bool> for RuleOutcome {
    fn from(passed: bool) -> Self {
        if passed {
            RuleOutcome::Pass
        } else {
            RuleOutcome::Fail
        }
    }
}

impl From<String> for RuleOutcome {
    fn from(message: String) -> Self {
        RuleOutcome::Message(message)
    }
}

impl From<&str> for RuleOutcome {
    fn from(message: &str) -> Self {
        RuleOutcome::Message(message.to_string())
    }
}

/// A registered rule predicate: `(all values, field value, rule args)`.
pub type RuleFn = Arc<dyn Fn(&Values, &Value, &Value) -> RuleOutcome + Send + Sync>;

static GLOBAL: Lazy<Arc<RuleRegistry>> = Lazy::new(|| Arc::new(RuleRegistry::with_builtins()));

/// Process-wide mapping from rule name to predicate.
///
/// Seeded with the built-in rules and extended through [`add_rule`]
/// (`RuleRegistry::add_rule`); rules are never removed. Sessions capture a
/// registry handle at construction and pass it explicitly into the rule
/// runner — nothing deeper in the call stack reaches for ambient state.
pub struct RuleRegistry {
    rules: RwLock<HashMap<String, RuleFn>>,
}

impl RuleRegistry {
    /// Create an empty registry. Most callers want [`with_builtins`]
    /// (`RuleRegistry::with_builtins`) instead.
    pub fn empty() -> Self {
        Self {
            rules: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry seeded with the built-in rule set.
    pub fn with_builtins() -> Self {
        let registry = Self::empty();
        builtins::install(&registry);
        registry
    }

    /// The shared process-wide registry, seeded with built-ins on first use.
    pub fn global() -> Arc<RuleRegistry> {
        Arc::clone(&GLOBAL)
    }

    /// Install a rule under `name`.
    ///
    /// An existing rule (built-in or otherwise) is not silently overridden:
    /// without `force` the call is rejected with a warning and the registry
    /// is left unchanged.
    pub fn add_rule<F>(&self, name: &str, rule: F, force: bool)
    where
        F: Fn(&Values, &Value, &Value) -> RuleOutcome + Send + Sync + 'static,
    {
        if !force && self.contains(name) {
            log::warn!("a validation rule named `{name}` already exists; pass force to override");
            return;
        }
        if let Ok(mut rules) = self.rules.write() {
            rules.insert(name.to_string(), Arc::new(rule));
        }
    }

    /// Look up a rule by name.
    pub fn lookup(&self, name: &str) -> Option<RuleFn> {
        match self.rules.read() {
            Ok(rules) => rules.get(name).cloned(),
            Err(poisoned) => poisoned.into_inner().get(name).cloned(),
        }
    }

    /// Whether a rule with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        match self.rules.read() {
            Ok(rules) => rules.contains_key(name),
            Err(poisoned) => poisoned.into_inner().contains_key(name),
        }
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Register a rule on the process-wide registry.
///
/// Convenience over `RuleRegistry::global().add_rule(..)`.
pub fn add_rule<F>(name: &str, rule: F, force: bool)
where
    F: Fn(&Values, &Value, &Value) -> RuleOutcome + Send + Sync + 'static,
{
    RuleRegistry::global().add_rule(name, rule, force);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_seeded() {
        let registry = RuleRegistry::with_builtins();
        assert!(registry.contains("isEmail"));
        assert!(registry.contains("isExisty"));
        assert!(registry.lookup("noSuchRule").is_none());
    }

    #[test]
    fn test_duplicate_without_force_is_rejected() {
        let registry = RuleRegistry::with_builtins();
        registry.add_rule("isEmail", |_, _, _| RuleOutcome::Pass, false);

        // Registry unchanged: the built-in still rejects a plain word.
        let rule = registry.lookup("isEmail").unwrap();
        let values = Values::new();
        let outcome = rule(&values, &Value::String("not-an-email".into()), &Value::Bool(true));
        assert!(!outcome.passed());
    }

    #[test]
    fn test_duplicate_with_force_overrides() {
        let registry = RuleRegistry::with_builtins();
        registry.add_rule("isEmail", |_, _, _| RuleOutcome::Pass, true);

        let rule = registry.lookup("isEmail").unwrap();
        let values = Values::new();
        let outcome = rule(&values, &Value::String("not-an-email".into()), &Value::Bool(true));
        assert!(outcome.passed());
    }

    #[test]
    fn test_new_rule_installs_without_force() {
        let registry = RuleRegistry::with_builtins();
        registry.add_rule("isEven", |_, value, _| {
            value.as_i64().map(|n| n % 2 == 0).unwrap_or(false).into()
        }, false);

        assert!(registry.contains("isEven"));
    }
}
