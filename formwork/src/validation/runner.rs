//! Rule execution for one declared rule set.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::registry::{RuleOutcome, RuleRegistry};
use crate::error::ConfigError;
use crate::model::Values;

/// An ad-hoc rule predicate: `(all values, field value)`.
pub type CustomRuleFn = Arc<dyn Fn(&Values, &Value) -> RuleOutcome + Send + Sync>;

/// How a declared rule name resolves, decided once at declaration time.
#[derive(Clone)]
pub enum RuleSpec {
    /// Invoke the registered rule of this name with these arguments.
    Args(Value),
    /// Invoke this ad-hoc predicate. The name must not shadow a registered
    /// rule.
    Custom(CustomRuleFn),
}

/// An ordered rule declaration set.
///
/// Declaration order is preserved: it drives message ordering and the
/// "first succeeded requirement rule" lookup. Re-declaring a name replaces
/// the earlier entry in place.
#[derive(Clone, Default)]
pub struct Validations {
    rules: Vec<(String, RuleSpec)>,
}

impl Validations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a named rule with arguments.
    pub fn rule(mut self, name: impl Into<String>, args: impl Into<Value>) -> Self {
        self.insert(name.into(), RuleSpec::Args(args.into()));
        self
    }

    /// Declare an ad-hoc predicate under its own name.
    pub fn custom<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Values, &Value) -> RuleOutcome + Send + Sync + 'static,
    {
        self.insert(name.into(), RuleSpec::Custom(Arc::new(predicate)));
        self
    }

    /// Insert or replace a declaration, keeping the original position on
    /// replace.
    pub fn insert(&mut self, name: String, spec: RuleSpec) {
        match self.rules.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = spec,
            None => self.rules.push((name, spec)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (String, RuleSpec)> {
        self.rules.iter()
    }
}

/// A rule that did not pass, with the arguments it ran with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedRule {
    pub name: String,
    pub args: Option<Value>,
}

/// The bookkeeping of one rule-set run.
///
/// `errors` collects explicit messages returned by rules, `failed` the
/// descriptors the resolver turns into templated messages, and `success`
/// the named rules that passed. Ad-hoc predicates never populate
/// `success` — only the named path counts toward "requirement satisfied".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuleOutcomes {
    pub errors: Vec<String>,
    pub failed: Vec<FailedRule>,
    pub success: Vec<String>,
}

/// Run every rule in `validations` against `(all_values, value)`.
///
/// Fails fast with a [`ConfigError`] on a declaration that cannot run: an
/// ad-hoc predicate shadowing a registered name, or a named rule that is
/// not registered.
pub fn run_rules(
    registry: &RuleRegistry,
    all_values: &Values,
    value: &Value,
    validations: &Validations,
) -> Result<RuleOutcomes, ConfigError> {
    let mut outcomes = RuleOutcomes::default();

    for (name, spec) in validations.iter() {
        match spec {
            RuleSpec::Custom(predicate) => {
                if registry.contains(name) {
                    return Err(ConfigError::ReservedRuleName(name.clone()));
                }
                match predicate(all_values, value) {
                    RuleOutcome::Message(message) => {
                        outcomes.errors.push(message);
                        outcomes.failed.push(FailedRule {
                            name: name.clone(),
                            args: None,
                        });
                    }
                    RuleOutcome::Fail => outcomes.failed.push(FailedRule {
                        name: name.clone(),
                        args: None,
                    }),
                    RuleOutcome::Pass => {}
                }
            }
            RuleSpec::Args(args) => {
                let Some(rule) = registry.lookup(name) else {
                    return Err(ConfigError::UnknownRule(name.clone()));
                };
                match rule(all_values, value, args) {
                    RuleOutcome::Message(message) => {
                        outcomes.errors.push(message);
                        outcomes.failed.push(FailedRule {
                            name: name.clone(),
                            args: Some(args.clone()),
                        });
                    }
                    RuleOutcome::Fail => outcomes.failed.push(FailedRule {
                        name: name.clone(),
                        args: Some(args.clone()),
                    }),
                    RuleOutcome::Pass => outcomes.success.push(name.clone()),
                }
            }
        }
    }

    Ok(outcomes)
}
