//! Rule registration, execution, and error-message resolution.
//!
//! The pieces here are pure: the registry maps names to predicates, the
//! runner executes one declared rule set against a value snapshot, and the
//! resolver folds the competing error sources into the displayed message
//! list. State lives with the fields and the session, never here.

mod builtins;
mod registry;
mod resolver;
mod result;
mod runner;

pub use registry::{RuleFn, RuleOutcome, RuleRegistry, add_rule};
pub use result::ValidationResult;
pub use runner::{CustomRuleFn, FailedRule, RuleOutcomes, RuleSpec, Validations, run_rules};

pub(crate) use resolver::{MessageSources, resolve_messages};
