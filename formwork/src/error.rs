//! Error types.

use thiserror::Error;

/// A rule declaration that can never produce a meaningful validation run.
///
/// These are programmer errors: they are returned immediately from the
/// validation entry points and are never caught or retried by the engine.
/// A field *failing* its rules is not an error — that outcome travels
/// through [`ValidationResult`](crate::validation::ValidationResult) and
/// session callbacks instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An ad-hoc predicate was declared under a name that is already a
    /// registered rule. Named rules and ad-hoc predicates may not share a
    /// name.
    #[error("`{0}` is a registered validation rule and cannot be redeclared as an ad-hoc predicate")]
    ReservedRuleName(String),

    /// A declared rule name matches no registered rule.
    #[error("unknown validation rule `{0}`")]
    UnknownRule(String),
}

/// An external-error injection named a field that is not attached.
///
/// Raised by [`Session::update_inputs_with_error`](crate::session::Session::update_inputs_with_error);
/// treated as a programmer error, not a recoverable condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no attached field is named `{name}`")]
pub struct LookupError {
    /// The field name that could not be found.
    pub name: String,
}
