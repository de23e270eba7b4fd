//! Field controllers.
//!
//! A [`Field`] is the engine-facing state of one input: the declared spec
//! (name, initial value, rule sets, message templates) plus the live state
//! the validation engine writes back. Fields are cheap-to-clone handles;
//! every clone shares the same state, and identity is the process-unique
//! id, never the name.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};

use serde_json::Value;

use crate::error::ConfigError;
use crate::model::Values;
use crate::session::{Session, SessionInner};
use crate::validation::{RuleOutcome, RuleSpec, ValidationResult, Validations};

/// Unique identifier for a field controller instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldId(usize);

impl FieldId {
    fn next() -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

/// A field-level override predicate: `(all values, field value) -> passes`.
pub type ValidateFn = Arc<dyn Fn(&Values, &Value) -> bool + Send + Sync>;

/// The declaration a field is built from.
///
/// Everything here is fixed at construction; live state (current value,
/// validity, pristine tracking) belongs to the [`Field`] handle.
pub struct FieldSpec {
    /// Field name; `.`-delimited segments nest in the value model.
    pub name: String,
    /// Initial value, restored on reset.
    pub value: Value,
    /// Standard rule set.
    pub validations: Validations,
    /// Presence-requirement rule set. A satisfied requirement forces the
    /// field invalid until the standard rules also pass.
    pub required_validations: Validations,
    /// Default message template for failed rules without their own entry.
    pub validation_error: Option<String>,
    /// Per-rule message templates; also the required-error map, keyed by
    /// the satisfied requirement rule's name.
    pub validation_errors: HashMap<String, String>,
    /// Optional override predicate replacing the standard rule set's
    /// failure bookkeeping.
    pub validate: Option<ValidateFn>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Value::Null,
            validations: Validations::new(),
            required_validations: Validations::new(),
            validation_error: None,
            validation_errors: HashMap::new(),
            validate: None,
        }
    }

    /// Set the initial value.
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    /// Declare a named rule with arguments.
    pub fn validation(mut self, name: impl Into<String>, args: impl Into<Value>) -> Self {
        self.validations.insert(name.into(), RuleSpec::Args(args.into()));
        self
    }

    /// Declare an ad-hoc predicate under its own name.
    pub fn custom_validation<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Values, &Value) -> RuleOutcome + Send + Sync + 'static,
    {
        self.validations
            .insert(name.into(), RuleSpec::Custom(Arc::new(predicate)));
        self
    }

    /// Declare a presence-requirement rule.
    pub fn required(mut self, name: impl Into<String>, args: impl Into<Value>) -> Self {
        self.required_validations
            .insert(name.into(), RuleSpec::Args(args.into()));
        self
    }

    /// Set the default message template.
    pub fn validation_error(mut self, template: impl Into<String>) -> Self {
        self.validation_error = Some(template.into());
        self
    }

    /// Set the message template for one rule (or requirement rule).
    pub fn error_message(mut self, rule: impl Into<String>, message: impl Into<String>) -> Self {
        self.validation_errors.insert(rule.into(), message.into());
        self
    }

    /// Install a field-level override predicate.
    pub fn validate_with<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Values, &Value) -> bool + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(predicate));
        self
    }
}

struct FieldInner {
    value: Value,
    is_pristine: bool,
    form_submitted: bool,
    is_valid: bool,
    is_required: bool,
    validation_error: Vec<String>,
    external_error: Option<Vec<String>>,
    session: Weak<SessionInner>,
}

/// A field controller handle.
pub struct Field {
    id: FieldId,
    spec: Arc<FieldSpec>,
    inner: Arc<RwLock<FieldInner>>,
}

impl Field {
    /// Create a detached controller. Attach it with
    /// [`Session::attach`](crate::session::Session::attach) (or build it
    /// attached via [`Session::create_field`](crate::session::Session::create_field)).
    pub fn new(spec: FieldSpec) -> Self {
        let value = spec.value.clone();
        Self {
            id: FieldId::next(),
            spec: Arc::new(spec),
            inner: Arc::new(RwLock::new(FieldInner {
                value,
                is_pristine: true,
                form_submitted: false,
                is_valid: true,
                is_required: false,
                validation_error: Vec::new(),
                external_error: None,
                session: Weak::new(),
            })),
        }
    }

    pub fn id(&self) -> FieldId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &FieldSpec {
        &self.spec
    }

    // -------------------------------------------------------------------
    // Live state
    // -------------------------------------------------------------------

    /// The current value.
    pub fn value(&self) -> Value {
        self.read(|inner| inner.value.clone())
    }

    /// Set the value and re-run validation through the bound session.
    pub fn set_value(&self, value: impl Into<Value>) -> Result<(), ConfigError> {
        self.write(|inner| {
            inner.value = value.into();
            inner.is_pristine = false;
        });
        self.notify()
    }

    /// Restore the declared initial value, marking the field pristine.
    pub fn reset_value(&self) -> Result<(), ConfigError> {
        self.write(|inner| {
            inner.value = self.spec.value.clone();
            inner.is_pristine = true;
        });
        self.notify()
    }

    pub fn is_valid(&self) -> bool {
        self.read(|inner| inner.is_valid)
    }

    pub fn is_required(&self) -> bool {
        self.read(|inner| inner.is_required)
    }

    pub fn is_pristine(&self) -> bool {
        self.read(|inner| inner.is_pristine)
    }

    /// Whether the owning form has been submitted since the field was last
    /// pristine.
    pub fn is_form_submitted(&self) -> bool {
        self.read(|inner| inner.form_submitted)
    }

    /// The displayed message list: the external error when one is set,
    /// otherwise the locally resolved messages.
    pub fn errors(&self) -> Vec<String> {
        self.read(|inner| match &inner.external_error {
            Some(external) => external.clone(),
            None => inner.validation_error.clone(),
        })
    }

    /// First displayed message, if any.
    pub fn error_message(&self) -> Option<String> {
        self.errors().into_iter().next()
    }

    /// The raw external-error slot.
    pub fn external_error(&self) -> Option<Vec<String>> {
        self.read(|inner| inner.external_error.clone())
    }

    /// Whether the view should surface a "required" marker.
    pub fn show_required(&self) -> bool {
        self.is_required()
    }

    /// Whether the view should surface an error (requirement markers take
    /// precedence over error text).
    pub fn show_error(&self) -> bool {
        !self.show_required() && !self.is_valid()
    }

    // -------------------------------------------------------------------
    // Session plumbing
    // -------------------------------------------------------------------

    fn notify(&self) -> Result<(), ConfigError> {
        match self.session() {
            Some(session) => session.validate_field(self),
            None => Ok(()),
        }
    }

    pub(crate) fn session(&self) -> Option<Session> {
        self.read(|inner| inner.session.upgrade()).map(Session::from_inner)
    }

    pub(crate) fn bind_session(&self, session: Weak<SessionInner>) {
        self.write(|inner| inner.session = session);
    }

    pub(crate) fn unbind_session(&self) {
        self.write(|inner| inner.session = Weak::new());
    }

    pub(crate) fn apply_result(&self, result: &ValidationResult, external: Option<Vec<String>>) {
        self.write(|inner| {
            inner.is_valid = result.is_valid;
            inner.is_required = result.is_required;
            inner.validation_error = result.error.clone();
            inner.external_error = external;
        });
    }

    pub(crate) fn set_pristine_state(&self, form_submitted: bool, is_pristine: bool) {
        self.write(|inner| {
            inner.form_submitted = form_submitted;
            inner.is_pristine = is_pristine;
        });
    }

    pub(crate) fn write_value(&self, value: Value, is_pristine: bool) {
        self.write(|inner| {
            inner.value = value;
            inner.is_pristine = is_pristine;
        });
    }

    pub(crate) fn set_external_error(&self, messages: Vec<String>, still_valid: bool) {
        self.write(|inner| {
            inner.is_valid = still_valid;
            inner.external_error = Some(messages);
        });
    }

    fn read<R>(&self, f: impl FnOnce(&FieldInner) -> R) -> R {
        match self.inner.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    fn write<R>(&self, f: impl FnOnce(&mut FieldInner) -> R) -> R {
        match self.inner.write() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

impl Clone for Field {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            spec: Arc::clone(&self.spec),
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Identity comparison: two handles are equal when they share a controller.
impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Field {}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("id", &self.id)
            .field("name", &self.spec.name)
            .finish_non_exhaustive()
    }
}
