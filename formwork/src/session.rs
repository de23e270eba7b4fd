//! Form sessions.
//!
//! A [`Session`] owns the directory of attached fields and the aggregate
//! form state, and drives the validation engine: per-field runs, the
//! whole-form pass, submit/reset, and external-error injection. Everything
//! is synchronous — each operation completes, callbacks included, before
//! the triggering call returns. No user callback is ever invoked while a
//! lock is held, so callbacks may freely call back into the session.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::error::{ConfigError, LookupError};
use crate::field::{Field, FieldSpec};
use crate::model::{self, Values};
use crate::validation::{
    FailedRule, MessageSources, RuleRegistry, ValidationResult, resolve_messages, run_rules,
};

type ValidityCallback = Box<dyn Fn() + Send + Sync>;
type ChangeCallback = Box<dyn Fn(&Values, bool) + Send + Sync>;
type SubmitCallback = Box<dyn Fn(&Value, &Session) + Send + Sync>;
type MappingFn = Box<dyn Fn(&Values) -> Value + Send + Sync>;

/// Session configuration: callbacks and policy flags, supplied once at
/// construction.
#[derive(Default)]
pub struct SessionConfig {
    disabled: bool,
    prevent_external_invalidation: bool,
    validation_errors: Option<HashMap<String, Vec<String>>>,
    mapping: Option<MappingFn>,
    on_success: Option<ValidityCallback>,
    on_error: Option<ValidityCallback>,
    on_submit: Option<SubmitCallback>,
    on_valid_submit: Option<SubmitCallback>,
    on_invalid_submit: Option<SubmitCallback>,
    on_valid: Option<ValidityCallback>,
    on_invalid: Option<ValidityCallback>,
    on_change: Option<ChangeCallback>,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable the form; fields query this through
    /// [`Session::is_form_disabled`].
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// When set, externally injected errors leave the field locally valid,
    /// so the next validation pass can clear them.
    pub fn prevent_external_invalidation(mut self, prevent: bool) -> Self {
        self.prevent_external_invalidation = prevent;
        self
    }

    /// Install the session-level error override map: `field name ->
    /// messages`. A field named here is invalid regardless of its rules.
    pub fn validation_errors(mut self, errors: HashMap<String, Vec<String>>) -> Self {
        self.validation_errors = Some(errors);
        self
    }

    /// Add one entry to the session-level override map.
    pub fn validation_error(
        mut self,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.validation_errors
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), vec![message.into()]);
        self
    }

    /// Replace the dotted-path model mapper with a custom projection.
    pub fn mapping<F>(mut self, mapping: F) -> Self
    where
        F: Fn(&Values) -> Value + Send + Sync + 'static,
    {
        self.mapping = Some(Box::new(mapping));
        self
    }

    /// Reserved adapter hook; fired only through [`Session::notify_success`].
    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_success = Some(Box::new(callback));
        self
    }

    /// Reserved adapter hook; fired only through [`Session::notify_error`].
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Fired on every submit with the mapped model, before the
    /// valid/invalid branch.
    pub fn on_submit<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Value, &Session) + Send + Sync + 'static,
    {
        self.on_submit = Some(Box::new(callback));
        self
    }

    /// Fired on submit when the form is valid.
    pub fn on_valid_submit<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Value, &Session) + Send + Sync + 'static,
    {
        self.on_valid_submit = Some(Box::new(callback));
        self
    }

    /// Fired on submit when the form is invalid.
    pub fn on_invalid_submit<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Value, &Session) + Send + Sync + 'static,
    {
        self.on_invalid_submit = Some(Box::new(callback));
        self
    }

    /// Fired at the end of every whole-form pass that leaves every field
    /// valid.
    pub fn on_valid<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_valid = Some(Box::new(callback));
        self
    }

    /// Fired at the end of every whole-form pass that leaves any field
    /// invalid.
    pub fn on_invalid<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_invalid = Some(Box::new(callback));
        self
    }

    /// Fired on a field edit with the flat value model and whether any
    /// value differs from its pristine snapshot. Gated until the first
    /// whole-form pass completes.
    pub fn on_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Values, bool) + Send + Sync + 'static,
    {
        self.on_change = Some(Box::new(callback));
        self
    }
}

/// Aggregate form state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    /// Every attached field is valid.
    pub is_valid: bool,
    /// A submit is currently running (always back to false before
    /// [`Session::submit`] returns).
    pub is_submitting: bool,
    /// The first whole-form pass has completed; change notifications may
    /// fire. Never flips back.
    pub can_change: bool,
    /// The form has been marked dirty by a submit since it was last
    /// pristine.
    pub form_submitted: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            is_valid: true,
            is_submitting: false,
            can_change: false,
            form_submitted: false,
        }
    }
}

pub(crate) struct SessionInner {
    config: SessionConfig,
    registry: Arc<RuleRegistry>,
    fields: RwLock<Vec<Field>>,
    state: RwLock<SessionState>,
}

/// One form instance: the field directory plus aggregate state.
///
/// Cheap to clone; every clone shares the same session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Create a session backed by the process-wide rule registry.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_registry(config, RuleRegistry::global())
    }

    /// Create a session backed by an explicit registry.
    pub fn with_registry(config: SessionConfig, registry: Arc<RuleRegistry>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                config,
                registry,
                fields: RwLock::new(Vec::new()),
                state: RwLock::new(SessionState::default()),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<SessionInner>) -> Self {
        Self { inner }
    }

    // -------------------------------------------------------------------
    // Field directory
    // -------------------------------------------------------------------

    /// Attach a field controller.
    ///
    /// Identity-checked: a handle already in the directory is not appended
    /// again, but the field is validated either way.
    pub fn attach(&self, field: &Field) -> Result<(), ConfigError> {
        let appended = self.with_fields(|fields| {
            if fields.iter().any(|f| f == field) {
                false
            } else {
                fields.push(field.clone());
                true
            }
        });
        if appended {
            field.bind_session(Arc::downgrade(&self.inner));
            log::debug!("attached field `{}`", field.name());
        }
        self.validate_field(field)
    }

    /// Detach a field controller by identity, then re-run the whole-form
    /// pass.
    pub fn detach(&self, field: &Field) -> Result<(), ConfigError> {
        let removed = self.with_fields(|fields| {
            let before = fields.len();
            fields.retain(|f| f != field);
            fields.len() != before
        });
        if removed {
            field.unbind_session();
            log::debug!("detached field `{}`", field.name());
        }
        self.validate_form()
    }

    /// Build a field from a spec and attach it in one step.
    pub fn create_field(&self, spec: FieldSpec) -> Result<Field, ConfigError> {
        let field = Field::new(spec);
        self.attach(&field)?;
        Ok(field)
    }

    /// Snapshot of the directory in attach order.
    pub fn fields(&self) -> Vec<Field> {
        self.fields_snapshot()
    }

    // -------------------------------------------------------------------
    // Value model
    // -------------------------------------------------------------------

    /// The flat value model, materialized from the directory. Duplicate
    /// names are last-write-wins in attach order.
    pub fn current_values(&self) -> Values {
        self.fields_snapshot()
            .iter()
            .map(|field| (field.name().to_string(), field.value()))
            .collect()
    }

    /// The declared initial values.
    pub fn pristine_values(&self) -> Values {
        self.fields_snapshot()
            .iter()
            .map(|field| (field.name().to_string(), field.spec().value.clone()))
            .collect()
    }

    /// Whether any value differs from its pristine snapshot.
    pub fn is_changed(&self) -> bool {
        self.current_values() != self.pristine_values()
    }

    /// The mapped model: the custom mapping when configured, otherwise the
    /// dotted-path projection.
    pub fn model(&self) -> Value {
        let values = self.current_values();
        match &self.inner.config.mapping {
            Some(mapping) => mapping(&values),
            None => model::to_nested(&values),
        }
    }

    // -------------------------------------------------------------------
    // Validation engine
    // -------------------------------------------------------------------

    /// Pure per-field computation; mutates nothing.
    ///
    /// Runs both rule sets against a fresh value-model snapshot (or
    /// `value_override` in place of the field's current value), applies
    /// the field-level override predicate, and resolves messages.
    pub fn run_validation(
        &self,
        field: &Field,
        value_override: Option<&Value>,
    ) -> Result<ValidationResult, ConfigError> {
        let values = self.current_values();
        let current = field.value();
        let value = value_override.unwrap_or(&current);
        self.run_validation_snapshot(field, value, &values)
    }

    fn run_validation_snapshot(
        &self,
        field: &Field,
        value: &Value,
        values: &Values,
    ) -> Result<ValidationResult, ConfigError> {
        let spec = field.spec();
        let registry = &self.inner.registry;

        let mut outcomes = run_rules(registry, values, value, &spec.validations)?;
        let required = run_rules(registry, values, value, &spec.required_validations)?;

        if let Some(validate) = &spec.validate {
            outcomes.failed = if validate(values, value) {
                Vec::new()
            } else {
                vec![FailedRule {
                    name: "failed".to_string(),
                    args: None,
                }]
            };
        }

        let is_required =
            !spec.required_validations.is_empty() && !required.success.is_empty();
        let session_override = self
            .inner
            .config
            .validation_errors
            .as_ref()
            .and_then(|errors| errors.get(&spec.name));
        let rule_validity = outcomes.failed.is_empty() && session_override.is_none();

        let error = resolve_messages(MessageSources {
            rule_validity,
            is_required,
            outcomes: &outcomes,
            required_success: &required.success,
            session_override: session_override.map(Vec::as_slice),
            default_template: spec.validation_error.as_deref(),
            templates: &spec.validation_errors,
        });

        Ok(ValidationResult {
            is_required,
            // Presence requirements dominate rule outcomes.
            is_valid: if is_required { false } else { rule_validity },
            error,
        })
    }

    /// Validate one field after an edit, then re-run the whole-form pass
    /// (cross-field rules may read any value, so one edit can flip another
    /// field).
    ///
    /// Once the session's first pass has completed, fires the change
    /// callback before recomputing.
    pub fn validate_field(&self, field: &Field) -> Result<(), ConfigError> {
        if self.state().can_change {
            if let Some(on_change) = &self.inner.config.on_change {
                let values = self.current_values();
                let changed = values != self.pristine_values();
                on_change(&values, changed);
            }
        }

        let result = self.run_validation(field, None)?;
        field.apply_result(&result, None);
        self.validate_form()
    }

    /// The whole-form pass, in two explicit phases.
    ///
    /// Phase 1 recomputes every field against a single value-model
    /// snapshot, folding in external-error stickiness: a locally valid
    /// field with a set external slot is forced invalid and keeps the
    /// slot; an invalid slot-less field clears nothing. Phase 2 applies
    /// the scratch results, folds the aggregate, fires exactly one of the
    /// validity callbacks, and finally marks the session able to emit
    /// change notifications.
    pub fn validate_form(&self) -> Result<(), ConfigError> {
        let fields = self.fields_snapshot();
        let values = self.current_values();
        log::trace!("whole-form pass over {} field(s)", fields.len());

        let mut scratch = Vec::with_capacity(fields.len());
        for field in &fields {
            let current = field.value();
            let mut result = self.run_validation_snapshot(field, &current, &values)?;
            let external = field.external_error();
            if result.is_valid && external.is_some() {
                result.is_valid = false;
            }
            let kept = if result.is_valid { None } else { external };
            scratch.push((result, kept));
        }

        for (field, (result, external)) in fields.iter().zip(scratch) {
            field.apply_result(&result, external);
        }

        let all_valid = fields.iter().all(Field::is_valid);
        self.update_state(|state| state.is_valid = all_valid);

        let callback = if all_valid {
            &self.inner.config.on_valid
        } else {
            &self.inner.config.on_invalid
        };
        if let Some(callback) = callback {
            callback();
        }

        self.update_state(|state| state.can_change = true);
        Ok(())
    }

    /// Probe a candidate value without touching any state.
    pub fn is_valid_value(&self, field: &Field, value: &Value) -> Result<bool, ConfigError> {
        self.run_validation(field, Some(value))
            .map(|result| result.is_valid)
    }

    // -------------------------------------------------------------------
    // Form operations
    // -------------------------------------------------------------------

    /// Submit the form.
    ///
    /// Marks everything dirty first — the dirty-marking pass re-validates,
    /// so required-but-untouched fields turn visibly invalid and the
    /// valid/invalid branch below reflects that pass. Fires the generic
    /// submit callback with the mapped model, then exactly one of the
    /// valid/invalid submit callbacks.
    pub fn submit(&self) -> Result<(), ConfigError> {
        log::debug!("submitting form");
        self.update_state(|state| state.is_submitting = true);
        let result = self.submit_inner();
        self.update_state(|state| state.is_submitting = false);
        result
    }

    fn submit_inner(&self) -> Result<(), ConfigError> {
        self.set_form_pristine(false)?;

        let model = self.model();
        if let Some(on_submit) = &self.inner.config.on_submit {
            on_submit(&model, self);
        }
        let branch = if self.state().is_valid {
            &self.inner.config.on_valid_submit
        } else {
            &self.inner.config.on_invalid_submit
        };
        if let Some(branch) = branch {
            branch(&model, self);
        }
        Ok(())
    }

    /// Reset the form: everything pristine, values restored from `data`
    /// where present and from the declared initial value otherwise.
    pub fn reset(&self, data: Option<&Values>) -> Result<(), ConfigError> {
        log::debug!("resetting form");
        self.set_form_pristine(true)?;
        self.reset_model(data)
    }

    fn reset_model(&self, data: Option<&Values>) -> Result<(), ConfigError> {
        for field in self.fields_snapshot() {
            match data.and_then(|d| d.get(field.name())) {
                // An explicit override counts as an edit.
                Some(value) => field.write_value(value.clone(), false),
                None => field.write_value(field.spec().value.clone(), true),
            }
        }
        self.validate_form()
    }

    /// Mark the form (and every field) pristine or dirty, then re-validate.
    pub fn set_form_pristine(&self, pristine: bool) -> Result<(), ConfigError> {
        self.update_state(|state| state.form_submitted = !pristine);
        for field in self.fields_snapshot() {
            field.set_pristine_state(!pristine, pristine);
        }
        self.validate_form()
    }

    /// Inject external errors (typically from a failed server submit).
    ///
    /// Each named field gets its external slot set and is marked invalid,
    /// unless the session prevents external invalidation, in which case
    /// the field stays locally valid and the next pass clears the slot.
    /// Naming an unattached field is a programmer error. The aggregate is
    /// deliberately not recomputed here — the slot is sticky until the
    /// next validation pass.
    pub fn update_inputs_with_error(
        &self,
        errors: &HashMap<String, Vec<String>>,
    ) -> Result<(), LookupError> {
        let fields = self.fields_snapshot();
        for (name, messages) in errors {
            let Some(field) = fields.iter().find(|f| f.name() == name) else {
                return Err(LookupError { name: name.clone() });
            };
            field.set_external_error(
                messages.clone(),
                self.inner.config.prevent_external_invalidation,
            );
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------

    /// Queried by fields to gate interactivity.
    pub fn is_form_disabled(&self) -> bool {
        self.inner.config.disabled
    }

    pub fn is_valid(&self) -> bool {
        self.state().is_valid
    }

    pub fn is_submitting(&self) -> bool {
        self.state().is_submitting
    }

    pub fn can_change(&self) -> bool {
        self.state().can_change
    }

    pub fn is_form_submitted(&self) -> bool {
        self.state().form_submitted
    }

    /// Copy of the aggregate state.
    pub fn state(&self) -> SessionState {
        match self.inner.state.read() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Report a successful submission round-trip (adapter-facing; the
    /// engine never calls this itself).
    pub fn notify_success(&self) {
        if let Some(on_success) = &self.inner.config.on_success {
            on_success();
        }
    }

    /// Report a failed submission round-trip (adapter-facing; pair with
    /// [`update_inputs_with_error`](Session::update_inputs_with_error)).
    pub fn notify_error(&self) {
        if let Some(on_error) = &self.inner.config.on_error {
            on_error();
        }
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    fn fields_snapshot(&self) -> Vec<Field> {
        match self.inner.fields.read() {
            Ok(fields) => fields.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn with_fields<R>(&self, f: impl FnOnce(&mut Vec<Field>) -> R) -> R {
        match self.inner.fields.write() {
            Ok(mut fields) => f(&mut fields),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    fn update_state(&self, f: impl FnOnce(&mut SessionState)) {
        match self.inner.state.write() {
            Ok(mut state) => f(&mut state),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}
