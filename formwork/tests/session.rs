//! Session behavior: attach/detach bookkeeping, whole-form aggregation,
//! callback gating, submit/reset, and external-error injection.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use formwork::prelude::*;
use serde_json::{Value, json};

fn counting_session(counter: &Arc<AtomicUsize>) -> Session {
    let counter = Arc::clone(counter);
    Session::new(SessionConfig::new().on_valid(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }))
}

#[test]
fn test_field_with_no_rules_is_valid_once_attached() {
    let session = Session::new(SessionConfig::new());
    let field = session.create_field(FieldSpec::new("nickname")).unwrap();

    assert!(field.is_valid());
    assert!(!field.is_required());
    assert!(field.errors().is_empty());
    assert!(session.is_valid());
}

#[test]
fn test_satisfied_requirement_forces_invalid() {
    let session = Session::new(SessionConfig::new());
    let age = session
        .create_field(
            FieldSpec::new("age")
                .value("")
                .validation("isInt", true)
                .required("isExisty", true)
                .error_message("isExisty", "age is required"),
        )
        .unwrap();

    // `isInt` passes on the empty string, but the satisfied requirement
    // dominates.
    assert!(age.is_required());
    assert!(!age.is_valid());
    assert_eq!(age.errors(), vec!["age is required"]);
    assert!(!session.is_valid());
}

#[test]
fn test_required_message_silent_when_template_missing() {
    let session = Session::new(SessionConfig::new());
    let age = session
        .create_field(FieldSpec::new("age").value("").required("isExisty", true))
        .unwrap();

    assert!(age.is_required());
    assert!(!age.is_valid());
    assert!(age.errors().is_empty());
}

#[test]
fn test_identical_messages_deduplicate() {
    let session = Session::new(SessionConfig::new());
    let field = session
        .create_field(
            FieldSpec::new("code")
                .value("??")
                .custom_validation("noQuestions", |_, _| "looks wrong".into())
                .custom_validation("noMarks", |_, _| "looks wrong".into()),
        )
        .unwrap();

    assert_eq!(field.errors(), vec!["looks wrong"]);
}

#[test]
fn test_email_scenario_with_dotted_model() {
    let session = Session::new(SessionConfig::new());
    let email = session
        .create_field(
            FieldSpec::new("user.email")
                .value("a@b.com")
                .validation("isEmail", true),
        )
        .unwrap();

    let result = session.run_validation(&email, None).unwrap();
    assert!(result.is_valid);
    assert!(!result.is_required);
    assert!(result.error.is_empty());

    assert_eq!(session.model(), json!({"user": {"email": "a@b.com"}}));
}

#[test]
fn test_cross_field_rule_revalidates_on_other_fields_edit() {
    let session = Session::new(SessionConfig::new());
    let password = session
        .create_field(FieldSpec::new("password").value("hunter2"))
        .unwrap();
    let confirm = session
        .create_field(
            FieldSpec::new("confirm")
                .value("hunter2")
                .validation("equalsField", "password")
                .error_message("equalsField", "passwords differ"),
        )
        .unwrap();

    assert!(confirm.is_valid());

    // Editing the *other* field flips this one in the same pass.
    password.set_value("changed").unwrap();
    assert!(!confirm.is_valid());
    assert_eq!(confirm.errors(), vec!["passwords differ"]);

    password.set_value("hunter2").unwrap();
    assert!(confirm.is_valid());
    assert!(session.is_valid());
}

#[test]
fn test_detaching_only_invalid_field_fires_on_valid_once() {
    let valid_calls = Arc::new(AtomicUsize::new(0));
    let session = counting_session(&valid_calls);

    let _name = session
        .create_field(FieldSpec::new("name").value("norpie"))
        .unwrap();
    let broken = session
        .create_field(
            FieldSpec::new("email")
                .value("nope")
                .validation("isEmail", true),
        )
        .unwrap();

    assert!(!session.is_valid());
    let before = valid_calls.load(Ordering::SeqCst);

    session.detach(&broken).unwrap();

    assert!(session.is_valid());
    assert_eq!(valid_calls.load(Ordering::SeqCst), before + 1);
}

#[test]
fn test_empty_directory_completes_trivially() {
    let valid_calls = Arc::new(AtomicUsize::new(0));
    let session = counting_session(&valid_calls);

    session.validate_form().unwrap();

    assert!(session.is_valid());
    assert!(session.can_change());
    assert_eq!(valid_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_on_change_gated_until_first_pass() {
    let changes: Arc<Mutex<Vec<(Values, bool)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&changes);
    let session = Session::new(SessionConfig::new().on_change(move |values, changed| {
        sink.lock().unwrap().push((values.clone(), changed));
    }));

    let field = session
        .create_field(FieldSpec::new("name").value("initial"))
        .unwrap();
    // Attaching the first field is the first pass; nothing fires yet.
    assert!(changes.lock().unwrap().is_empty());

    field.set_value("edited").unwrap();

    let seen = changes.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (values, changed) = &seen[0];
    assert_eq!(values.get("name"), Some(&json!("edited")));
    assert!(*changed);
}

#[test]
fn test_on_change_reports_unchanged_after_revert() {
    let last_changed = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&last_changed);
    let session = Session::new(SessionConfig::new().on_change(move |_, changed| {
        *sink.lock().unwrap() = Some(changed);
    }));

    let field = session
        .create_field(FieldSpec::new("name").value("initial"))
        .unwrap();
    field.set_value("edited").unwrap();
    field.set_value("initial").unwrap();

    assert_eq!(*last_changed.lock().unwrap(), Some(false));
}

#[test]
fn test_submit_marks_dirty_then_branches() {
    let submits = Arc::new(AtomicUsize::new(0));
    let invalid_submits = Arc::new(AtomicUsize::new(0));
    let valid_submits = Arc::new(AtomicUsize::new(0));

    let s = Arc::clone(&submits);
    let iv = Arc::clone(&invalid_submits);
    let v = Arc::clone(&valid_submits);
    let session = Session::new(
        SessionConfig::new()
            .on_submit(move |_, _| {
                s.fetch_add(1, Ordering::SeqCst);
            })
            .on_invalid_submit(move |_, _| {
                iv.fetch_add(1, Ordering::SeqCst);
            })
            .on_valid_submit(move |_, _| {
                v.fetch_add(1, Ordering::SeqCst);
            }),
    );

    let email = session
        .create_field(
            FieldSpec::new("email")
                .value("")
                .required("isDefaultRequiredValue", true),
        )
        .unwrap();

    session.submit().unwrap();

    // The untouched-but-required field became visibly dirty and invalid.
    assert!(!email.is_pristine());
    assert!(email.is_form_submitted());
    assert!(session.is_form_submitted());
    assert_eq!(submits.load(Ordering::SeqCst), 1);
    assert_eq!(invalid_submits.load(Ordering::SeqCst), 1);
    assert_eq!(valid_submits.load(Ordering::SeqCst), 0);

    email.set_value("a@b.com").unwrap();
    session.submit().unwrap();

    assert_eq!(submits.load(Ordering::SeqCst), 2);
    assert_eq!(invalid_submits.load(Ordering::SeqCst), 1);
    assert_eq!(valid_submits.load(Ordering::SeqCst), 1);
    assert!(!session.is_submitting());
}

#[test]
fn test_submit_callback_receives_mapped_model() {
    let model_seen = Arc::new(Mutex::new(Value::Null));
    let sink = Arc::clone(&model_seen);
    let session = Session::new(SessionConfig::new().on_valid_submit(move |model, _| {
        *sink.lock().unwrap() = model.clone();
    }));

    session
        .create_field(FieldSpec::new("user.name").value("norpie"))
        .unwrap();
    session
        .create_field(FieldSpec::new("user.email").value("a@b.com"))
        .unwrap();

    session.submit().unwrap();

    assert_eq!(
        *model_seen.lock().unwrap(),
        json!({"user": {"name": "norpie", "email": "a@b.com"}})
    );
}

#[test]
fn test_custom_mapping_replaces_dotted_projection() {
    let session = Session::new(SessionConfig::new().mapping(|values| {
        json!({ "count": values.len() })
    }));
    session.create_field(FieldSpec::new("a.b").value(1)).unwrap();
    session.create_field(FieldSpec::new("c").value(2)).unwrap();

    assert_eq!(session.model(), json!({"count": 2}));
}

#[test]
fn test_reset_restores_declared_values() {
    let session = Session::new(SessionConfig::new());
    let name = session
        .create_field(FieldSpec::new("name").value("initial"))
        .unwrap();
    name.set_value("edited").unwrap();
    assert!(!name.is_pristine());

    session.reset(None).unwrap();

    assert_eq!(name.value(), json!("initial"));
    assert!(name.is_pristine());
    assert!(!session.is_form_submitted());
}

#[test]
fn test_reset_with_override_data() {
    let session = Session::new(SessionConfig::new());
    let name = session
        .create_field(FieldSpec::new("name").value("initial"))
        .unwrap();
    let other = session
        .create_field(FieldSpec::new("other").value("keep"))
        .unwrap();

    let data = Values::from([("name".to_string(), json!("from server"))]);
    session.reset(Some(&data)).unwrap();

    // Overridden fields count as edited; the rest reset to pristine.
    assert_eq!(name.value(), json!("from server"));
    assert!(!name.is_pristine());
    assert_eq!(other.value(), json!("keep"));
    assert!(other.is_pristine());
}

#[test]
fn test_external_error_injection_and_clearing() {
    let session = Session::new(SessionConfig::new());
    let email = session
        .create_field(
            FieldSpec::new("email")
                .value("a@b.com")
                .validation("isEmail", true),
        )
        .unwrap();
    assert!(email.is_valid());

    let mut errors = HashMap::new();
    errors.insert("email".to_string(), vec!["already registered".to_string()]);
    session.update_inputs_with_error(&errors).unwrap();

    assert!(!email.is_valid());
    assert_eq!(email.errors(), vec!["already registered"]);

    // The slot is sticky across whole-form passes...
    session.validate_form().unwrap();
    assert!(!email.is_valid());
    assert_eq!(email.errors(), vec!["already registered"]);

    // ...until a local revalidation clears it.
    email.set_value("new@b.com").unwrap();
    assert!(email.is_valid());
    assert!(email.external_error().is_none());
    assert!(session.is_valid());
}

#[test]
fn test_prevent_external_invalidation_keeps_field_valid() {
    let session = Session::new(SessionConfig::new().prevent_external_invalidation(true));
    let email = session
        .create_field(FieldSpec::new("email").value("a@b.com"))
        .unwrap();

    let mut errors = HashMap::new();
    errors.insert("email".to_string(), vec!["server grumbles".to_string()]);
    session.update_inputs_with_error(&errors).unwrap();

    // The message is displayed but validity survives the injection.
    assert!(email.is_valid());
    assert_eq!(email.errors(), vec!["server grumbles"]);

    // Local revalidation keeps it valid and drops the message.
    email.set_value("a@b.com").unwrap();
    assert!(email.is_valid());
    assert!(email.external_error().is_none());
}

#[test]
fn test_update_inputs_with_unknown_name_is_a_lookup_error() {
    let session = Session::new(SessionConfig::new());
    session.create_field(FieldSpec::new("known")).unwrap();

    let mut errors = HashMap::new();
    errors.insert("unknown".to_string(), vec!["boom".to_string()]);

    let err = session.update_inputs_with_error(&errors).unwrap_err();
    assert_eq!(err, LookupError { name: "unknown".to_string() });
}

#[test]
fn test_session_level_override_map_forces_invalid() {
    let session = Session::new(
        SessionConfig::new().validation_error("email", "the server rejected this"),
    );
    let email = session
        .create_field(
            FieldSpec::new("email")
                .value("a@b.com")
                .validation("isEmail", true),
        )
        .unwrap();

    // Rules pass, the override still wins.
    assert!(!email.is_valid());
    assert_eq!(email.errors(), vec!["the server rejected this"]);
}

#[test]
fn test_is_valid_value_probe_does_not_mutate() {
    let session = Session::new(SessionConfig::new());
    let email = session
        .create_field(
            FieldSpec::new("email")
                .value("bad")
                .validation("isEmail", true),
        )
        .unwrap();
    assert!(!email.is_valid());

    assert!(session.is_valid_value(&email, &json!("a@b.com")).unwrap());
    assert!(!session.is_valid_value(&email, &json!("still bad")).unwrap());

    // The probe changed nothing.
    assert_eq!(email.value(), json!("bad"));
    assert!(!email.is_valid());
}

#[test]
fn test_validate_form_is_idempotent() {
    let session = Session::new(SessionConfig::new());
    let email = session
        .create_field(
            FieldSpec::new("email")
                .value("nope")
                .validation("isEmail", true)
                .validation_error("invalid email"),
        )
        .unwrap();
    let name = session
        .create_field(FieldSpec::new("name").value("norpie"))
        .unwrap();

    session.validate_form().unwrap();
    let first = (
        email.is_valid(),
        email.is_required(),
        email.errors(),
        name.is_valid(),
        session.state(),
    );

    session.validate_form().unwrap();
    let second = (
        email.is_valid(),
        email.is_required(),
        email.errors(),
        name.is_valid(),
        session.state(),
    );

    assert_eq!(first, second);
}

#[test]
fn test_attach_is_identity_checked() {
    let session = Session::new(SessionConfig::new());
    let field = Field::new(FieldSpec::new("name"));

    session.attach(&field).unwrap();
    session.attach(&field).unwrap();

    assert_eq!(session.fields().len(), 1);

    // A different controller with the same name is a separate entry.
    let twin = Field::new(FieldSpec::new("name"));
    session.attach(&twin).unwrap();
    assert_eq!(session.fields().len(), 2);
}

#[test]
fn test_field_level_validate_hook_overrides_rules() {
    let session = Session::new(SessionConfig::new());
    let field = session
        .create_field(
            FieldSpec::new("token")
                .value("short")
                .validation("minLength", 100)
                .validate_with(|_, value| value.as_str().is_some_and(|s| !s.is_empty()))
                .validation_error("token rejected"),
        )
        .unwrap();

    // The hook passes, so the failing `minLength` is ignored.
    assert!(field.is_valid());

    field.set_value("").unwrap();
    assert!(!field.is_valid());
    assert_eq!(field.errors(), vec!["token rejected"]);
}

#[test]
fn test_unknown_rule_surfaces_as_config_error() {
    let session = Session::new(SessionConfig::new());
    let err = session
        .create_field(FieldSpec::new("x").validation("isUnicorn", true))
        .unwrap_err();

    assert_eq!(err, ConfigError::UnknownRule("isUnicorn".to_string()));
}

#[test]
fn test_form_disabled_flag() {
    let session = Session::new(SessionConfig::new().disabled(true));
    assert!(session.is_form_disabled());
    assert!(!Session::new(SessionConfig::new()).is_form_disabled());
}

#[test]
fn test_notify_hooks_are_adapter_driven() {
    let successes = Arc::new(AtomicUsize::new(0));
    let s = Arc::clone(&successes);
    let session = Session::new(SessionConfig::new().on_success(move || {
        s.fetch_add(1, Ordering::SeqCst);
    }));
    session.create_field(FieldSpec::new("name")).unwrap();
    session.submit().unwrap();

    // The engine never fires it on its own.
    assert_eq!(successes.load(Ordering::SeqCst), 0);
    session.notify_success();
    assert_eq!(successes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_validation_result_serializes() {
    let session = Session::new(SessionConfig::new());
    let field = session
        .create_field(
            FieldSpec::new("email")
                .value("bad")
                .validation("isEmail", true)
                .validation_error("invalid email"),
        )
        .unwrap();

    let result = session.run_validation(&field, None).unwrap();
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({
            "is_required": false,
            "is_valid": false,
            "error": ["invalid email"],
        })
    );
}
