//! The built-in rule set.
//!
//! Pattern rules deliberately pass on missing or empty values — presence is
//! the required-rule set's job, so `isEmail` on an untouched optional field
//! stays green until something is typed.

use email_address::EmailAddress;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::registry::{RuleOutcome, RuleRegistry};
use crate::model::Values;

static ALPHA: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z]+$").expect("static pattern"));
static ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-zA-Z]+$").expect("static pattern"));
static INT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-+]?(?:0|[1-9]\d*))$").expect("static pattern"));
static FLOAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[-+]?(?:\d+))?(?:\.\d*)?(?:[eE][+-]?(?:\d+))?$").expect("static pattern")
});
static NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-+]?(?:\d*[.])?\d+$").expect("static pattern"));
static WORDS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z\s]+$").expect("static pattern"));
static SPECIAL_WORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z\s\u{00C0}-\u{017F}]+$").expect("static pattern"));
static URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").expect("static pattern"));

/// `null` maps both "absent" and "unset"; everything else exists.
fn existy(value: &Value) -> bool {
    !value.is_null()
}

fn empty(value: &Value) -> bool {
    value.as_str().is_some_and(str::is_empty)
}

/// Text a pattern can run against. Objects and arrays have none.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Length for the length-comparing rules: characters of a string or
/// elements of an array.
fn length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

fn pattern(value: &Value, re: &Regex) -> bool {
    if !existy(value) || empty(value) {
        return true;
    }
    match text(value) {
        Some(t) => re.is_match(&t),
        None => false,
    }
}

pub(crate) fn install(registry: &RuleRegistry) {
    registry.add_rule(
        "isDefaultRequiredValue",
        |_, value, _| (value.is_null() || empty(value)).into(),
        true,
    );
    registry.add_rule("isExisty", |_, value, _| existy(value).into(), true);
    registry.add_rule("isUndefined", |_, value, _| value.is_null().into(), true);
    registry.add_rule("isEmptyString", |_, value, _| empty(value).into(), true);

    registry.add_rule("matchRegexp", |_, value, args| match_regexp(value, args), true);
    registry.add_rule(
        "isEmail",
        |_, value, _| {
            if !existy(value) || empty(value) {
                return RuleOutcome::Pass;
            }
            match text(value) {
                Some(t) => EmailAddress::is_valid(&t).into(),
                None => RuleOutcome::Fail,
            }
        },
        true,
    );
    registry.add_rule("isUrl", |_, value, _| pattern(value, &URL).into(), true);

    registry.add_rule("isTrue", |_, value, _| (value == &Value::Bool(true)).into(), true);
    registry.add_rule("isFalse", |_, value, _| (value == &Value::Bool(false)).into(), true);

    registry.add_rule(
        "isNumeric",
        |_, value, _| (value.is_number() || pattern(value, &NUMERIC)).into(),
        true,
    );
    registry.add_rule("isAlpha", |_, value, _| pattern(value, &ALPHA).into(), true);
    registry.add_rule(
        "isAlphanumeric",
        |_, value, _| pattern(value, &ALPHANUMERIC).into(),
        true,
    );
    registry.add_rule("isInt", |_, value, _| pattern(value, &INT).into(), true);
    registry.add_rule("isFloat", |_, value, _| pattern(value, &FLOAT).into(), true);
    registry.add_rule("isWords", |_, value, _| pattern(value, &WORDS).into(), true);
    registry.add_rule(
        "isSpecialWords",
        |_, value, _| pattern(value, &SPECIAL_WORDS).into(),
        true,
    );

    registry.add_rule(
        "isLength",
        |_, value, args| {
            if !existy(value) || empty(value) {
                return RuleOutcome::Pass;
            }
            match (length(value), args.as_u64()) {
                (Some(len), Some(expected)) => (len as u64 == expected).into(),
                _ => RuleOutcome::Fail,
            }
        },
        true,
    );
    registry.add_rule(
        "minLength",
        |_, value, args| {
            if !existy(value) || empty(value) {
                return RuleOutcome::Pass;
            }
            match (length(value), args.as_u64()) {
                (Some(len), Some(min)) => (len as u64 >= min).into(),
                _ => RuleOutcome::Fail,
            }
        },
        true,
    );
    registry.add_rule(
        "maxLength",
        |_, value, args| {
            if !existy(value) {
                return RuleOutcome::Pass;
            }
            match (length(value), args.as_u64()) {
                (Some(len), Some(max)) => (len as u64 <= max).into(),
                _ => RuleOutcome::Fail,
            }
        },
        true,
    );

    registry.add_rule(
        "equals",
        |_, value, args| (!existy(value) || empty(value) || value == args).into(),
        true,
    );
    registry.add_rule("equalsField", equals_field, true);
}

fn match_regexp(value: &Value, args: &Value) -> RuleOutcome {
    if !existy(value) || empty(value) {
        return RuleOutcome::Pass;
    }
    let Some(pattern_text) = args.as_str() else {
        return RuleOutcome::Fail;
    };
    let re = match Regex::new(pattern_text) {
        Ok(re) => re,
        Err(e) => {
            log::warn!("matchRegexp received an invalid pattern `{pattern_text}`: {e}");
            return RuleOutcome::Fail;
        }
    };
    match text(value) {
        Some(t) => re.is_match(&t).into(),
        None => RuleOutcome::Fail,
    }
}

fn equals_field(values: &Values, value: &Value, args: &Value) -> RuleOutcome {
    let Some(other_name) = args.as_str() else {
        return RuleOutcome::Fail;
    };
    let other = values.get(other_name).unwrap_or(&Value::Null);
    (value == other).into()
}
