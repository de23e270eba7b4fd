//! Message resolution across the competing error sources.
//!
//! Three sources can disagree about what a field should display: messages
//! produced by the rules themselves, the session-level override map, and
//! the field's own templates. The precedence below is fixed — reordering
//! it changes which message a user sees.

use std::collections::HashMap;

use serde_json::Value;

use super::runner::RuleOutcomes;

/// Everything the resolver weighs for one field.
pub(crate) struct MessageSources<'a> {
    /// Validity of the standard rule set alone, before requirement forcing.
    pub rule_validity: bool,
    pub is_required: bool,
    pub outcomes: &'a RuleOutcomes,
    /// Names of requirement rules that passed, in declaration order.
    pub required_success: &'a [String],
    /// The session-level override entry for this field, if any.
    pub session_override: Option<&'a [String]>,
    /// The field's default message template.
    pub default_template: Option<&'a str>,
    /// The field's per-rule templates; doubles as the required-error map.
    pub templates: &'a HashMap<String, String>,
}

/// Resolve the displayed message list for one field.
pub(crate) fn resolve_messages(sources: MessageSources<'_>) -> Vec<String> {
    // 1. Nothing wrong, nothing to say.
    if sources.rule_validity && !sources.is_required {
        return Vec::new();
    }

    // 2. Rules that spoke for themselves win outright.
    if !sources.outcomes.errors.is_empty() {
        return dedup_stable(sources.outcomes.errors.clone());
    }

    // 3. The session-level override map outranks local templates.
    if let Some(messages) = sources.session_override {
        return messages.to_vec();
    }

    // 4. Requirement failures look up the template keyed by the first
    //    satisfied requirement rule. No entry means no message; that
    //    silence is part of the contract.
    if sources.is_required {
        return sources
            .required_success
            .first()
            .and_then(|name| sources.templates.get(name))
            .map(|message| vec![message.clone()])
            .unwrap_or_default();
    }

    // 5. Template every failed rule, `{0}`/`{1}`/… filled from its args.
    let messages = sources
        .outcomes
        .failed
        .iter()
        .filter_map(|failed| {
            sources
                .templates
                .get(&failed.name)
                .map(String::as_str)
                .or(sources.default_template)
                .map(|template| substitute(template, failed.args.as_ref()))
        })
        .collect();
    dedup_stable(messages)
}

/// Replace `{0}`, `{1}`, … with the rule's arguments. An array argument
/// expands positionally; anything else fills `{0}`.
fn substitute(template: &str, args: Option<&Value>) -> String {
    let Some(args) = args else {
        return template.to_string();
    };
    let items: Vec<&Value> = match args {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    let mut message = template.to_string();
    for (i, arg) in items.iter().enumerate() {
        message = message.replace(&format!("{{{i}}}"), &display(arg));
    }
    message
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Deduplicate preserving order; the first occurrence wins.
fn dedup_stable(messages: Vec<String>) -> Vec<String> {
    let mut unique = Vec::with_capacity(messages.len());
    for message in messages {
        if !unique.contains(&message) {
            unique.push(message);
        }
    }
    unique
}
