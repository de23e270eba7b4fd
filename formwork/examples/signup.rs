//! Signup Form Example
//!
//! A console walkthrough of a form session: attaching fields, editing
//! values, submitting, and injecting server-side errors.

use std::collections::HashMap;

use formwork::prelude::*;
use log::LevelFilter;
use serde_json::json;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

fn main() -> Result<(), ConfigError> {
    let _ = TermLogger::init(
        LevelFilter::Debug,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );

    // A process-wide custom rule, alongside the built-ins.
    add_rule(
        "isUsername",
        |_, value, _| {
            value
                .as_str()
                .is_some_and(|s| s.len() >= 3 && s.chars().all(|c| c.is_ascii_alphanumeric()))
                .into()
        },
        false,
    );

    let session = Session::new(
        SessionConfig::new()
            .on_valid(|| println!("-> form is valid"))
            .on_invalid(|| println!("-> form is invalid"))
            .on_change(|values, changed| {
                println!("-> values changed (dirty: {changed}): {values:?}")
            })
            .on_valid_submit(|model, _| println!("-> submitting {model}"))
            .on_invalid_submit(|_, session| {
                for field in session.fields() {
                    if !field.is_valid() {
                        println!(
                            "-> fix `{}`: {}",
                            field.name(),
                            field.error_message().unwrap_or_default()
                        );
                    }
                }
            }),
    );

    let username = session.create_field(
        FieldSpec::new("account.username")
            .value("")
            .validation("isUsername", true)
            .required("isDefaultRequiredValue", true)
            .error_message("isUsername", "3+ letters or digits only")
            .error_message("isDefaultRequiredValue", "pick a username"),
    )?;

    let email = session.create_field(
        FieldSpec::new("account.email")
            .value("")
            .validation("isEmail", true)
            .required("isDefaultRequiredValue", true)
            .error_message("isEmail", "that is not an email address")
            .error_message("isDefaultRequiredValue", "email is required"),
    )?;

    let password = session.create_field(
        FieldSpec::new("password")
            .value("")
            .validation("minLength", 8)
            .error_message("minLength", "use at least {0} characters"),
    )?;

    let confirm = session.create_field(
        FieldSpec::new("confirm")
            .value("")
            .validation("equalsField", "password")
            .error_message("equalsField", "passwords do not match"),
    )?;

    println!("\n== submitting the untouched form ==");
    session.submit()?;

    println!("\n== filling the form in ==");
    username.set_value("norpie")?;
    email.set_value("norpie@example.com")?;
    password.set_value("correct horse")?;
    confirm.set_value("correct horse")?;

    println!("\n== submitting again ==");
    session.submit()?;

    println!("\n== the server rejects the username ==");
    let mut server_errors = HashMap::new();
    server_errors.insert(
        "account.username".to_string(),
        vec!["that name is taken".to_string()],
    );
    if session.update_inputs_with_error(&server_errors).is_ok() {
        println!(
            "-> `{}` now shows: {:?}",
            username.name(),
            username.errors()
        );
    }

    println!("\n== picking a new name clears the server error ==");
    username.set_value("norpie2")?;
    println!(
        "-> `{}` valid again: {}",
        username.name(),
        username.is_valid()
    );

    println!("\n== model ==");
    println!("{}", serde_json::to_string_pretty(&session.model()).unwrap_or_default());
    assert_eq!(
        session.model()["account"]["username"],
        json!("norpie2")
    );

    Ok(())
}
