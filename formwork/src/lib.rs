//! Form-validation orchestration for view-component trees.
//!
//! A [`session::Session`] tracks a dynamic set of [`field::Field`]
//! controllers, runs their declared rules against a shared value model,
//! aggregates per-field results into whole-form validity, and resolves
//! error messages from rule failures, session-level overrides, and
//! server-injected errors under a fixed precedence.
//!
//! # Example
//!
//! ```ignore
//! use formwork::prelude::*;
//!
//! let session = Session::new(
//!     SessionConfig::new()
//!         .on_valid_submit(|model, _| println!("sending {model}"))
//!         .on_invalid(|| println!("form has problems")),
//! );
//!
//! let email = session.create_field(
//!     FieldSpec::new("user.email")
//!         .validation("isEmail", true)
//!         .required("isExisty", true)
//!         .error_message("isEmail", "that is not an email address")
//!         .error_message("isExisty", "email is required"),
//! )?;
//!
//! email.set_value("a@b.com")?;
//! session.submit()?;
//! ```

pub mod error;
pub mod field;
pub mod model;
pub mod session;
pub mod validation;

pub mod prelude {
    pub use crate::error::{ConfigError, LookupError};
    pub use crate::field::{Field, FieldId, FieldSpec};
    pub use crate::model::{Values, to_nested};
    pub use crate::session::{Session, SessionConfig, SessionState};
    pub use crate::validation::{
        RuleOutcome, RuleRegistry, RuleSpec, ValidationResult, Validations, add_rule,
    };
}
