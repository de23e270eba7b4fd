//! The per-run validation result.

use serde::Serialize;

/// The outcome of validating one field against one value snapshot.
///
/// Ephemeral: recomputed on every run, never cached across passes.
/// `is_required` dominates — when the requirement set is satisfied,
/// `is_valid` is forced false regardless of the standard rules. `error`
/// is deduplicated with stable order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub is_required: bool,
    pub is_valid: bool,
    pub error: Vec<String>,
}

impl ValidationResult {
    /// The state of a field nothing has complained about.
    pub fn valid() -> Self {
        Self {
            is_required: false,
            is_valid: true,
            error: Vec::new(),
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::valid()
    }
}
