//! Public output types for the island transform.

use crate::diagnostic::Diagnostic;

/// Output from transforming one component file.
#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    /// The rewritten component source, or `None` when the file is unchanged.
    pub code: Option<String>,
    /// Source map JSON string.
    ///
    /// Filled when `TransformOptions::sourcemap` is `External` or `Both` and
    /// the file changed. Empty string otherwise.
    pub map: String,
    /// Diagnostic messages from the transform.
    pub diagnostics: Vec<Diagnostic>,
    /// Names of the rewritten slots; dynamic names are given as their expression.
    pub slots: Vec<String>,
    /// `to` targets of the rewritten client boundaries.
    pub client_boundaries: Vec<String>,
}

impl TransformResult {
    /// An "unchanged" result carrying `diagnostics`.
    pub fn unchanged(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            diagnostics,
            ..Self::default()
        }
    }

    pub fn is_changed(&self) -> bool {
        self.code.is_some()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}
