use napi_derive::napi;

use island_transform::{Diagnostic, DiagnosticLabel, DiagnosticSeverity};

#[napi(object, use_nullable = true)]
#[derive(Clone)]
pub struct TransformDiagnostic {
    pub severity: Severity,
    pub message: String,
    pub labels: Vec<ErrorLabel>,
    pub help_message: Option<String>,
}

impl TransformDiagnostic {
    pub fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> Vec<Self> {
        diagnostics.into_iter().map(Self::from).collect()
    }
}

impl From<Diagnostic> for TransformDiagnostic {
    fn from(diagnostic: Diagnostic) -> Self {
        let help_message = if diagnostic.hint.is_empty() {
            None
        } else {
            Some(diagnostic.hint)
        };
        Self {
            severity: Severity::from(diagnostic.severity),
            message: diagnostic.text,
            labels: diagnostic.labels.into_iter().map(ErrorLabel::from).collect(),
            help_message,
        }
    }
}

#[napi(object, use_nullable = true)]
#[derive(Clone)]
pub struct ErrorLabel {
    pub message: Option<String>,
    pub start: u32,
    pub end: u32,
    /// 1-based line number in the source.
    pub line: u32,
    /// 0-based column number in the source.
    pub column: u32,
}

impl From<DiagnosticLabel> for ErrorLabel {
    fn from(label: DiagnosticLabel) -> Self {
        Self {
            message: label.text,
            start: label.start,
            end: label.end,
            line: label.line,
            column: label.column,
        }
    }
}

#[napi(string_enum)]
#[derive(Clone)]
pub enum Severity {
    Error,
    Warning,
    Hint,
}

impl From<DiagnosticSeverity> for Severity {
    fn from(value: DiagnosticSeverity) -> Self {
        match value {
            DiagnosticSeverity::Error => Self::Error,
            DiagnosticSeverity::Warning => Self::Warning,
            DiagnosticSeverity::Hint => Self::Hint,
        }
    }
}
