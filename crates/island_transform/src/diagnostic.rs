//! Diagnostic types surfaced by the island transform.
//!
//! Markup parse errors (built as `OxcDiagnostic`s by the parser) and
//! transform-level warnings are both mapped into this shape before reaching
//! the caller.

/// Severity level for a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Hint,
}

/// A labeled source span within a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticLabel {
    /// Optional label text (e.g. "expected closing tag here").
    pub text: Option<String>,
    /// Byte offset of the span start in the full component source.
    pub start: u32,
    /// Byte offset of the span end (exclusive).
    pub end: u32,
    /// 1-based line number.
    pub line: u32,
    /// 0-based column number.
    pub column: u32,
}

impl DiagnosticLabel {
    /// Create a label from byte offsets, computing line/column from source text.
    pub fn new(text: Option<String>, start: u32, end: u32, source_text: &str) -> Self {
        let (line, column) = byte_offset_to_line_column(source_text, start as usize);
        Self {
            text,
            start,
            end,
            line,
            column,
        }
    }
}

/// A single diagnostic message produced by the transform.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    /// Human-readable message text.
    pub text: String,
    /// Optional hint/suggestion for fixing the issue.
    pub hint: String,
    /// Labeled source spans.
    pub labels: Vec<DiagnosticLabel>,
}

impl Diagnostic {
    /// A warning with a single label over `start..end` of `source_text`.
    pub fn warning(
        text: impl Into<String>,
        hint: impl Into<String>,
        start: u32,
        end: u32,
        source_text: &str,
    ) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            text: text.into(),
            hint: hint.into(),
            labels: vec![DiagnosticLabel::new(None, start, end, source_text)],
        }
    }

    /// Create a diagnostic from an oxc `OxcDiagnostic`.
    ///
    /// The parser reports offsets relative to the markup it was given, so
    /// every label is shifted by `base_offset` to land in `source_text`.
    #[expect(clippy::cast_possible_truncation)]
    pub fn from_oxc(
        source_text: &str,
        base_offset: u32,
        diag: &oxc_diagnostics::OxcDiagnostic,
    ) -> Self {
        let severity = match diag.severity {
            oxc_diagnostics::Severity::Error => DiagnosticSeverity::Error,
            oxc_diagnostics::Severity::Warning => DiagnosticSeverity::Warning,
            oxc_diagnostics::Severity::Advice => DiagnosticSeverity::Hint,
        };

        let hint = diag
            .help
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();

        let labels = diag
            .labels
            .as_ref()
            .map(|labels| {
                labels
                    .iter()
                    .map(|label| {
                        let start = base_offset + label.offset() as u32;
                        DiagnosticLabel::new(
                            label.label().map(ToString::to_string),
                            start,
                            start + label.len() as u32,
                            source_text,
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            severity,
            text: diag.message.to_string(),
            hint,
            labels,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

/// Convert a UTF-8 byte offset to a 1-based line and 0-based column.
fn byte_offset_to_line_column(source: &str, offset: usize) -> (u32, u32) {
    let mut line = 1u32;
    let mut col = 0u32;
    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    (line, col)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_diagnostics::{LabeledSpan, OxcDiagnostic};

    #[test]
    fn test_label_line_and_column() {
        let source = "<template>\n  <div>\n</template>";
        let label = DiagnosticLabel::new(None, 13, 18, source);
        assert_eq!(label.line, 2);
        assert_eq!(label.column, 2);
    }

    #[test]
    fn test_from_oxc_shifts_labels() {
        let source = "<template><div></template>";
        let diag = OxcDiagnostic::error("Element is missing end tag")
            .with_label(LabeledSpan::new(Some("opened here".to_string()), 0, 5))
            .with_help("Close the element");

        let converted = Diagnostic::from_oxc(source, 10, &diag);
        assert!(converted.is_error());
        assert_eq!(converted.text, "Element is missing end tag");
        assert_eq!(converted.hint, "Close the element");
        assert_eq!(converted.labels.len(), 1);
        assert_eq!(converted.labels[0].start, 10);
        assert_eq!(converted.labels[0].end, 15);
        assert_eq!(converted.labels[0].text.as_deref(), Some("opened here"));
    }
}
