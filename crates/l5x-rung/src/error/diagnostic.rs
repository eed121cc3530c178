//! The core diagnostic type.

use std::fmt;

use crate::{
    error::{ErrorCode, Label, Severity},
    span::Span,
};

/// A diagnostic message with source location information.
///
/// ```text
/// error[E104]: branch separator must be preceded by a single space
///   |
/// 1 | [XIC(A),XIC(B) ]OTE(C);
///   |       ^ expected ` ,`
/// ```
#[derive(Debug, Clone)]
pub struct Diagnostic {
    severity: Severity,
    code: Option<ErrorCode>,
    message: String,
    labels: Vec<Label>,
    help: Option<String>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Create a warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Get the severity of this diagnostic.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Get the error code, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        self.code
    }

    /// Get the primary message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get all labels attached to this diagnostic.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Span of the first primary label.
    pub fn primary_span(&self) -> Option<Span> {
        self.labels
            .iter()
            .find(|label| label.is_primary())
            .map(Label::span)
    }

    /// Get the help text, if any.
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Set the error code.
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Add a primary label to this diagnostic.
    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::primary(span, message));
        self
    }

    /// Add a secondary label to this diagnostic.
    pub fn with_secondary_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::secondary(span, message));
        self
    }

    /// Set the help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            help: None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Format: "error[E001]: message" or "error: message"
        write!(f, "{}", self.severity)?;
        if let Some(code) = self.code {
            write!(f, "[{}]", code)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for Diagnostic {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display_with_code() {
        let diag = Diagnostic::error("missing `;`").with_code(ErrorCode::E102);

        assert_eq!(diag.to_string(), "error[E102]: missing `;`");
    }

    #[test]
    fn test_diagnostic_display_without_code() {
        let diag = Diagnostic::warning("unknown instruction `FOO`");

        assert_eq!(diag.to_string(), "warning: unknown instruction `FOO`");
    }

    #[test]
    fn test_primary_span_skips_secondary_labels() {
        let diag = Diagnostic::error("unclosed branch")
            .with_secondary_label(Span::new(0..1), "opened here")
            .with_label(Span::new(9..10), "expected ` ]`");

        assert_eq!(diag.primary_span(), Some(Span::new(9..10)));
        assert_eq!(diag.labels().len(), 2);
    }

    #[test]
    fn test_diagnostic_builder_chain() {
        let diag = Diagnostic::error("argument `1A` is not a tag, number or `?`")
            .with_code(ErrorCode::E103)
            .with_label(Span::new(4..6), "malformed argument")
            .with_help("tag names start with a letter or underscore");

        assert!(diag.severity().is_error());
        assert_eq!(diag.code(), Some(ErrorCode::E103));
        assert_eq!(
            diag.help(),
            Some("tag names start with a letter or underscore")
        );
    }
}
