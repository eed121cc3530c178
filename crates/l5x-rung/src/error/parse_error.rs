//! The ParseError type for wrapping rung diagnostics.

use std::fmt;

use crate::{
    error::{Diagnostic, SyntaxKind},
    span::Span,
};

/// Error returned when rung text cannot be tokenized or parsed.
///
/// Wraps one or more diagnostics, in source order.
#[derive(Debug, Clone)]
pub struct ParseError {
    diagnostics: Vec<Diagnostic>,
}

impl ParseError {
    /// Create a new parse error from diagnostics.
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    /// Get all diagnostics in this error.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Kind of the first diagnostic.
    ///
    /// Diagnostics without a code count as unexpected tokens.
    pub fn kind(&self) -> SyntaxKind {
        self.diagnostics
            .first()
            .and_then(Diagnostic::code)
            .map(|code| code.kind())
            .unwrap_or(SyntaxKind::UnexpectedToken)
    }

    /// Primary span of the first diagnostic.
    pub fn span(&self) -> Option<Span> {
        self.diagnostics.first().and_then(Diagnostic::primary_span)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(first) = self.diagnostics.first() {
            write!(f, "{}", first)?;
            if let Some(span) = first.primary_span() {
                write!(f, " at offset {}", span.start())?;
            }
            if self.diagnostics.len() > 1 {
                write!(f, " (+{} more)", self.diagnostics.len() - 1)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

impl From<Diagnostic> for ParseError {
    fn from(diagnostic: Diagnostic) -> Self {
        Self {
            diagnostics: vec![diagnostic],
        }
    }
}

impl From<Vec<Diagnostic>> for ParseError {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_parse_error_kind_from_first_code() {
        let err: ParseError = vec![
            Diagnostic::error("missing `;`").with_code(ErrorCode::E102),
            Diagnostic::error("other").with_code(ErrorCode::E001),
        ]
        .into();

        assert_eq!(err.kind(), SyntaxKind::MissingTerminator);
    }

    #[test]
    fn test_parse_error_display_single() {
        let err: ParseError = Diagnostic::error("unexpected character `%`")
            .with_code(ErrorCode::E001)
            .with_label(Span::new(3..4), "here")
            .into();

        assert_eq!(
            err.to_string(),
            "error[E001]: unexpected character `%` at offset 3"
        );
    }

    #[test]
    fn test_parse_error_display_multiple() {
        let diags = vec![
            Diagnostic::error("first error"),
            Diagnostic::error("second error"),
            Diagnostic::error("third error"),
        ];
        let err: ParseError = diags.into();

        assert_eq!(err.to_string(), "error: first error (+2 more)");
    }
}
