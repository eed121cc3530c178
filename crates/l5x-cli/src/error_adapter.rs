//! Error adapter for converting CLI errors to miette diagnostics.
//!
//! This module provides the bridge between the library's standard error types
//! and miette's rich diagnostic formatting used in the CLI.
//!
//! # Multi-Error Support
//!
//! When a rung [`ParseError`](l5x_rung::ParseError) contains multiple
//! diagnostics, each diagnostic is rendered independently against the rung
//! text.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, SourceSpan};

use l5x::L5xError;
use l5x_rung::{Diagnostic, Span};

use crate::CliError;

/// Adapter for a single rung diagnostic.
pub struct DiagnosticAdapter<'a> {
    diag: &'a Diagnostic,
    /// Rung text the spans point into
    src: &'a str,
}

impl<'a> DiagnosticAdapter<'a> {
    /// Create a new diagnostic adapter.
    pub fn new(diag: &'a Diagnostic, src: &'a str) -> Self {
        Self { diag, src }
    }
}

impl fmt::Debug for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticAdapter")
            .field("diag", &self.diag)
            .finish()
    }
}

impl fmt::Display for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.diag.message())
    }
}

impl std::error::Error for DiagnosticAdapter<'_> {}

impl MietteDiagnostic for DiagnosticAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .code()
            .map(|c| Box::new(c) as Box<dyn fmt::Display>)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .help()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.src as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let labels = self.diag.labels();
        if labels.is_empty() {
            return None;
        }

        Some(Box::new(labels.iter().map(|label| {
            let span = span_to_miette(label.span());
            let message = Some(label.message().to_string());
            if label.is_primary() {
                LabeledSpan::new_primary_with_span(message, span)
            } else {
                LabeledSpan::new_with_span(message, span)
            }
        })))
    }
}

/// Adapter for errors without source spans.
pub struct ErrorAdapter<'a>(pub &'a CliError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            CliError::Io(_) => "l5x::io",
            CliError::Config(_) => "l5x::config",
            CliError::Engine(L5xError::Transaction(_)) => "l5x::transaction",
            CliError::Engine(L5xError::Document(_)) => "l5x::document",
            CliError::Engine(_) => "l5x::engine",
            CliError::Rung { .. } => return None,
            CliError::UnknownCategory(_) => "l5x::category",
            CliError::Invalid { .. } => "l5x::validation",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match &self.0 {
            CliError::UnknownCategory(_) => Some(Box::new(
                "categories: structure, references, naming, dependencies, modules, tasks, rungs, freshness, formats",
            )),
            _ => None,
        }
    }
}

/// A reportable error that can be rendered by miette.
///
/// This enum wraps either a single diagnostic or a non-diagnostic error,
/// so each can be rendered on its own.
pub enum Reportable<'a> {
    Diagnostic(DiagnosticAdapter<'a>),
    Error(ErrorAdapter<'a>),
}

impl fmt::Debug for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Diagnostic(d) => fmt::Debug::fmt(d, f),
            Reportable::Error(e) => fmt::Debug::fmt(e, f),
        }
    }
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Diagnostic(d) => fmt::Display::fmt(d, f),
            Reportable::Error(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Diagnostic(_) => None,
            Reportable::Error(e) => e.source(),
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.code(),
            Reportable::Error(e) => e.code(),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.help(),
            Reportable::Error(e) => e.help(),
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            Reportable::Diagnostic(d) => d.source_code(),
            Reportable::Error(e) => e.source_code(),
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            Reportable::Diagnostic(d) => d.labels(),
            Reportable::Error(e) => e.labels(),
        }
    }
}

fn span_to_miette(span: Span) -> SourceSpan {
    SourceSpan::new(span.start().into(), span.len())
}

/// Convert a [`CliError`] into a list of reportable errors.
///
/// Rung parse failures, whether from the `rung` command or from an engine
/// operation, give one [`Reportable`] per diagnostic. Everything else gives
/// a single one.
pub fn to_reportables(err: &CliError) -> Vec<Reportable<'_>> {
    let (parse_err, src) = match err {
        CliError::Rung { err, src } => (err, src),
        CliError::Engine(L5xError::Rung { err, text }) => (err, text),
        _ => return vec![Reportable::Error(ErrorAdapter(err))],
    };
    parse_err
        .diagnostics()
        .iter()
        .map(|d| Reportable::Diagnostic(DiagnosticAdapter::new(d, src)))
        .collect()
}

#[cfg(test)]
mod tests {
    use l5x_rung::{ErrorCode, ParseError};

    use super::*;

    #[test]
    fn test_rung_error_gives_one_report_per_diagnostic() {
        let err = l5x_rung::parse("XIC(A)OTE(B)").unwrap_err();
        let count = err.diagnostics().len();
        let err = CliError::Rung {
            err,
            src: "XIC(A)OTE(B)".to_string(),
        };

        let reportables = to_reportables(&err);
        assert_eq!(reportables.len(), count);
        assert!(matches!(reportables[0], Reportable::Diagnostic(_)));
        assert!(reportables[0].labels().is_some());
    }

    #[test]
    fn test_engine_rung_error_keeps_its_text() {
        let diag = Diagnostic::error("branch opened here is never closed")
            .with_code(ErrorCode::E101)
            .with_label(Span::new(0..1), "unclosed `[`");
        let err = CliError::Engine(L5xError::new_rung_error(ParseError::from(diag), "[XIC(A);"));

        let reportables = to_reportables(&err);
        assert_eq!(reportables.len(), 1);
        assert_eq!(reportables[0].to_string(), "branch opened here is never closed");
        assert_eq!(reportables[0].code().unwrap().to_string(), "E101");
    }

    #[test]
    fn test_other_errors_are_single_reports() {
        let err = CliError::Invalid { errors: 2 };
        let reportables = to_reportables(&err);

        assert_eq!(reportables.len(), 1);
        assert_eq!(reportables[0].to_string(), "validation found 2 error(s)");
        assert_eq!(reportables[0].code().unwrap().to_string(), "l5x::validation");
    }
}
