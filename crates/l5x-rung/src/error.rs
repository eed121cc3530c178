//! Diagnostics for rung text.
//!
//! Errors are reported as [`Diagnostic`]s carrying a [`Severity`], an
//! [`ErrorCode`], labeled byte spans and optional help. The lexer keeps going
//! after an error and reports everything it found; the parser stops at the
//! first structural error. Both hand back a [`ParseError`].
//!
//! # Example
//!
//! ```
//! # use l5x_rung::error::{Diagnostic, ErrorCode};
//! # use l5x_rung::Span;
//!
//! let diag = Diagnostic::error("branch opened here is never closed")
//!     .with_code(ErrorCode::E101)
//!     .with_label(Span::new(0..1), "unclosed `[`")
//!     .with_help("close the branch with ` ]`");
//! assert_eq!(diag.to_string(), "error[E101]: branch opened here is never closed");
//! ```

mod collector;
mod diagnostic;
mod error_code;
mod label;
mod parse_error;
mod severity;

pub(crate) use collector::DiagnosticCollector;

pub use diagnostic::Diagnostic;
pub use error_code::{ErrorCode, SyntaxKind};
pub use label::Label;
pub use parse_error::ParseError;
pub use severity::Severity;
