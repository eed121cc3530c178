//! Error types for L5X editing operations.
//!
//! [`L5xError`] is returned by every [`crate::project::Project`] and
//! [`crate::project::Transaction`] operation. It wraps the errors of the
//! document model, the rung parser and the value codec, and adds the
//! failures of the editing operations themselves.

use thiserror::Error;

use l5x_core::naming::NameError;
use l5x_rung::ParseError;

use crate::{
    codec::CodecError,
    document::{DependencyError, DocumentError},
    validate::ValidationReport,
};

/// The main error type for L5X editing operations.
///
/// # Diagnostic Variants
///
/// The `Rung` variant keeps the rejected rung text next to the parser's
/// diagnostics, so a caller can point at the offending character.
#[derive(Debug, Error)]
pub enum L5xError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("{err}")]
    Rung { err: ParseError, text: String },

    #[error("{context}: {err}")]
    Codec { err: CodecError, context: String },

    #[error(transparent)]
    Dependency(#[from] DependencyError),

    #[error(transparent)]
    Name(#[from] NameError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error("{kind} `{name}` not found")]
    NotFound { kind: &'static str, name: String },

    #[error("{kind} `{name}` already exists")]
    AlreadyExists { kind: &'static str, name: String },

    #[error("module `{name}` would take address {address} of `{parent}`, held by `{occupant}`")]
    SlotTaken {
        name: String,
        parent: String,
        address: String,
        occupant: String,
    },

    #[error("rung {index} was deleted earlier in this transaction")]
    RungDeleted { index: usize },

    #[error("import conflict on {kind} `{name}`: {reason}")]
    ImportConflict {
        kind: &'static str,
        name: String,
        reason: String,
    },

    #[error("{0}")]
    InvalidArgument(String),
}

impl L5xError {
    /// Create a new `Rung` error with the rejected text.
    pub fn new_rung_error(err: ParseError, text: impl Into<String>) -> Self {
        Self::Rung {
            err,
            text: text.into(),
        }
    }

    /// Create a new `Codec` error naming the tag or member involved.
    pub fn new_codec_error(err: CodecError, context: impl Into<String>) -> Self {
        Self::Codec {
            err,
            context: context.into(),
        }
    }

    pub(crate) fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub(crate) fn already_exists(kind: &'static str, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            name: name.into(),
        }
    }
}

/// Errors that end a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    /// Validation rejected the result. The document is unchanged.
    #[error("transaction rolled back: {} error(s) found", report.errors().count())]
    RolledBack { report: ValidationReport },
}

impl TransactionError {
    /// The report that caused the rollback.
    pub fn report(&self) -> &ValidationReport {
        match self {
            TransactionError::RolledBack { report } => report,
        }
    }
}
