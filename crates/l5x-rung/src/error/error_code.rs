//! Error codes for rung diagnostics.
//!
//! Codes are grouped by phase:
//! - `E0xx` - Lexer errors
//! - `E1xx` - Parser errors

use std::fmt;

/// Error codes for categorizing diagnostic errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Lexer Errors (E0xx)
    // =========================================================================
    /// Unexpected character.
    ///
    /// A character that cannot start any token.
    E001,

    /// Unterminated argument list.
    ///
    /// An instruction's `(` is not closed before `;` or the end of the text.
    E002,

    /// Unexpected whitespace.
    ///
    /// Only a single space directly before a branch `,` or `]` is allowed.
    E003,

    // =========================================================================
    // Parser Errors (E1xx)
    // =========================================================================
    /// Unexpected token.
    E100,

    /// Unmatched bracket.
    ///
    /// A branch `[` is never closed, or a `]` has no opening bracket.
    E101,

    /// Missing terminator.
    ///
    /// The rung does not end with `;`.
    E102,

    /// Malformed argument.
    ///
    /// An argument is empty or is not a tag reference, number or `?`.
    E103,

    /// Malformed branch separator.
    ///
    /// A branch `,` or `]` is not preceded by exactly one space.
    E104,

    /// Trailing input.
    ///
    /// Text follows the terminating `;`.
    E105,
}

/// Syntax error kinds reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    /// Tokenizer failure at a position.
    Lex,
    UnexpectedToken,
    UnmatchedBracket,
    MissingTerminator,
    MalformedArgument,
    MalformedSeparator,
    TrailingInput,
}

impl fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyntaxKind::Lex => "LexError",
            SyntaxKind::UnexpectedToken => "UnexpectedToken",
            SyntaxKind::UnmatchedBracket => "UnmatchedBracket",
            SyntaxKind::MissingTerminator => "MissingTerminator",
            SyntaxKind::MalformedArgument => "MalformedArgument",
            SyntaxKind::MalformedSeparator => "MalformedSeparator",
            SyntaxKind::TrailingInput => "TrailingInput",
        };
        f.write_str(name)
    }
}

impl ErrorCode {
    /// Returns the numeric code as a string (e.g., "E001").
    pub fn as_str(&self) -> &'static str {
        match self {
            // Lexer errors
            ErrorCode::E001 => "E001",
            ErrorCode::E002 => "E002",
            ErrorCode::E003 => "E003",
            // Parser errors
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E102 => "E102",
            ErrorCode::E103 => "E103",
            ErrorCode::E104 => "E104",
            ErrorCode::E105 => "E105",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            // Lexer errors
            ErrorCode::E001 => "unexpected character",
            ErrorCode::E002 => "unterminated argument list",
            ErrorCode::E003 => "unexpected whitespace",
            // Parser errors
            ErrorCode::E100 => "unexpected token",
            ErrorCode::E101 => "unmatched bracket",
            ErrorCode::E102 => "missing terminator",
            ErrorCode::E103 => "malformed argument",
            ErrorCode::E104 => "malformed branch separator",
            ErrorCode::E105 => "trailing input",
        }
    }

    /// The syntax error kind this code belongs to.
    pub fn kind(&self) -> SyntaxKind {
        match self {
            ErrorCode::E001 | ErrorCode::E002 | ErrorCode::E003 => SyntaxKind::Lex,
            ErrorCode::E100 => SyntaxKind::UnexpectedToken,
            ErrorCode::E101 => SyntaxKind::UnmatchedBracket,
            ErrorCode::E102 => SyntaxKind::MissingTerminator,
            ErrorCode::E103 => SyntaxKind::MalformedArgument,
            ErrorCode::E104 => SyntaxKind::MalformedSeparator,
            ErrorCode::E105 => SyntaxKind::TrailingInput,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
