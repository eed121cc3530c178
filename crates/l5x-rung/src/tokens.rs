//! Tokens produced by the rung lexer.

use std::fmt;

use crate::span::Span;

/// Token types of the rung instruction language
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'src> {
    /// Instruction mnemonic, e.g. `XIC` or an AOI name
    InstructionName(&'src str),
    /// Raw argument text between `(`/`,` and `,`/`)`
    Arg(&'src str),

    OpenParen,    // (
    CloseParen,   // )
    Comma,        // ,
    OpenBracket,  // [
    CloseBracket, // ]
    Semicolon,    // ;

    /// The single space allowed before a branch `,` or `]`
    Space,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::InstructionName(name) => write!(f, "instruction `{name}`"),
            Token::Arg(arg) => write!(f, "argument `{arg}`"),
            Token::OpenParen => write!(f, "`(`"),
            Token::CloseParen => write!(f, "`)`"),
            Token::Comma => write!(f, "`,`"),
            Token::OpenBracket => write!(f, "`[`"),
            Token::CloseBracket => write!(f, "`]`"),
            Token::Semicolon => write!(f, "`;`"),
            Token::Space => write!(f, "space"),
        }
    }
}

/// A token with position information for winnow integration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionedToken<'src> {
    pub token: Token<'src>,
    pub span: Span,
}

impl<'src> PositionedToken<'src> {
    pub fn new(token: Token<'src>, span: Span) -> Self {
        Self { token, span }
    }
}

impl<'src> std::ops::Deref for PositionedToken<'src> {
    type Target = Token<'src>;

    fn deref(&self) -> &Self::Target {
        &self.token
    }
}

impl fmt::Display for PositionedToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}..{}", self.token, self.span.start(), self.span.end())
    }
}
