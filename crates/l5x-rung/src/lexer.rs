//! Lexical analyzer for rung text.
//!
//! Rung text has two lexical modes. Between instructions the lexer produces
//! instruction names, brackets, branch separators and the terminator. Inside
//! an instruction's parentheses everything up to the next `,` or `)` at
//! bracket depth zero is one raw [`Token::Arg`], so indexed operands such as
//! `Table[Row,Col]` stay intact. Argument grammar is checked by the parser.
//!
//! Whitespace is significant: the only space allowed is the single one in
//! front of a branch `,` or `]`. Any other whitespace is a lexer error.
//!
//! The public entry point is [`tokenize`], which recovers after errors and
//! reports every problem found in one pass.

use std::cell::Cell;

use winnow::{
    Parser as _,
    combinator::{alt, peek},
    error::{ContextError, ErrMode},
    stream::{LocatingSlice, Location, Stream},
    token::{one_of, take_while},
};

use crate::{
    error::{Diagnostic, DiagnosticCollector, ErrorCode, ParseError},
    span::Span,
    tokens::{PositionedToken, Token},
};

/// Rich diagnostic information for lexer errors.
///
/// Attached to winnow errors as context so the lexer can report a code,
/// message and help text at the failing position.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LexerDiagnostic {
    code: ErrorCode,
    message: &'static str,
    help: Option<&'static str>,
    start: usize,
}

type Input<'a> = LocatingSlice<&'a str>;
type IResult<O> = Result<O, ErrMode<ContextError<LexerDiagnostic>>>;

/// Where the lexer is relative to an instruction's argument list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Between instructions.
    Series,
    /// Directly after `(`.
    ArgumentStart,
    /// Directly after an argument `,`.
    ArgumentSlot,
    /// After an argument, expecting `,` or `)`.
    AfterArgument,
}

fn cut(diagnostic: LexerDiagnostic) -> ErrMode<ContextError<LexerDiagnostic>> {
    let mut error = ContextError::new();
    error.push(diagnostic);
    ErrMode::Cut(error)
}

/// Instruction mnemonic: a letter or underscore, then letters, digits, underscores.
fn instruction_name<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .map(Token::InstructionName)
        .parse_next(input)
}

fn punctuation<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    alt((
        '('.value(Token::OpenParen),
        '['.value(Token::OpenBracket),
        ']'.value(Token::CloseBracket),
        ','.value(Token::Comma),
        ';'.value(Token::Semicolon),
    ))
    .parse_next(input)
}

/// The single space allowed in front of a branch separator or close.
fn branch_space<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    (' ', peek(one_of([',', ']'])))
        .value(Token::Space)
        .parse_next(input)
}

/// Any other whitespace is rejected without being consumed.
fn stray_whitespace<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    let start = input.current_token_start();
    peek(one_of(|c: char| c.is_whitespace())).parse_next(input)?;
    Err(cut(LexerDiagnostic {
        code: ErrorCode::E003,
        message: "unexpected whitespace",
        help: Some("only a single space before a branch `,` or `]` is allowed"),
        start,
    }))
}

fn series_token<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    alt((instruction_name, punctuation, branch_space, stray_whitespace)).parse_next(input)
}

/// Raw argument text, possibly empty.
///
/// Stops at `)`, `;`, whitespace, or a `,` that is not inside brackets.
fn argument<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    let depth = Cell::new(0usize);
    take_while(0.., move |c: char| match c {
        '[' => {
            depth.set(depth.get() + 1);
            true
        }
        ']' => {
            depth.set(depth.get().saturating_sub(1));
            true
        }
        ',' => depth.get() > 0,
        ')' | ';' => false,
        c => !c.is_whitespace(),
    })
    .map(Token::Arg)
    .parse_next(input)
}

fn first_argument<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    alt((')'.value(Token::CloseParen), argument)).parse_next(input)
}

fn nonempty_argument<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    argument
        .verify(|token: &Token<'a>| !matches!(token, Token::Arg("")))
        .parse_next(input)
}

fn argument_delimiter<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    alt((
        ','.value(Token::Comma),
        ')'.value(Token::CloseParen),
        stray_whitespace,
        nonempty_argument,
    ))
    .parse_next(input)
}

fn positioned<'a>(
    input: &mut Input<'a>,
    parser: fn(&mut Input<'a>) -> IResult<Token<'a>>,
) -> IResult<PositionedToken<'a>> {
    let start = input.current_token_start();
    let token = parser(input)?;
    let end = input.current_token_start();
    Ok(PositionedToken::new(token, Span::new(start..end)))
}

/// Lexer that accumulates tokens and diagnostics during tokenization.
struct Lexer<'a> {
    tokens: Vec<PositionedToken<'a>>,
    diagnostics: DiagnosticCollector,
    mode: Mode,
    open_paren: Option<Span>,
}

impl<'a> Lexer<'a> {
    fn new() -> Self {
        Self {
            tokens: Vec::new(),
            diagnostics: DiagnosticCollector::new(),
            mode: Mode::Series,
            open_paren: None,
        }
    }

    /// Tokenize the input, collecting tokens and errors.
    fn tokenize(&mut self, mut input: Input<'a>) {
        while !input.is_empty() {
            if self.mode == Mode::AfterArgument && input.peek_token() == Some(';') {
                let position = input.current_token_start();
                self.unterminated_arguments(position);
                continue;
            }

            let result = match self.mode {
                Mode::Series => positioned(&mut input, series_token),
                Mode::ArgumentStart => positioned(&mut input, first_argument),
                Mode::ArgumentSlot => positioned(&mut input, argument),
                Mode::AfterArgument => positioned(&mut input, argument_delimiter),
            };

            match result {
                Ok(token) => {
                    self.advance_mode(&token);
                    self.tokens.push(token);
                }
                Err(e) => {
                    let error_pos = input.current_token_start();
                    self.diagnostics.emit(Self::convert_err_mode(e, error_pos));
                    if !input.is_empty() {
                        input.next_token();
                    }
                }
            }
        }

        if self.mode != Mode::Series {
            self.unterminated_arguments(input.current_token_start());
        }
    }

    fn advance_mode(&mut self, token: &PositionedToken<'a>) {
        self.mode = match (self.mode, &token.token) {
            (_, Token::OpenParen) => {
                self.open_paren = Some(token.span);
                Mode::ArgumentStart
            }
            (_, Token::CloseParen) => Mode::Series,
            (_, Token::Comma) if self.mode != Mode::Series => Mode::ArgumentSlot,
            (_, Token::Arg(_)) => Mode::AfterArgument,
            (mode, _) => mode,
        };
    }

    /// Report an argument list cut off by `;` or the end of the text and
    /// resume lexing between instructions.
    fn unterminated_arguments(&mut self, position: usize) {
        let mut diagnostic = Diagnostic::error("argument list is not closed")
            .with_code(ErrorCode::E002)
            .with_label(
                Span::new(position..position + 1),
                ErrorCode::E002.description(),
            )
            .with_help("close the argument list with `)`");
        if let Some(open) = self.open_paren {
            diagnostic = diagnostic.with_secondary_label(open, "argument list opened here");
        }
        self.diagnostics.emit(diagnostic);
        self.mode = Mode::Series;
    }

    /// Finish lexing and return tokens or collected errors.
    fn finish(self) -> Result<Vec<PositionedToken<'a>>, ParseError> {
        self.diagnostics.finish().map(|()| self.tokens)
    }

    /// Convert an ErrMode and error position to a Diagnostic.
    ///
    /// Falls back to E001 (unexpected character) if no diagnostic context
    /// is found.
    fn convert_err_mode(
        err: ErrMode<ContextError<LexerDiagnostic>>,
        error_pos: usize,
    ) -> Diagnostic {
        let context_error = match err {
            ErrMode::Backtrack(ctx) | ErrMode::Cut(ctx) => ctx,
            ErrMode::Incomplete(_) => ContextError::new(),
        };

        if let Some(LexerDiagnostic {
            code,
            message,
            help,
            start,
        }) = context_error.context().next()
        {
            let span = Span::new(*start..error_pos.max(start + 1));

            let mut diag = Diagnostic::error(*message)
                .with_code(*code)
                .with_label(span, code.description());
            if let Some(h) = help {
                diag = diag.with_help(*h);
            }
            return diag;
        }

        let span = Span::new(error_pos..error_pos.saturating_add(1));
        Diagnostic::error("unexpected character")
            .with_code(ErrorCode::E001)
            .with_label(span, ErrorCode::E001.description())
    }
}

/// Tokenize rung text, collecting every lexical error.
///
/// # Returns
///
/// - `Ok(tokens)` - All tokens successfully lexed
/// - `Err(ParseError)` - One or more errors occurred; contains all diagnostics
pub fn tokenize(input: &str) -> Result<Vec<PositionedToken<'_>>, ParseError> {
    let located_input = LocatingSlice::new(input);
    let mut lexer = Lexer::new();
    lexer.tokenize(located_input);
    lexer.finish()
}


#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::*;

    fn identifier_strategy() -> impl Strategy<Value = String> {
        "[A-Za-z_][A-Za-z0-9_]{0,20}"
    }

    fn check_instruction_names_tokenize(name: &str) -> Result<(), TestCaseError> {
        let source = format!("{name}({name});");
        let tokens = tokenize(&source);
        prop_assert!(tokens.is_ok(), "failed to tokenize `{source}`: {tokens:?}");
        let tokens = tokens.unwrap();
        prop_assert_eq!(&tokens[0].token, &Token::InstructionName(name));
        prop_assert_eq!(&tokens[2].token, &Token::Arg(name));
        Ok(())
    }

    proptest! {
        #[test]
        fn instruction_names_tokenize(name in identifier_strategy()) {
            check_instruction_names_tokenize(&name)?;
        }
    }
}
