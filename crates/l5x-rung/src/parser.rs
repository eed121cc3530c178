//! Parser for rung tokens.
//!
//! This module turns the token stream from the [`lexer`](super::lexer) into a
//! [`Rung`] tree. The public entry point is [`build_rung`].
//!
//! Structural errors are reported with specific codes: an unclosed or stray
//! bracket is E101, a missing `;` is E102, an argument that is not an operand
//! is E103, a branch separator without its leading space is E104 and text
//! after the `;` is E105. Anything else unexpected is E100.

use log::trace;
use winnow::{
    Parser,
    combinator::{alt, repeat, separated, terminated},
    error::{ContextError, ErrMode},
    stream::{Stream, TokenSlice},
    token::any,
};

use crate::{
    ast::{Branch, Element, InstructionCall, Operand, Rung},
    error::{Diagnostic, ErrorCode},
    operand::parse_operand,
    span::Span,
    tokens::{PositionedToken, Token},
};

/// Context type for parser errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Context {
    /// Error code to report
    Code(ErrorCode),
    /// Human-readable description of the problem
    Message(&'static str),
    /// Remaining token count (`eof_offset()`) at error start position
    ///
    /// Used to calculate start_offset as: `tokens.len() - start_offset_value`
    StartOffset(usize),
}

type Input<'src> = RungTokenSlice<'src>;
type IResult<O> = std::result::Result<O, ErrMode<ContextError<Context>>>;
/// Type alias for winnow TokenSlice with our positioned tokens
type RungTokenSlice<'src> = TokenSlice<'src, PositionedToken<'src>>;

/// Helper to create a Cut error carrying a code, a message and a start offset
fn syntax_error(
    code: ErrorCode,
    message: &'static str,
    start_offset: usize,
) -> ErrMode<ContextError<Context>> {
    let mut e = ContextError::new();
    e.push(Context::Code(code));
    e.push(Context::Message(message));
    e.push(Context::StartOffset(start_offset));
    ErrMode::Cut(e)
}

/// Match one punctuation token and return its span
fn token<'src>(
    expected: Token<'static>,
) -> impl Parser<Input<'src>, Span, ErrMode<ContextError<Context>>> {
    any.verify_map(move |token: &PositionedToken<'src>| {
        (token.token == expected).then_some(token.span)
    })
}

fn peek_kind<'src>(input: &Input<'src>) -> Option<&'src Token<'src>> {
    input.peek_token().map(|token| &token.token)
}

fn instruction_name<'src>(input: &mut Input<'src>) -> IResult<&'src str> {
    any.verify_map(|token: &PositionedToken<'src>| match token.token {
        Token::InstructionName(name) => Some(name),
        _ => None,
    })
    .parse_next(input)
}

/// Parse one argument token into an operand
fn argument<'src>(input: &mut Input<'src>) -> IResult<Operand> {
    let start = input.eof_offset();
    let text = any
        .verify_map(|token: &PositionedToken<'src>| match token.token {
            Token::Arg(text) => Some(text),
            _ => None,
        })
        .parse_next(input)?;

    if text.is_empty() {
        return Err(syntax_error(ErrorCode::E103, "empty argument", start));
    }
    parse_operand(text).ok_or_else(|| {
        syntax_error(
            ErrorCode::E103,
            "argument is not a tag reference, number or `?`",
            start,
        )
    })
}

/// `NAME '(' [arg (',' arg)*] ')'`
fn instruction<'src>(input: &mut Input<'src>) -> IResult<InstructionCall> {
    let start = input.eof_offset();
    let name = instruction_name.parse_next(input)?;

    if token(Token::OpenParen).parse_next(input).is_err() {
        return Err(syntax_error(
            ErrorCode::E100,
            "expected `(` after instruction name",
            start,
        ));
    }

    let arguments = alt((
        token(Token::CloseParen).value(Vec::new()),
        terminated(
            separated(1.., argument, token(Token::Comma)),
            token(Token::CloseParen),
        ),
    ))
    .parse_next(input)?;

    Ok(InstructionCall::new(name, arguments))
}

/// `'[' path (' ,' path)* ' ]'`
fn branch<'src>(input: &mut Input<'src>) -> IResult<Branch> {
    let start = input.eof_offset();
    token(Token::OpenBracket).parse_next(input)?;

    let mut paths = vec![series.parse_next(input)?];
    loop {
        let separator_start = input.eof_offset();
        match peek_kind(input) {
            Some(Token::Space) => {
                input.next_token();
                match input.next_token().map(|token| &token.token) {
                    Some(Token::Comma) => paths.push(series.parse_next(input)?),
                    Some(Token::CloseBracket) => return Ok(Branch { paths }),
                    _ => {
                        return Err(syntax_error(
                            ErrorCode::E100,
                            "expected ` ,` or ` ]` after branch path",
                            separator_start,
                        ));
                    }
                }
            }
            Some(Token::Comma | Token::CloseBracket) => {
                input.next_token();
                return Err(syntax_error(
                    ErrorCode::E104,
                    "branch separator must be preceded by a single space",
                    separator_start,
                ));
            }
            _ => {
                return Err(syntax_error(
                    ErrorCode::E101,
                    "branch is never closed",
                    start,
                ));
            }
        }
    }
}

fn element<'src>(input: &mut Input<'src>) -> IResult<Element> {
    alt((
        instruction.map(Element::Instruction),
        branch.map(Element::Branch),
    ))
    .parse_next(input)
}

fn series<'src>(input: &mut Input<'src>) -> IResult<Vec<Element>> {
    repeat(0.., element).parse_next(input)
}

/// The `;` closing the rung
fn terminator<'src>(input: &mut Input<'src>) -> IResult<()> {
    let start = input.eof_offset();
    let Some(next) = input.next_token() else {
        return Err(syntax_error(
            ErrorCode::E102,
            "rung is missing its terminating `;`",
            start,
        ));
    };

    match next.token {
        Token::Semicolon => Ok(()),
        Token::CloseBracket => Err(syntax_error(
            ErrorCode::E101,
            "`]` without a matching `[`",
            start,
        )),
        Token::Space if matches!(peek_kind(input), Some(Token::CloseBracket)) => {
            input.next_token();
            Err(syntax_error(
                ErrorCode::E101,
                "`]` without a matching `[`",
                start,
            ))
        }
        _ => Err(syntax_error(
            ErrorCode::E100,
            "expected `;` at end of rung",
            start,
        )),
    }
}

fn end_of_input<'src>(input: &mut Input<'src>) -> IResult<()> {
    let start = input.eof_offset();
    if start == 0 {
        return Ok(());
    }
    input.next_slice(start);
    Err(syntax_error(
        ErrorCode::E105,
        "unexpected text after `;`",
        start,
    ))
}

fn rung<'src>(input: &mut Input<'src>) -> IResult<Rung> {
    let elements = series.parse_next(input)?;
    terminator.parse_next(input)?;
    end_of_input.parse_next(input)?;
    Ok(Rung::new(elements))
}

fn help_for(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::E101 => "every `[` needs a matching ` ]`",
        ErrorCode::E102 => "end the rung with `;`",
        ErrorCode::E103 => "arguments are tag references, numeric literals or `?`",
        ErrorCode::E104 => "write branch separators as ` ,` and close branches with ` ]`",
        ErrorCode::E105 => "a rung ends at its first `;`",
        _ => "check the instruction syntax",
    }
}

/// Utility function to convert winnow errors to our custom error format
///
/// Extracts the code, message and start position from the error context and
/// computes the error span from the token array.
fn convert_error(
    error: ErrMode<ContextError<Context>>,
    tokens: &[PositionedToken],
    current_remaining: usize,
) -> Diagnostic {
    let context = match error {
        ErrMode::Backtrack(e) | ErrMode::Cut(e) => e,
        ErrMode::Incomplete(_) => ContextError::new(),
    };

    let mut code = None;
    let mut message = None;
    let mut start_remaining = None;
    for ctx in context.context() {
        match ctx {
            Context::Code(c) => {
                code.get_or_insert(*c);
            }
            Context::Message(m) => {
                message.get_or_insert(*m);
            }
            Context::StartOffset(n) => {
                start_remaining.get_or_insert(*n);
            }
        }
    }
    let code = code.unwrap_or(ErrorCode::E100);

    // Calculate offsets from remaining token counts
    let end_offset = tokens.len() - current_remaining;
    let start_offset = start_remaining
        .map(|r| tokens.len() - r)
        .unwrap_or(end_offset);

    let error_span = if start_offset < end_offset {
        // Parser consumed tokens - cover that range
        tokens[start_offset].span.union(tokens[end_offset - 1].span)
    } else if let Some(token) = tokens.get(end_offset) {
        token.span
    } else {
        // End of input - point just past the last token
        let end = tokens.last().map(|t| t.span.end()).unwrap_or(0);
        Span::new(end..end)
    };

    Diagnostic::error(message.unwrap_or("unexpected token or end of input"))
        .with_code(code)
        .with_label(error_span, code.description())
        .with_help(help_for(code))
}

/// Build a rung from tokens
pub fn build_rung<'src>(tokens: &'src [PositionedToken<'src>]) -> Result<Rung, Diagnostic> {
    let mut token_slice = TokenSlice::new(tokens);

    match rung.parse_next(&mut token_slice) {
        Ok(rung) => {
            trace!(elements = rung.elements.len(); "Parsed rung");
            Ok(rung)
        }
        Err(e) => {
            let current_remaining = token_slice.eof_offset();
            Err(convert_error(e, tokens, current_remaining))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_tokens(input: &str) -> Vec<PositionedToken<'_>> {
        tokenize(input).expect("Failed to tokenize input")
    }

    #[test]
    fn test_instruction_name() {
        let tokens = parse_tokens("XIC(A)");
        let mut slice = TokenSlice::new(&tokens);
        assert_eq!(instruction_name.parse_next(&mut slice).unwrap(), "XIC");
    }

    #[test]
    fn test_instruction() {
        let tokens = parse_tokens("TON(Timer1,?,?)");
        let mut slice = TokenSlice::new(&tokens);
        let call = instruction.parse_next(&mut slice).unwrap();
        assert_eq!(call.name, "TON");
        assert_eq!(call.arguments.len(), 3);
        assert!(call.arguments[1].is_placeholder());
        assert_eq!(slice.eof_offset(), 0);
    }

    #[test]
    fn test_branch_with_nested_branch() {
        let tokens = parse_tokens("[XIC(A) ,[XIC(B) ,XIC(C) ] ]");
        let mut slice = TokenSlice::new(&tokens);
        let branch = branch.parse_next(&mut slice).unwrap();
        assert_eq!(branch.paths.len(), 2);
        assert!(matches!(branch.paths[1][0], Element::Branch(_)));
    }

    #[test]
    fn test_error_span_covers_argument() {
        let tokens = parse_tokens("XIC(1A);");
        let diag = build_rung(&tokens).unwrap_err();
        assert_eq!(diag.code(), Some(ErrorCode::E103));
        assert_eq!(diag.primary_span(), Some(Span::new(4..6)));
    }

    #[test]
    fn test_missing_terminator_points_at_end() {
        let tokens = parse_tokens("XIC(A)");
        let diag = build_rung(&tokens).unwrap_err();
        assert_eq!(diag.code(), Some(ErrorCode::E102));
        assert_eq!(diag.primary_span(), Some(Span::new(6..6)));
    }

    #[test]
    fn test_unclosed_branch_covers_branch() {
        let tokens = parse_tokens("[XIC(A) ,XIC(B);");
        let diag = build_rung(&tokens).unwrap_err();
        assert_eq!(diag.code(), Some(ErrorCode::E101));
        assert_eq!(diag.primary_span().map(|s| s.start()), Some(0));
    }

    #[test]
    fn test_empty_token_stream() {
        let diag = build_rung(&[]).unwrap_err();
        assert_eq!(diag.code(), Some(ErrorCode::E102));
        assert_eq!(diag.primary_span(), Some(Span::new(0..0)));
    }
}
