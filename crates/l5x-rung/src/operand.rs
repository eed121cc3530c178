//! Grammar of a single instruction argument.
//!
//! The lexer hands the parser each argument as raw text. This module decides
//! whether that text is a placeholder, a numeric literal or a tag reference,
//! and builds the matching [`Operand`].

use winnow::{
    Parser as _,
    ascii::digit1,
    combinator::{alt, delimited, opt, preceded, repeat, separated},
    error::{ContextError, ErrMode},
    token::{one_of, take_while},
};

use crate::ast::{IndexItem, NumericLiteral, Operand, Segment, TagReference};

type Input<'a> = &'a str;
type OResult<O> = Result<O, ErrMode<ContextError>>;

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn identifier<'a>(input: &mut Input<'a>) -> OResult<&'a str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., is_word),
    )
        .take()
        .parse_next(input)
}

/// Tag base name. Module-defined tags carry `:` parts, e.g. `Local:1:I`.
fn base_name<'a>(input: &mut Input<'a>) -> OResult<&'a str> {
    (
        identifier,
        repeat::<_, _, (), _, _>(0.., (':', take_while(1.., is_word))),
    )
        .take()
        .parse_next(input)
}

fn digits<'a>(input: &mut Input<'a>) -> OResult<&'a str> {
    (digit1, take_while(0.., |c: char| c.is_ascii_digit() || c == '_'))
        .take()
        .parse_next(input)
}

fn radix_number<'a>(input: &mut Input<'a>) -> OResult<&'a str> {
    alt((
        ("16#", take_while(1.., |c: char| c.is_ascii_hexdigit() || c == '_')),
        ("8#", take_while(1.., |c: char| matches!(c, '0'..='7' | '_'))),
        ("2#", take_while(1.., |c: char| matches!(c, '0' | '1' | '_'))),
    ))
    .take()
    .parse_next(input)
}

fn decimal_number<'a>(input: &mut Input<'a>) -> OResult<&'a str> {
    (
        opt(one_of(['+', '-'])),
        digits,
        opt(('.', digits)),
        opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), digits)),
    )
        .take()
        .parse_next(input)
}

fn number<'a>(input: &mut Input<'a>) -> OResult<&'a str> {
    alt((radix_number, decimal_number)).parse_next(input)
}

fn integer<'a>(input: &mut Input<'a>) -> OResult<&'a str> {
    alt((radix_number, (opt('-'), digits).take())).parse_next(input)
}

fn index_item(input: &mut Input<'_>) -> OResult<IndexItem> {
    alt((
        integer.map(|text: &str| IndexItem::Number(NumericLiteral::new(text))),
        tag_reference.map(IndexItem::Tag),
    ))
    .parse_next(input)
}

fn segment(input: &mut Input<'_>) -> OResult<Segment> {
    alt((
        preceded('.', take_while(1.., is_word))
            .map(|member: &str| Segment::Member(member.to_string())),
        delimited('[', separated(1.., index_item, ','), ']').map(Segment::Index),
    ))
    .parse_next(input)
}

fn tag_reference(input: &mut Input<'_>) -> OResult<TagReference> {
    (base_name, repeat(0.., segment))
        .map(|(base, segments): (&str, Vec<Segment>)| TagReference {
            base: base.to_string(),
            segments,
        })
        .parse_next(input)
}

fn operand(input: &mut Input<'_>) -> OResult<Operand> {
    alt((
        '?'.value(Operand::Placeholder),
        number.map(|text: &str| Operand::Number(NumericLiteral::new(text))),
        tag_reference.map(Operand::Tag),
    ))
    .parse_next(input)
}

/// Parse one whole argument. `None` unless the entire text matches.
pub(crate) fn parse_operand(text: &str) -> Option<Operand> {
    let mut input = text;
    let operand = operand.parse_next(&mut input).ok()?;
    input.is_empty().then_some(operand)
}
