//! # L5X Rung
//!
//! Tokenizer, parser and printer for ladder rung instruction text, plus the
//! reference queries and renames built on top of the parsed tree.
//!
//! ## Usage
//!
//! ```
//! # use l5x_rung::{parse, ParseError};
//!
//! fn main() -> Result<(), ParseError> {
//!     let rung = parse("[XIC(Start) ,XIC(Motor) ]XIO(Stop)OTE(Motor);")?;
//!     assert_eq!(rung.references(), ["Start", "Motor", "Stop"]);
//!     assert_eq!(rung.to_string(), "[XIC(Start) ,XIC(Motor) ]XIO(Stop)OTE(Motor);");
//!     Ok(())
//! }
//! ```

pub mod ast;
pub mod error;
mod lexer;
mod operand;
mod parser;
mod printer;
mod references;
mod span;
mod substitute;
pub mod tokens;

pub use ast::{
    Branch, Element, IndexItem, InstructionCall, NumericLiteral, Operand, Rung, Segment,
    TagReference,
};
pub use error::{Diagnostic, ErrorCode, ParseError, SyntaxKind};
pub use lexer::tokenize;
pub use references::TagReferences;
pub use span::Span;
pub use substitute::substitute;

/// Parse rung text into a [`Rung`].
///
/// The text must be canonical: a series of instructions and branches ending
/// in `;`, with no whitespace other than the single space before a branch
/// `,` or `]`.
///
/// # Errors
///
/// Returns a [`ParseError`] holding every lexical problem found, or the first
/// structural one.
pub fn parse(text: &str) -> Result<Rung, ParseError> {
    // Step 1: Tokenize
    let tokens = lexer::tokenize(text)?;

    // Step 2: Parse
    let rung = parser::build_rung(&tokens)?;
    Ok(rung)
}
