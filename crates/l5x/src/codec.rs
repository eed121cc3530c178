//! Tag value codec.
//!
//! A tag stores its value twice: a compact L5K text such as `[3,1.5e+000]`
//! and a Decorated element tree naming every visible member. This module
//! converts a logical [`Value`] to both forms and back.
//!
//! Everything is driven by a [`Shape`], resolved once from the tag's type
//! through a [`TypeLookup`]. Booleans packed into hidden backing integers
//! are read and written through their bit positions, and the backing
//! members never show up in a decoded value.
//!
//! # Example
//!
//! ```
//! # use l5x::codec::{self, Shape};
//! # use l5x_core::{Dimensions, SchemaTable, Value};
//! let schema = SchemaTable::standard();
//! let shape = Shape::resolve(&schema, "TIMER", &Dimensions::scalar(), None).unwrap();
//! let value = Value::structure([
//!     ("PRE", Value::Integer(5000)),
//!     ("ACC", Value::Integer(0)),
//!     ("EN", Value::Bool(false)),
//!     ("TT", Value::Bool(false)),
//!     ("DN", Value::Bool(true)),
//! ]);
//! let encoded = codec::encode(&shape, &value).unwrap();
//! assert_eq!(encoded.compact, "[536870912,5000,0]");
//! assert_eq!(codec::decode(&shape, &encoded.structured).unwrap(), value);
//! ```

mod compact;
mod decorated;
mod scalar;
mod shape;

use log::trace;
use thiserror::Error;

use l5x_core::{Dimensions, ElementNode, Radix, Value};

use crate::document::Document;

pub use scalar::format_exponential;
pub use shape::{Field, Shape, Slot, TypeLookup};

/// Errors raised while encoding or decoding values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("compact and structured values disagree at `{path}`")]
    FormatMismatch { path: String },

    #[error("data type `{type_name}` is not supported: {reason}")]
    UnsupportedType { type_name: String, reason: String },

    #[error("value {value} is out of range for {data_type}")]
    OutOfRangeValue { data_type: String, value: String },

    #[error("expected {expected} at `{path}`, found {found}")]
    ShapeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("malformed value text `{text}`")]
    Malformed { text: String },
}

/// Both stored forms of one value.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoded {
    /// L5K text.
    pub compact: String,
    /// Root of the Decorated form: `DataValue`, `Structure` or `Array`.
    pub structured: ElementNode,
    /// The value as stored: defaults filled in and REALs rounded to `f32`.
    /// Decoding either form yields exactly this.
    pub value: Value,
}

/// One stored form, used as the source of a [`resync`].
#[derive(Debug, Clone, Copy)]
pub enum Representation<'a> {
    Compact(&'a str),
    Structured(&'a ElementNode),
}

/// Encode a value in both forms.
///
/// Structure members missing from `value` take their declared default, or
/// zero. REAL values are stored at `f32` precision, so `0.1` comes back as
/// `f64::from(0.1f32)`; [`Encoded::value`] holds the stored value.
///
/// # Errors
///
/// Returns [`CodecError::OutOfRangeValue`] for integers outside the type's
/// range, non-finite reals and over-long strings, and
/// [`CodecError::ShapeMismatch`] when the value does not fit the shape.
pub fn encode(shape: &Shape, value: &Value) -> Result<Encoded, CodecError> {
    let compact = compact::write(shape, value)?;
    let structured = decorated::write(shape, value)?;
    let value = decorated::read(shape, &structured)?;
    trace!(data_type = shape.type_name(), compact; "Encoded value");
    Ok(Encoded {
        compact,
        structured,
        value,
    })
}

/// Decode the Decorated form.
pub fn decode(shape: &Shape, structured: &ElementNode) -> Result<Value, CodecError> {
    decorated::read(shape, structured)
}

/// Decode the L5K form.
pub fn decode_compact(shape: &Shape, compact: &str) -> Result<Value, CodecError> {
    compact::read(shape, compact)
}

/// Decode both forms and require them to agree.
///
/// # Errors
///
/// Returns [`CodecError::FormatMismatch`] naming the first member path where
/// the two values differ. Neither side is preferred.
pub fn decode_checked(
    shape: &Shape,
    compact: &str,
    structured: &ElementNode,
) -> Result<Value, CodecError> {
    let from_compact = decode_compact(shape, compact)?;
    let from_structured = decode(shape, structured)?;
    match first_difference(&from_compact, &from_structured, "") {
        None => Ok(from_structured),
        Some(path) => Err(CodecError::FormatMismatch { path }),
    }
}

/// Regenerate both forms from one of them, discarding the other.
pub fn resync(shape: &Shape, source: Representation<'_>) -> Result<Encoded, CodecError> {
    let value = match source {
        Representation::Compact(text) => decode_compact(shape, text)?,
        Representation::Structured(element) => decode(shape, element)?,
    };
    encode(shape, &value)
}

/// Carry `value` over to `shape`, whose layout may have changed.
///
/// Structure members are matched by name, ignoring case, and arrays by
/// position. Whatever has no counterpart, or no longer holds the same kind
/// of value, takes its default.
pub fn reshape(shape: &Shape, value: &Value) -> Value {
    match (shape, value) {
        (Shape::Structure { fields, .. }, Value::Structure(members)) => Value::Structure(
            fields
                .iter()
                .filter(|f| !f.hidden)
                .map(|field| {
                    let kept = members
                        .iter()
                        .find(|(name, _)| name.eq_ignore_ascii_case(&field.name))
                        .map(|(_, v)| v);
                    let value = match (kept, &field.slot) {
                        (Some(bit @ Value::Bool(_)), Slot::Bit { .. }) => bit.clone(),
                        (Some(kept), Slot::Value(inner)) => reshape(inner, kept),
                        _ => field.default_value(),
                    };
                    (field.name.clone(), value)
                })
                .collect(),
        ),
        (Shape::Array { element, dims }, Value::Array(items)) => Value::Array(
            (0..dims.element_count())
                .map(|i| match items.get(i) {
                    Some(item) => reshape(element, item),
                    None => element.zero_value(),
                })
                .collect(),
        ),
        (Shape::Scalar { .. } | Shape::Text { .. }, value) => {
            let zero = shape.zero_value();
            if std::mem::discriminant(&zero) == std::mem::discriminant(value) {
                value.clone()
            } else {
                zero
            }
        }
        _ => shape.zero_value(),
    }
}

/// The layout of a `Tag` element's value, from its type, dimensions and
/// radix attributes.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] for an unreadable `Dimensions`
/// attribute and fails like [`Shape::resolve`] otherwise.
pub(crate) fn tag_shape(document: &Document, tag: &ElementNode) -> Result<Shape, CodecError> {
    let data_type = tag.attribute("DataType").unwrap_or_default();
    let dims = match tag.attribute("Dimensions") {
        Some(text) => Dimensions::parse(text).ok_or_else(|| CodecError::Malformed {
            text: text.to_string(),
        })?,
        None => Dimensions::scalar(),
    };
    let radix = tag.attribute("Radix").and_then(Radix::from_name);
    Shape::resolve(document, data_type, &dims, radix)
}

/// The `Data` child of a tag holding the given format, `L5K` or `Decorated`.
pub(crate) fn tag_data<'a>(tag: &'a ElementNode, format: &str) -> Option<&'a ElementNode> {
    tag.children_labeled("Data")
        .find(|d| d.attribute("Format") == Some(format))
}

/// Path of the first place two decoded values differ. Empty means the root.
fn first_difference(a: &Value, b: &Value, path: &str) -> Option<String> {
    match (a, b) {
        (Value::Structure(left), Value::Structure(right)) => {
            if left.len() != right.len() {
                return Some(path.to_string());
            }
            left.iter().find_map(|(name, value)| {
                let member = if path.is_empty() {
                    name.clone()
                } else {
                    format!("{path}.{name}")
                };
                match right.get(name) {
                    Some(other) => first_difference(value, other, &member),
                    None => Some(member),
                }
            })
        }
        (Value::Array(left), Value::Array(right)) => {
            if left.len() != right.len() {
                return Some(path.to_string());
            }
            left.iter()
                .zip(right)
                .enumerate()
                .find_map(|(i, (l, r))| first_difference(l, r, &format!("{path}[{i}]")))
        }
        _ if a == b => None,
        _ => Some(path.to_string()),
    }
}

/// Dotted path of a member below `parent`.
fn member_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}
