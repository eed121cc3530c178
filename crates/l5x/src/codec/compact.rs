//! The L5K form: nested bracketed lists of scalar text.

use std::collections::HashMap;
use std::fmt::Write as _;

use indexmap::IndexMap;
use winnow::{
    Parser as _,
    ascii::multispace0,
    combinator::{alt, delimited, repeat, separated},
    error::{ContextError, ErrMode},
    token::{any, none_of, take_while},
};

use l5x_core::Value;

use super::{
    CodecError, member_path,
    scalar::{self, escape_bytes, unescape_bytes},
    shape::{Field, Shape, Slot},
};

type Input<'a> = &'a str;
type OResult<O> = Result<O, ErrMode<ContextError>>;

/// L5K text before it is matched against a shape.
#[derive(Debug, PartialEq)]
enum Raw<'a> {
    Atom(&'a str),
    /// Body of a `'…'` literal, still escaped.
    Quoted(&'a str),
    List(Vec<Raw<'a>>),
}

impl Raw<'_> {
    fn describe(&self) -> &'static str {
        match self {
            Raw::Atom(_) => "a scalar",
            Raw::Quoted(_) => "quoted text",
            Raw::List(_) => "a list",
        }
    }
}

fn atom<'a>(input: &mut Input<'a>) -> OResult<Raw<'a>> {
    take_while(1.., |c: char| {
        !matches!(c, ',' | '[' | ']' | '\'') && !c.is_whitespace()
    })
    .map(Raw::Atom)
    .parse_next(input)
}

fn quoted<'a>(input: &mut Input<'a>) -> OResult<Raw<'a>> {
    let body = repeat::<_, _, (), _, _>(
        0..,
        alt((('$', any).void(), none_of(['\'', '$']).void())),
    )
    .take();
    delimited('\'', body, '\'').map(Raw::Quoted).parse_next(input)
}

fn list<'a>(input: &mut Input<'a>) -> OResult<Raw<'a>> {
    delimited('[', separated(0.., raw, ','), (multispace0, ']'))
        .map(Raw::List)
        .parse_next(input)
}

fn raw<'a>(input: &mut Input<'a>) -> OResult<Raw<'a>> {
    delimited(multispace0, alt((list, quoted, atom)), multispace0).parse_next(input)
}

fn parse_raw(text: &str) -> Result<Raw<'_>, CodecError> {
    let mut input = text;
    match raw.parse_next(&mut input) {
        Ok(value) if input.is_empty() => Ok(value),
        _ => Err(scalar::malformed(text)),
    }
}

/// Write `value` as L5K text.
pub(super) fn write(shape: &Shape, value: &Value) -> Result<String, CodecError> {
    let mut out = String::new();
    write_value(shape, value, "", &mut out)?;
    Ok(out)
}

fn write_value(shape: &Shape, value: &Value, path: &str, out: &mut String) -> Result<(), CodecError> {
    match shape {
        Shape::Scalar { kind, .. } => out.push_str(&scalar::compact_text(*kind, value, path)?),
        Shape::Text { capacity, .. } => {
            let bytes = text_bytes(value, *capacity, path)?;
            let _ = write!(
                out,
                "[{},'{}{}']",
                bytes.len(),
                escape_bytes(&bytes),
                "$00".repeat(capacity - bytes.len())
            );
        }
        Shape::Structure { type_name, fields } => {
            check_members(fields, value, type_name, path)?;
            out.push('[');
            let mut first = true;
            for field in fields {
                let Slot::Value(slot) = &field.slot else {
                    continue;
                };
                if !first {
                    out.push(',');
                }
                first = false;

                let member = member_path(path, &field.name);
                match packed_word(fields, field, slot, value, &member)? {
                    Some(word) => out.push_str(&word.to_string()),
                    None => write_value(slot, &field_value(field, value), &member, out)?,
                }
            }
            out.push(']');
        }
        Shape::Array { element, dims } => {
            let items = array_items(value, dims.element_count(), shape, path)?;
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(element, item, &format!("{path}[{i}]"), out)?;
            }
            out.push(']');
        }
    }
    Ok(())
}

/// Read L5K text against `shape`.
pub(super) fn read(shape: &Shape, text: &str) -> Result<Value, CodecError> {
    let raw = parse_raw(text)?;
    read_raw(shape, &raw, "")
}

fn read_raw(shape: &Shape, raw: &Raw<'_>, path: &str) -> Result<Value, CodecError> {
    match (shape, raw) {
        (Shape::Scalar { kind, .. }, Raw::Atom(text)) => scalar::parse(*kind, text),
        (Shape::Text { capacity, .. }, Raw::List(items)) => {
            let [Raw::Atom(len), Raw::Quoted(body)] = items.as_slice() else {
                return Err(shape_mismatch(path, shape, raw));
            };
            let len: usize = len.parse().map_err(|_| scalar::malformed(len))?;
            let bytes = unescape_bytes(body).ok_or_else(|| scalar::malformed(body))?;
            check_text_length(shape, *capacity, len, bytes.len())?;
            Ok(Value::Text(bytes[..len].iter().map(|&b| char::from(b)).collect()))
        }
        (Shape::Structure { fields, .. }, Raw::List(items)) => {
            let slots: Vec<(&Field, &Shape)> = fields
                .iter()
                .filter_map(|f| match &f.slot {
                    Slot::Value(shape) => Some((f, shape)),
                    Slot::Bit { .. } => None,
                })
                .collect();
            if slots.len() != items.len() {
                return Err(CodecError::ShapeMismatch {
                    path: path.to_string(),
                    expected: format!("{} members of {}", slots.len(), shape.type_name()),
                    found: format!("{} values", items.len()),
                });
            }

            let mut words: HashMap<String, i64> = HashMap::new();
            let mut values: HashMap<String, Value> = HashMap::new();
            for ((field, slot), item) in slots.into_iter().zip(items) {
                let value = read_raw(slot, item, &member_path(path, &field.name))?;
                if field.hidden {
                    if let Some(word) = value.as_integer() {
                        words.insert(field.name.to_ascii_lowercase(), word);
                    }
                } else {
                    values.insert(field.name.to_ascii_lowercase(), value);
                }
            }

            let mut members = IndexMap::new();
            for field in fields.iter().filter(|f| !f.hidden) {
                let value = match &field.slot {
                    Slot::Value(_) => values.remove(&field.name.to_ascii_lowercase()),
                    Slot::Bit { target, bit } => words
                        .get(&target.to_ascii_lowercase())
                        .map(|word| Value::Bool((word >> bit) & 1 == 1)),
                };
                members.insert(field.name.clone(), value.unwrap_or_else(|| field.default_value()));
            }
            Ok(Value::Structure(members))
        }
        (Shape::Array { element, dims }, Raw::List(items)) => {
            if items.len() != dims.element_count() {
                return Err(CodecError::ShapeMismatch {
                    path: path.to_string(),
                    expected: format!("{} elements", dims.element_count()),
                    found: format!("{} values", items.len()),
                });
            }
            items
                .iter()
                .enumerate()
                .map(|(i, item)| read_raw(element, item, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        _ => Err(shape_mismatch(path, shape, raw)),
    }
}

fn shape_mismatch(path: &str, shape: &Shape, raw: &Raw<'_>) -> CodecError {
    CodecError::ShapeMismatch {
        path: path.to_string(),
        expected: shape.type_name().to_string(),
        found: raw.describe().to_string(),
    }
}

/// Bytes of a text value. Characters map one to one onto bytes.
/// A string's `LEN` must fit both its capacity and the bytes stored.
pub(super) fn check_text_length(
    shape: &Shape,
    capacity: usize,
    len: usize,
    stored: usize,
) -> Result<(), CodecError> {
    if len > capacity || len > stored {
        return Err(CodecError::OutOfRangeValue {
            data_type: shape.type_name().to_string(),
            value: format!("length {len}"),
        });
    }
    Ok(())
}

pub(super) fn text_bytes(value: &Value, capacity: usize, path: &str) -> Result<Vec<u8>, CodecError> {
    let Value::Text(text) = value else {
        return Err(scalar::mismatch(path, "text", value));
    };
    let bytes: Option<Vec<u8>> = text.chars().map(|c| u8::try_from(u32::from(c)).ok()).collect();
    match bytes {
        Some(bytes) if bytes.len() <= capacity => Ok(bytes),
        _ => Err(CodecError::OutOfRangeValue {
            data_type: format!("a string of {capacity} bytes"),
            value: format!("{text:?}"),
        }),
    }
}

/// Value of a visible member, or its default when `value` leaves it out.
/// Hidden members always take their default.
pub(super) fn field_value(field: &Field, value: &Value) -> Value {
    if field.hidden {
        return field.default_value();
    }
    value
        .member(&field.name)
        .cloned()
        .unwrap_or_else(|| field.default_value())
}

/// The integer a backing member holds, built from the bits bound to it.
/// `None` when no bit member targets `backing`.
pub(super) fn packed_word(
    fields: &[Field],
    backing: &Field,
    slot: &Shape,
    value: &Value,
    path: &str,
) -> Result<Option<i64>, CodecError> {
    let bound: Vec<(&Field, u8)> = fields
        .iter()
        .filter_map(|f| match &f.slot {
            Slot::Bit { target, bit } if target.eq_ignore_ascii_case(&backing.name) => Some((f, *bit)),
            _ => None,
        })
        .collect();
    if bound.is_empty() {
        return Ok(None);
    }
    let Shape::Scalar { kind, .. } = slot else {
        return Err(CodecError::UnsupportedType {
            type_name: slot.type_name().to_string(),
            reason: format!("bits cannot be packed into `{}`", backing.name),
        });
    };

    let mut raw = 0u64;
    for (field, bit) in bound {
        if u32::from(bit) >= kind.bits() {
            return Err(CodecError::UnsupportedType {
                type_name: kind.name().to_string(),
                reason: format!("bit {bit} of `{}` is out of range", backing.name),
            });
        }
        let member = member_path(path, &field.name);
        if scalar::check_bool(&field_value(field, value), &member)? {
            raw |= 1 << bit;
        }
    }
    scalar::from_bits(raw, *kind)
        .map(Some)
        .ok_or_else(|| scalar::out_of_range(*kind, &raw.to_string()))
}

/// Structure members of `value`. Unknown member names are rejected.
pub(super) fn check_members(
    fields: &[Field],
    value: &Value,
    type_name: &str,
    path: &str,
) -> Result<(), CodecError> {
    let Value::Structure(members) = value else {
        return Err(scalar::mismatch(path, type_name, value));
    };
    for name in members.keys() {
        let known = fields
            .iter()
            .any(|f| !f.hidden && f.name.eq_ignore_ascii_case(name));
        if !known {
            return Err(CodecError::ShapeMismatch {
                path: member_path(path, name),
                expected: format!("a member of {type_name}"),
                found: format!("`{name}`"),
            });
        }
    }
    Ok(())
}

/// Elements of an array value, checked against the declared count.
pub(super) fn array_items<'v>(
    value: &'v Value,
    count: usize,
    shape: &Shape,
    path: &str,
) -> Result<&'v [Value], CodecError> {
    match value {
        Value::Array(items) if items.len() == count => Ok(items),
        Value::Array(items) => Err(CodecError::ShapeMismatch {
            path: path.to_string(),
            expected: format!("{count} elements of {}", shape.type_name()),
            found: format!("{} elements", items.len()),
        }),
        other => Err(scalar::mismatch(path, "array", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use l5x_core::{Dimensions, Member, SchemaTable, TypeDefinition};

    use crate::codec::shape::TypeLookup;

    struct Types(Vec<TypeDefinition>);

    impl TypeLookup for Types {
        fn lookup_type(&self, name: &str) -> Option<TypeDefinition> {
            SchemaTable::standard().lookup_type(name).or_else(|| {
                self.0
                    .iter()
                    .find(|t| t.name().eq_ignore_ascii_case(name))
                    .cloned()
            })
        }
    }

    fn motor() -> Types {
        Types(vec![TypeDefinition::user(
            "Motor",
            vec![
                Member::field("Enable", "BOOL", 0),
                Member::field("Active", "BOOL", 0),
                Member::field("Speed", "REAL", 0),
                Member::field("Name", "STRING", 0),
            ],
        )])
    }

    #[test]
    fn test_raw_lists() {
        assert_eq!(
            parse_raw(" [1, 'a$'b' ,[ ] ] ").unwrap(),
            Raw::List(vec![
                Raw::Atom("1"),
                Raw::Quoted("a$'b"),
                Raw::List(vec![])
            ])
        );
        for text in ["[1,2", "1 2", "'open", "[1]]", ""] {
            assert!(parse_raw(text).is_err(), "`{text}` should be rejected");
        }
    }

    #[test]
    fn test_bits_share_one_backing_slot() {
        let types = motor();
        let shape = Shape::resolve(&types, "Motor", &Dimensions::scalar(), None).unwrap();
        let value = Value::structure([
            ("Enable", Value::Bool(true)),
            ("Active", Value::Bool(true)),
            ("Speed", Value::Real(0.0)),
            ("Name", Value::Text("ab".into())),
        ]);
        let text = write(&shape, &value).unwrap();
        let padding = "$00".repeat(80);
        assert_eq!(text, format!("[3,0.00000000e+000,[2,'ab{padding}']]"));
        assert_eq!(read(&shape, &text).unwrap(), value);

        let only_active = read(&shape, &format!("[2,0.0,[0,'{padding}$00$00']]")).unwrap();
        assert_eq!(only_active.member("Enable"), Some(&Value::Bool(false)));
        assert_eq!(only_active.member("Active"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_high_bit_wraps_negative() {
        let schema = SchemaTable::standard();
        let shape = Shape::resolve(&schema, "TIMER", &Dimensions::scalar(), None).unwrap();
        let value = Value::structure([
            ("PRE", Value::Integer(100)),
            ("ACC", Value::Integer(0)),
            ("EN", Value::Bool(true)),
            ("TT", Value::Bool(false)),
            ("DN", Value::Bool(false)),
        ]);
        let text = write(&shape, &value).unwrap();
        assert_eq!(text, "[-2147483648,100,0]");
        assert_eq!(read(&shape, &text).unwrap(), value);
    }

    #[test]
    fn test_length_and_range_errors() {
        let schema = SchemaTable::standard();
        let shape = Shape::resolve(&schema, "SINT", &Dimensions::new([2]), None).unwrap();
        assert!(matches!(
            read(&shape, "[1,2,3]"),
            Err(CodecError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            write(&shape, &Value::Array(vec![1.into(), 200.into()])),
            Err(CodecError::OutOfRangeValue { .. })
        ));

        let text = Shape::resolve(&schema, "STRING", &Dimensions::scalar(), None).unwrap();
        let long = Value::Text("x".repeat(83));
        assert!(matches!(
            write(&text, &long),
            Err(CodecError::OutOfRangeValue { .. })
        ));
    }

    #[test]
    fn test_unknown_member_is_rejected() {
        let schema = SchemaTable::standard();
        let shape = Shape::resolve(&schema, "COUNTER", &Dimensions::scalar(), None).unwrap();
        let value = Value::structure([("PRESET", Value::Integer(1))]);
        assert!(matches!(
            write(&shape, &value),
            Err(CodecError::ShapeMismatch { path, .. }) if path == "PRESET"
        ));
    }
}
