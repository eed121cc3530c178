//! The Decorated form: one element per visible member.

use indexmap::IndexMap;

use l5x_core::{BaseKind, Dimensions, ElementNode, Radix, Value};

use super::{
    CodecError,
    compact::{array_items, check_members, check_text_length, field_value, text_bytes},
    member_path,
    scalar::{self, escape_bytes, unescape_bytes},
    shape::{Field, Shape, Slot},
};

/// Write `value` as a `DataValue`, `Structure` or `Array` element.
pub(super) fn write(shape: &Shape, value: &Value) -> Result<ElementNode, CodecError> {
    match shape {
        Shape::Scalar { kind, radix } => Ok(ElementNode::new("DataValue")
            .with_attribute("DataType", kind.name())
            .with_attribute("Radix", radix.name())
            .with_attribute("Value", scalar::radix_text(*kind, *radix, value, "")?)),
        Shape::Text { .. } | Shape::Structure { .. } => {
            let children = structure_children(shape, value, "")?;
            Ok(ElementNode::new("Structure")
                .with_attribute("DataType", shape.type_name())
                .with_children(children))
        }
        Shape::Array { element, dims } => {
            let mut array = ElementNode::new("Array")
                .with_attribute("DataType", shape.type_name())
                .with_attribute("Dimensions", dims.to_list_attribute());
            if let Some(radix) = element_radix(element) {
                array = array.with_attribute("Radix", radix.name());
            }
            Ok(array.with_children(elements(element, dims, value, "")?))
        }
    }
}

/// Radix attribute of an array of `element`: only non-BOOL scalars carry one.
fn element_radix(element: &Shape) -> Option<Radix> {
    match element {
        Shape::Scalar { kind, radix } if *kind != BaseKind::Bool => Some(*radix),
        _ => None,
    }
}

fn index_text(dims: &Dimensions, flat: usize) -> String {
    let coords: Vec<String> = dims.coordinates(flat).iter().map(usize::to_string).collect();
    format!("[{}]", coords.join(","))
}

fn elements(
    element: &Shape,
    dims: &Dimensions,
    value: &Value,
    path: &str,
) -> Result<Vec<ElementNode>, CodecError> {
    let items = array_items(value, dims.element_count(), element, path)?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let item_path = format!("{path}[{i}]");
            let node = ElementNode::new("Element").with_attribute("Index", index_text(dims, i));
            match element {
                Shape::Scalar { kind, radix } => Ok(node.with_attribute(
                    "Value",
                    scalar::radix_text(*kind, *radix, item, &item_path)?,
                )),
                _ => {
                    let inner = ElementNode::new("Structure")
                        .with_attribute("DataType", element.type_name())
                        .with_children(structure_children(element, item, &item_path)?);
                    Ok(node.with_child(inner))
                }
            }
        })
        .collect()
}

/// Member elements of a structure or string value.
fn structure_children(shape: &Shape, value: &Value, path: &str) -> Result<Vec<ElementNode>, CodecError> {
    match shape {
        Shape::Text { type_name, capacity } => {
            let bytes = text_bytes(value, *capacity, path)?;
            Ok(vec![
                ElementNode::new("DataValueMember")
                    .with_attribute("Name", "LEN")
                    .with_attribute("DataType", "DINT")
                    .with_attribute("Radix", Radix::Decimal.name())
                    .with_attribute("Value", bytes.len().to_string()),
                ElementNode::new("DataValueMember")
                    .with_attribute("Name", "DATA")
                    .with_attribute("DataType", type_name.as_str())
                    .with_attribute("Radix", Radix::Ascii.name())
                    .with_text(format!("'{}'", escape_bytes(&bytes))),
            ])
        }
        Shape::Structure { type_name, fields } => {
            check_members(fields, value, type_name, path)?;
            fields
                .iter()
                .filter(|f| !f.hidden)
                .map(|field| member_element(field, &field_value(field, value), &member_path(path, &field.name)))
                .collect()
        }
        other => Err(CodecError::ShapeMismatch {
            path: path.to_string(),
            expected: "a structure".to_string(),
            found: other.type_name().to_string(),
        }),
    }
}

fn member_element(field: &Field, value: &Value, path: &str) -> Result<ElementNode, CodecError> {
    let shape = match &field.slot {
        Slot::Bit { .. } => {
            return Ok(bool_member(&field.name, scalar::check_bool(value, path)?));
        }
        Slot::Value(shape) => shape,
    };
    match shape {
        Shape::Scalar {
            kind: BaseKind::Bool,
            ..
        } => Ok(bool_member(&field.name, scalar::check_bool(value, path)?)),
        Shape::Scalar { kind, radix } => Ok(ElementNode::new("DataValueMember")
            .with_attribute("Name", field.name.as_str())
            .with_attribute("DataType", kind.name())
            .with_attribute("Radix", radix.name())
            .with_attribute("Value", scalar::radix_text(*kind, *radix, value, path)?)),
        Shape::Text { .. } | Shape::Structure { .. } => Ok(ElementNode::new("StructureMember")
            .with_attribute("Name", field.name.as_str())
            .with_attribute("DataType", shape.type_name())
            .with_children(structure_children(shape, value, path)?)),
        Shape::Array { element, dims } => {
            let mut member = ElementNode::new("ArrayMember")
                .with_attribute("Name", field.name.as_str())
                .with_attribute("DataType", shape.type_name())
                .with_attribute("Dimensions", dims.to_list_attribute());
            if let Some(radix) = element_radix(element) {
                member = member.with_attribute("Radix", radix.name());
            }
            Ok(member.with_children(elements(element, dims, value, path)?))
        }
    }
}

fn bool_member(name: &str, value: bool) -> ElementNode {
    ElementNode::new("DataValueMember")
        .with_attribute("Name", name)
        .with_attribute("DataType", "BOOL")
        .with_attribute("Value", if value { "1" } else { "0" })
}

/// Read a Decorated element against `shape`. A `Data` wrapper is looked
/// through.
pub(super) fn read(shape: &Shape, element: &ElementNode) -> Result<Value, CodecError> {
    let element = match element.label() {
        "Data" => element.children().first().ok_or_else(|| CodecError::ShapeMismatch {
            path: String::new(),
            expected: shape.type_name().to_string(),
            found: "an empty Data element".to_string(),
        })?,
        _ => element,
    };
    match shape {
        Shape::Scalar { kind, .. } => {
            expect_label(element, &["DataValue"], "")?;
            read_scalar(*kind, element, "")
        }
        Shape::Text { .. } | Shape::Structure { .. } => {
            expect_label(element, &["Structure"], "")?;
            read_structure(shape, element, "")
        }
        Shape::Array { element: item, dims } => {
            expect_label(element, &["Array"], "")?;
            read_elements(item, dims, element, "")
        }
    }
}

fn expect_label(element: &ElementNode, labels: &[&str], path: &str) -> Result<(), CodecError> {
    if labels.contains(&element.label()) {
        Ok(())
    } else {
        Err(CodecError::ShapeMismatch {
            path: path.to_string(),
            expected: labels.join(" or "),
            found: element.label().to_string(),
        })
    }
}

fn read_scalar(kind: BaseKind, element: &ElementNode, path: &str) -> Result<Value, CodecError> {
    let text = element
        .attribute("Value")
        .ok_or_else(|| CodecError::ShapeMismatch {
            path: path.to_string(),
            expected: format!("a {kind} value"),
            found: format!("{} without Value", element.label()),
        })?;
    scalar::parse(kind, text)
}

/// Members of `container`, which is a `Structure` or `StructureMember`.
fn read_structure(shape: &Shape, container: &ElementNode, path: &str) -> Result<Value, CodecError> {
    match shape {
        Shape::Text { capacity, .. } => {
            let text = container
                .named_child("DataValueMember", "DATA")
                .and_then(ElementNode::text)
                .unwrap_or("''")
                .trim();
            let body = text
                .strip_prefix('\'')
                .and_then(|t| t.strip_suffix('\''))
                .ok_or_else(|| scalar::malformed(text))?;
            let mut bytes = unescape_bytes(body).ok_or_else(|| scalar::malformed(text))?;
            let len = match container
                .named_child("DataValueMember", "LEN")
                .and_then(|m| m.attribute("Value"))
            {
                Some(len) => len.trim().parse().map_err(|_| scalar::malformed(len))?,
                None => bytes.len(),
            };
            check_text_length(shape, *capacity, len, bytes.len())?;
            bytes.truncate(len);
            Ok(Value::Text(bytes.into_iter().map(char::from).collect()))
        }
        Shape::Structure { fields, .. } => {
            let mut members = IndexMap::new();
            for field in fields.iter().filter(|f| !f.hidden) {
                let member = member_path(path, &field.name);
                let child = container
                    .children()
                    .iter()
                    .find(|c| c.name().is_some_and(|n| n.eq_ignore_ascii_case(&field.name)));
                let value = match child {
                    None => field.default_value(),
                    Some(child) => read_member(field, child, &member)?,
                };
                members.insert(field.name.clone(), value);
            }
            Ok(Value::Structure(members))
        }
        other => Err(CodecError::ShapeMismatch {
            path: path.to_string(),
            expected: other.type_name().to_string(),
            found: container.label().to_string(),
        }),
    }
}

fn read_member(field: &Field, child: &ElementNode, path: &str) -> Result<Value, CodecError> {
    let shape = match &field.slot {
        Slot::Bit { .. } => {
            expect_label(child, &["DataValueMember"], path)?;
            return read_scalar(BaseKind::Bool, child, path);
        }
        Slot::Value(shape) => shape,
    };
    match shape {
        Shape::Scalar { kind, .. } => {
            expect_label(child, &["DataValueMember"], path)?;
            read_scalar(*kind, child, path)
        }
        Shape::Text { .. } | Shape::Structure { .. } => {
            expect_label(child, &["StructureMember"], path)?;
            read_structure(shape, child, path)
        }
        Shape::Array { element, dims } => {
            expect_label(child, &["ArrayMember"], path)?;
            read_elements(element, dims, child, path)
        }
    }
}

/// Flat position of an `Index` attribute such as `[1,2]`.
fn flat_index(dims: &Dimensions, index: &str) -> Option<usize> {
    let inner = index.trim().strip_prefix('[')?.strip_suffix(']')?;
    let coords: Vec<usize> = inner
        .split(',')
        .map(|p| p.trim().parse().ok())
        .collect::<Option<_>>()?;
    if coords.len() != dims.as_slice().len() {
        return None;
    }
    let mut flat = 0;
    for (coord, dim) in coords.iter().zip(dims.as_slice()) {
        if coord >= dim {
            return None;
        }
        flat = flat * dim + coord;
    }
    Some(flat)
}

fn read_elements(
    element: &Shape,
    dims: &Dimensions,
    container: &ElementNode,
    path: &str,
) -> Result<Value, CodecError> {
    let mut items = vec![None; dims.element_count()];
    for (position, child) in container.children_labeled("Element").enumerate() {
        let flat = match child.attribute("Index") {
            Some(index) => flat_index(dims, index).ok_or_else(|| scalar::malformed(index))?,
            None => position,
        };
        let item_path = format!("{path}[{flat}]");
        let slot = items.get_mut(flat).ok_or_else(|| CodecError::ShapeMismatch {
            path: item_path.clone(),
            expected: format!("{} elements", dims.element_count()),
            found: format!("element {flat}"),
        })?;
        let value = match element {
            Shape::Scalar { kind, .. } => read_scalar(*kind, child, &item_path)?,
            _ => {
                let inner = child.child("Structure").ok_or_else(|| CodecError::ShapeMismatch {
                    path: item_path.clone(),
                    expected: element.type_name().to_string(),
                    found: "an empty Element".to_string(),
                })?;
                read_structure(element, inner, &item_path)?
            }
        };
        *slot = Some(value);
    }
    Ok(Value::Array(
        items
            .into_iter()
            .map(|item| item.unwrap_or_else(|| element.zero_value()))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use l5x_core::SchemaTable;

    #[test]
    fn test_scalar_in_hex() {
        let schema = SchemaTable::standard();
        let shape = Shape::resolve(&schema, "DINT", &Dimensions::scalar(), Some(Radix::Hex)).unwrap();
        let element = write(&shape, &Value::Integer(255)).unwrap();
        assert_eq!(element.attribute("Radix"), Some("Hex"));
        assert_eq!(element.attribute("Value"), Some("16#0000_00ff"));
        assert_eq!(read(&shape, &element).unwrap(), Value::Integer(255));
    }

    #[test]
    fn test_timer_members() {
        let schema = SchemaTable::standard();
        let shape = Shape::resolve(&schema, "TIMER", &Dimensions::scalar(), None).unwrap();
        let element = write(&shape, &shape.zero_value()).unwrap();
        let names: Vec<_> = element.children().iter().filter_map(ElementNode::name).collect();
        assert_eq!(names, ["PRE", "ACC", "EN", "TT", "DN"]);
        let en = element.named_child("DataValueMember", "EN").unwrap();
        assert_eq!(en.attribute("DataType"), Some("BOOL"));
        assert_eq!(en.attribute("Radix"), None);
    }

    #[test]
    fn test_string_members() {
        let schema = SchemaTable::standard();
        let shape = Shape::resolve(&schema, "STRING", &Dimensions::scalar(), None).unwrap();
        let element = write(&shape, &Value::Text("it's".into())).unwrap();
        let data = element.named_child("DataValueMember", "DATA").unwrap();
        assert_eq!(data.text(), Some("'it$'s'"));
        assert_eq!(data.attribute("DataType"), Some("STRING"));
        let len = element.named_child("DataValueMember", "LEN").unwrap();
        assert_eq!(len.attribute("Value"), Some("4"));
        assert_eq!(read(&shape, &element).unwrap(), Value::Text("it's".into()));
    }

    #[test]
    fn test_string_length_past_its_bytes_is_rejected() {
        let schema = SchemaTable::standard();
        let shape = Shape::resolve(&schema, "STRING", &Dimensions::scalar(), None).unwrap();
        let mut element = write(&shape, &Value::Text("ab".into())).unwrap();
        let len = element
            .children_mut()
            .unwrap()
            .iter_mut()
            .find(|c| c.name() == Some("LEN"))
            .unwrap();
        len.set_attribute("Value", "9");

        let expected = CodecError::OutOfRangeValue {
            data_type: "STRING".to_string(),
            value: "length 9".to_string(),
        };
        assert_eq!(read(&shape, &element).unwrap_err(), expected);
        assert_eq!(
            crate::codec::decode_compact(&shape, "[9,'ab']").unwrap_err(),
            expected
        );
    }

    #[test]
    fn test_two_dimensional_indices() {
        let schema = SchemaTable::standard();
        let shape = Shape::resolve(&schema, "INT", &Dimensions::new([2, 3]), None).unwrap();
        let value = Value::Array((0..6).map(Value::from).collect());
        let element = write(&shape, &value).unwrap();
        assert_eq!(element.attribute("Dimensions"), Some("2,3"));
        let indices: Vec<_> = element
            .children()
            .iter()
            .filter_map(|e| e.attribute("Index"))
            .collect();
        assert_eq!(indices, ["[0,0]", "[0,1]", "[0,2]", "[1,0]", "[1,1]", "[1,2]"]);
        assert_eq!(read(&shape, &element).unwrap(), value);
    }

    #[test]
    fn test_missing_elements_read_as_zero() {
        let schema = SchemaTable::standard();
        let shape = Shape::resolve(&schema, "DINT", &Dimensions::new([3]), None).unwrap();
        let element = ElementNode::new("Array")
            .with_attribute("DataType", "DINT")
            .with_attribute("Dimensions", "3")
            .with_child(
                ElementNode::new("Element")
                    .with_attribute("Index", "[1]")
                    .with_attribute("Value", "7"),
            );
        assert_eq!(
            read(&shape, &element).unwrap(),
            Value::Array(vec![0.into(), 7.into(), 0.into()])
        );
    }

    #[test]
    fn test_wrong_element_is_a_shape_mismatch() {
        let schema = SchemaTable::standard();
        let shape = Shape::resolve(&schema, "TIMER", &Dimensions::scalar(), None).unwrap();
        let element = ElementNode::new("DataValue").with_attribute("Value", "0");
        assert!(matches!(
            read(&shape, &element),
            Err(CodecError::ShapeMismatch { .. })
        ));
    }
}
