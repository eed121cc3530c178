//! Resolved value layouts.

use l5x_core::{
    BaseKind, Dimensions, Radix, SchemaTable, TypeDefinition, Value,
    schema::STRING_CAPACITY,
    types::{Family, MemberKind},
};

use super::CodecError;
use crate::document::Document;

/// Source of type definitions for shape resolution.
pub trait TypeLookup {
    /// Definition of a structured type, ignoring case.
    fn lookup_type(&self, name: &str) -> Option<TypeDefinition>;
}

impl TypeLookup for SchemaTable {
    fn lookup_type(&self, name: &str) -> Option<TypeDefinition> {
        self.builtin_type(name).cloned()
    }
}

impl TypeLookup for Document {
    fn lookup_type(&self, name: &str) -> Option<TypeDefinition> {
        self.type_definition(name)
    }
}

/// The layout of a value, fully resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Scalar {
        kind: BaseKind,
        radix: Radix,
    },
    /// A string-family structure, encoded as text.
    Text {
        type_name: String,
        capacity: usize,
    },
    Structure {
        type_name: String,
        fields: Vec<Field>,
    },
    Array {
        element: Box<Shape>,
        dims: Dimensions,
    },
}

/// One member of a structure shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub slot: Slot,
    pub hidden: bool,
    pub default: Option<Value>,
}

/// Where a member's value lives.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Value(Shape),
    /// Bit `bit` of the sibling member `target`.
    Bit { target: String, bit: u8 },
}

impl Shape {
    /// Resolve the layout of a tag of `type_name` with dimensions `dims`.
    ///
    /// `radix` applies to scalar and scalar-array tags and is ignored when it
    /// does not suit the type.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnsupportedType`] for unknown types and for
    /// types that contain themselves.
    pub fn resolve(
        lookup: &dyn TypeLookup,
        type_name: &str,
        dims: &Dimensions,
        radix: Option<Radix>,
    ) -> Result<Self, CodecError> {
        let element = resolve_named(lookup, type_name, radix, &mut Vec::new())?;
        if dims.is_scalar() {
            Ok(element)
        } else {
            Ok(Shape::Array {
                element: Box::new(element),
                dims: dims.clone(),
            })
        }
    }

    /// Name written in `DataType` attributes.
    pub fn type_name(&self) -> &str {
        match self {
            Shape::Scalar { kind, .. } => kind.name(),
            Shape::Text { type_name, .. } | Shape::Structure { type_name, .. } => type_name,
            Shape::Array { element, .. } => element.type_name(),
        }
    }

    /// Radix of a scalar, or of the elements of a scalar array.
    pub fn radix(&self) -> Option<Radix> {
        match self {
            Shape::Scalar { radix, .. } => Some(*radix),
            Shape::Array { element, .. } => element.radix(),
            Shape::Text { .. } | Shape::Structure { .. } => None,
        }
    }

    /// The value a fresh tag of this shape holds.
    pub fn zero_value(&self) -> Value {
        match self {
            Shape::Scalar { kind, .. } => zero_scalar(*kind),
            Shape::Text { .. } => Value::Text(String::new()),
            Shape::Structure { fields, .. } => Value::Structure(
                fields
                    .iter()
                    .filter(|f| !f.hidden)
                    .map(|f| (f.name.clone(), f.default_value()))
                    .collect(),
            ),
            Shape::Array { element, dims } => {
                Value::Array(vec![element.zero_value(); dims.element_count()])
            }
        }
    }
}

impl Field {
    /// Declared default, or the zero value of the slot.
    pub fn default_value(&self) -> Value {
        if let Some(default) = &self.default {
            return default.clone();
        }
        match &self.slot {
            Slot::Value(shape) => shape.zero_value(),
            Slot::Bit { .. } => Value::Bool(false),
        }
    }

    pub fn is_bit(&self) -> bool {
        matches!(self.slot, Slot::Bit { .. })
    }
}

pub(super) fn zero_scalar(kind: BaseKind) -> Value {
    match kind {
        BaseKind::Bool => Value::Bool(false),
        kind if kind.is_real() => Value::Real(0.0),
        _ => Value::Integer(0),
    }
}

fn resolve_named(
    lookup: &dyn TypeLookup,
    name: &str,
    radix: Option<Radix>,
    visiting: &mut Vec<String>,
) -> Result<Shape, CodecError> {
    if let Some(kind) = BaseKind::from_name(name) {
        let radix = match kind {
            BaseKind::Bool => Radix::Decimal,
            _ => radix
                .filter(|r| r.applies_to(kind))
                .unwrap_or(kind.default_radix()),
        };
        return Ok(Shape::Scalar { kind, radix });
    }

    if visiting.iter().any(|v| v.eq_ignore_ascii_case(name)) {
        return Err(CodecError::UnsupportedType {
            type_name: name.to_string(),
            reason: "the type contains itself".to_string(),
        });
    }
    let definition = lookup
        .lookup_type(name)
        .ok_or_else(|| CodecError::UnsupportedType {
            type_name: name.to_string(),
            reason: "no definition found".to_string(),
        })?;

    if definition.family() == Family::String {
        let capacity = definition
            .member("DATA")
            .map(|m| m.dimension())
            .filter(|&d| d > 0)
            .unwrap_or(STRING_CAPACITY);
        return Ok(Shape::Text {
            type_name: definition.name().to_string(),
            capacity,
        });
    }

    visiting.push(definition.name().to_string());
    let mut fields = Vec::with_capacity(definition.members().len());
    for member in definition.members() {
        let slot = match member.kind() {
            MemberKind::Bit(binding) => Slot::Bit {
                target: binding.target.clone(),
                bit: binding.bit,
            },
            MemberKind::Field {
                data_type,
                dimension,
            } => {
                let shape = resolve_named(lookup, data_type, member.radix(), visiting)?;
                if *dimension > 0 {
                    Slot::Value(Shape::Array {
                        element: Box::new(shape),
                        dims: Dimensions::new([*dimension]),
                    })
                } else {
                    Slot::Value(shape)
                }
            }
        };
        fields.push(Field {
            name: member.name().to_string(),
            slot,
            hidden: member.is_hidden(),
            default: member.default_value().cloned(),
        });
    }
    visiting.pop();

    Ok(Shape::Structure {
        type_name: definition.name().to_string(),
        fields,
    })
}
