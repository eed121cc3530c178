//! Data type model.
//!
//! One [`TypeDefinition`] model covers user-defined structures, the
//! built-in structures (TIMER, COUNTER, CONTROL, STRING) and Add-On
//! Instruction instance layouts. Boolean members that live inside a shared
//! integer are [`MemberKind::Bit`] members pointing at a hidden backing
//! member.

use std::fmt;

use serde::Deserialize;

use crate::value::Value;

/// Elementary scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseKind {
    Bool,
    Sint,
    Usint,
    Int,
    Uint,
    Dint,
    Udint,
    Lint,
    Real,
    Lreal,
}

impl BaseKind {
    pub const ALL: [BaseKind; 10] = [
        BaseKind::Bool,
        BaseKind::Sint,
        BaseKind::Usint,
        BaseKind::Int,
        BaseKind::Uint,
        BaseKind::Dint,
        BaseKind::Udint,
        BaseKind::Lint,
        BaseKind::Real,
        BaseKind::Lreal,
    ];

    /// Resolve a type name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    pub fn name(self) -> &'static str {
        match self {
            BaseKind::Bool => "BOOL",
            BaseKind::Sint => "SINT",
            BaseKind::Usint => "USINT",
            BaseKind::Int => "INT",
            BaseKind::Uint => "UINT",
            BaseKind::Dint => "DINT",
            BaseKind::Udint => "UDINT",
            BaseKind::Lint => "LINT",
            BaseKind::Real => "REAL",
            BaseKind::Lreal => "LREAL",
        }
    }

    /// Storage width in bits.
    pub fn bits(self) -> u32 {
        match self {
            BaseKind::Bool => 1,
            BaseKind::Sint | BaseKind::Usint => 8,
            BaseKind::Int | BaseKind::Uint => 16,
            BaseKind::Dint | BaseKind::Udint | BaseKind::Real => 32,
            BaseKind::Lint | BaseKind::Lreal => 64,
        }
    }

    pub fn is_real(self) -> bool {
        matches!(self, BaseKind::Real | BaseKind::Lreal)
    }

    pub fn is_integer(self) -> bool {
        !self.is_real() && self != BaseKind::Bool
    }

    pub fn is_unsigned(self) -> bool {
        matches!(self, BaseKind::Usint | BaseKind::Uint | BaseKind::Udint)
    }

    /// Inclusive value range of an integer kind.
    pub fn range(self) -> (i64, i64) {
        match self {
            BaseKind::Bool => (0, 1),
            BaseKind::Sint => (i8::MIN.into(), i8::MAX.into()),
            BaseKind::Usint => (0, u8::MAX.into()),
            BaseKind::Int => (i16::MIN.into(), i16::MAX.into()),
            BaseKind::Uint => (0, u16::MAX.into()),
            BaseKind::Dint => (i32::MIN.into(), i32::MAX.into()),
            BaseKind::Udint => (0, u32::MAX.into()),
            BaseKind::Lint | BaseKind::Real | BaseKind::Lreal => (i64::MIN, i64::MAX),
        }
    }

    /// Radix used when none is declared.
    pub fn default_radix(self) -> Radix {
        if self.is_real() {
            Radix::Float
        } else {
            Radix::Decimal
        }
    }
}

impl fmt::Display for BaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Display radix of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Radix {
    Decimal,
    Float,
    Binary,
    Octal,
    Hex,
    Ascii,
    Exponential,
    NullType,
}

impl Radix {
    pub fn from_name(name: &str) -> Option<Self> {
        let radix = match name {
            "Decimal" => Radix::Decimal,
            "Float" => Radix::Float,
            "Binary" => Radix::Binary,
            "Octal" => Radix::Octal,
            "Hex" => Radix::Hex,
            "ASCII" => Radix::Ascii,
            "Exponential" => Radix::Exponential,
            "NullType" => Radix::NullType,
            _ => return None,
        };
        Some(radix)
    }

    pub fn name(self) -> &'static str {
        match self {
            Radix::Decimal => "Decimal",
            Radix::Float => "Float",
            Radix::Binary => "Binary",
            Radix::Octal => "Octal",
            Radix::Hex => "Hex",
            Radix::Ascii => "ASCII",
            Radix::Exponential => "Exponential",
            Radix::NullType => "NullType",
        }
    }

    /// Whether the radix can display values of `kind`.
    pub fn applies_to(self, kind: BaseKind) -> bool {
        match self {
            Radix::Float | Radix::Exponential => kind.is_real(),
            Radix::Decimal | Radix::Binary | Radix::Octal | Radix::Hex | Radix::Ascii => {
                !kind.is_real()
            }
            Radix::NullType => false,
        }
    }
}

impl fmt::Display for Radix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tag external access level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ExternalAccess {
    #[default]
    #[serde(rename = "Read/Write")]
    ReadWrite,
    #[serde(rename = "Read Only")]
    ReadOnly,
    #[serde(rename = "None")]
    None,
}

impl ExternalAccess {
    pub fn as_str(self) -> &'static str {
        match self {
            ExternalAccess::ReadWrite => "Read/Write",
            ExternalAccess::ReadOnly => "Read Only",
            ExternalAccess::None => "None",
        }
    }
}

/// AOI parameter direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
    Input,
    Output,
    InOut,
}

impl Usage {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Input" => Some(Usage::Input),
            "Output" => Some(Usage::Output),
            "InOut" => Some(Usage::InOut),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Usage::Input => "Input",
            Usage::Output => "Output",
            Usage::InOut => "InOut",
        }
    }
}

/// Array dimensions, outermost first. Empty for scalars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Dimensions(Vec<usize>);

impl Dimensions {
    pub fn scalar() -> Self {
        Self(Vec::new())
    }

    pub fn new(dims: impl Into<Vec<usize>>) -> Self {
        let dims: Vec<usize> = dims.into();
        Self(dims.into_iter().filter(|d| *d > 0).collect())
    }

    /// Parse a dimension attribute.
    ///
    /// Tags separate dimensions with spaces (`"2 3"`), array data with
    /// commas (`"2,3"`). Both forms are accepted. Blank or `0` means scalar.
    pub fn parse(text: &str) -> Option<Self> {
        let mut dims = Vec::new();
        for part in text
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
        {
            dims.push(part.parse::<usize>().ok()?);
        }
        Some(Self::new(dims))
    }

    pub fn is_scalar(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Total element count.
    pub fn element_count(&self) -> usize {
        self.0.iter().product()
    }

    /// Row-major coordinates of a flat element index.
    pub fn coordinates(&self, mut flat: usize) -> Vec<usize> {
        let mut coords = vec![0; self.0.len()];
        for (slot, dim) in coords.iter_mut().zip(&self.0).rev() {
            *slot = flat % dim;
            flat /= dim;
        }
        coords
    }

    /// Space-separated form used by the `Dimensions` attribute of tags.
    pub fn to_tag_attribute(&self) -> String {
        self.join(" ")
    }

    /// Comma-separated form used by array data and element indices.
    pub fn to_list_attribute(&self) -> String {
        self.join(",")
    }

    fn join(&self, separator: &str) -> String {
        self.0
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join(separator)
    }
}

/// Where a type definition comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeOrigin {
    Builtin,
    User,
    AddOnInstruction,
}

/// Type family. String-family structures encode as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Family {
    #[default]
    None,
    String,
}

/// Location of a packed boolean inside its backing member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitBinding {
    pub target: String,
    pub bit: u8,
}

/// What a member stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberKind {
    /// A value of the named type. `dimension` is 0 for scalars.
    Field { data_type: String, dimension: usize },
    /// A boolean packed into another member.
    Bit(BitBinding),
}

/// One member of a [`TypeDefinition`].
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    name: String,
    kind: MemberKind,
    radix: Option<Radix>,
    hidden: bool,
    default: Option<Value>,
    description: Option<String>,
}

impl Member {
    /// A scalar or array field.
    pub fn field(name: impl Into<String>, data_type: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Field {
                data_type: data_type.into(),
                dimension,
            },
            radix: None,
            hidden: false,
            default: None,
            description: None,
        }
    }

    /// A boolean stored in bit `bit` of `target`.
    pub fn bit(name: impl Into<String>, target: impl Into<String>, bit: u8) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Bit(BitBinding {
                target: target.into(),
                bit,
            }),
            radix: None,
            hidden: false,
            default: None,
            description: None,
        }
    }

    pub fn with_radix(mut self, radix: Radix) -> Self {
        self.radix = Some(radix);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &MemberKind {
        &self.kind
    }

    /// Declared type name. Bit members report `BIT`.
    pub fn data_type(&self) -> &str {
        match &self.kind {
            MemberKind::Field { data_type, .. } => data_type,
            MemberKind::Bit(_) => "BIT",
        }
    }

    pub fn dimension(&self) -> usize {
        match &self.kind {
            MemberKind::Field { dimension, .. } => *dimension,
            MemberKind::Bit(_) => 0,
        }
    }

    pub fn bit_binding(&self) -> Option<&BitBinding> {
        match &self.kind {
            MemberKind::Bit(binding) => Some(binding),
            MemberKind::Field { .. } => None,
        }
    }

    pub fn radix(&self) -> Option<Radix> {
        self.radix
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn is_packable_bool(&self) -> bool {
        matches!(&self.kind, MemberKind::Field { data_type, dimension: 0 }
            if data_type.eq_ignore_ascii_case("BOOL"))
    }
}

/// One parameter or local tag of an Add-On Instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct AoiMember {
    pub name: String,
    pub data_type: String,
    pub dimension: usize,
    /// `None` for local tags.
    pub usage: Option<Usage>,
    pub radix: Option<Radix>,
    pub default: Option<Value>,
    pub description: Option<String>,
}

/// A named structured type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDefinition {
    name: String,
    origin: TypeOrigin,
    family: Family,
    description: Option<String>,
    members: Vec<Member>,
}

/// Prefix of the hidden members that carry packed booleans.
pub const BACKING_PREFIX: &str = "ZZZZZZZZZZ";

impl TypeDefinition {
    /// A definition with members taken as given. No packing is applied.
    pub fn new(name: impl Into<String>, origin: TypeOrigin, members: Vec<Member>) -> Self {
        Self {
            name: name.into(),
            origin,
            family: Family::None,
            description: None,
            members,
        }
    }

    /// A user-defined structure with scalar BOOL fields packed into hidden
    /// SINT backing members.
    ///
    /// Each run of consecutive BOOL fields shares one SINT (up to 8 bits).
    /// The backing member is named after the type and its own position.
    pub fn user(name: impl Into<String>, fields: Vec<Member>) -> Self {
        let name = name.into();
        let mut members = Vec::with_capacity(fields.len() + 1);
        let mut current: Option<(String, u8)> = None;

        for field in fields {
            if !field.is_packable_bool() {
                current = None;
                members.push(field);
                continue;
            }
            let (target, bit) = match current.take() {
                Some((target, bit)) if bit < 8 => (target, bit),
                _ => {
                    let target = backing_name(&name, members.len());
                    members.push(Member::field(target.clone(), "SINT", 0).hidden());
                    (target, 0)
                }
            };
            members.push(Member {
                kind: MemberKind::Bit(BitBinding {
                    target: target.clone(),
                    bit,
                }),
                ..field
            });
            current = Some((target, bit + 1));
        }

        Self::new(name, TypeOrigin::User, members)
    }

    /// The instance layout of an Add-On Instruction.
    ///
    /// Slot 0 is a hidden DINT carrying scalar BOOL parameters and locals,
    /// one bit each in declaration order. Bits beyond 32 spill into further
    /// hidden DINTs appended after every other member. InOut parameters are
    /// references and take no storage. Local tags are hidden. `EnableIn`
    /// defaults to true.
    pub fn add_on_instruction(name: impl Into<String>, declared: Vec<AoiMember>) -> Self {
        let name = name.into();
        let mut members = vec![Member::field(backing_name(&name, 0), "DINT", 0).hidden()];
        let mut overflow = Vec::new();
        let mut next_bit = 0usize;

        for decl in declared {
            if decl.usage == Some(Usage::InOut) {
                continue;
            }
            let is_local = decl.usage.is_none();
            let default = match decl.default {
                None if decl.name.eq_ignore_ascii_case("EnableIn") => Some(Value::Bool(true)),
                other => other,
            };

            let mut member = if decl.dimension == 0 && decl.data_type.eq_ignore_ascii_case("BOOL")
            {
                let word = next_bit / 32;
                let bit = (next_bit % 32) as u8;
                next_bit += 1;
                let target = backing_name(&name, word);
                if word > 0 && bit == 0 {
                    overflow.push(Member::field(target.clone(), "DINT", 0).hidden());
                }
                Member::bit(decl.name, target, bit)
            } else {
                Member::field(decl.name, decl.data_type, decl.dimension)
            };

            member.radix = decl.radix;
            member.default = default;
            member.description = decl.description;
            member.hidden = is_local;
            members.push(member);
        }

        members.extend(overflow);
        Self::new(name, TypeOrigin::AddOnInstruction, members)
    }

    pub fn with_family(mut self, family: Family) -> Self {
        self.family = family;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin(&self) -> TypeOrigin {
        self.origin
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Members a user sees: everything that is not hidden.
    pub fn visible_members(&self) -> impl Iterator<Item = &Member> {
        self.members.iter().filter(|m| !m.is_hidden())
    }

    /// Member by name, ignoring case.
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
    }

    /// Names of the non-elementary types this definition refers to,
    /// deduplicated, in member order.
    pub fn dependencies(&self) -> Vec<&str> {
        let mut deps: Vec<&str> = Vec::new();
        for member in &self.members {
            if let MemberKind::Field { data_type, .. } = &member.kind {
                if BaseKind::from_name(data_type).is_none()
                    && !deps.iter().any(|d| d.eq_ignore_ascii_case(data_type))
                {
                    deps.push(data_type);
                }
            }
        }
        deps
    }

    /// Members grouped as a user declared them: bit members report BOOL and
    /// backing members are dropped. Used to compare definitions.
    pub fn declared_signature(&self) -> Vec<(String, String, usize)> {
        self.members
            .iter()
            .filter(|m| !m.name.starts_with(BACKING_PREFIX))
            .map(|m| {
                let data_type = match &m.kind {
                    MemberKind::Field { data_type, .. } => data_type.to_ascii_uppercase(),
                    MemberKind::Bit(_) => "BOOL".to_string(),
                };
                (m.name.to_ascii_uppercase(), data_type, m.dimension())
            })
            .collect()
    }
}

/// Name of the hidden backing member at `index` of type `type_name`.
pub fn backing_name(type_name: &str, index: usize) -> String {
    let mut name = format!("{BACKING_PREFIX}{type_name}{index}");
    if name.len() > crate::naming::MAX_NAME_LENGTH {
        let suffix = index.to_string();
        let keep = crate::naming::MAX_NAME_LENGTH - BACKING_PREFIX.len() - suffix.len();
        let stem: String = type_name.chars().take(keep).collect();
        name = format!("{BACKING_PREFIX}{stem}{suffix}");
    }
    name
}
