//! Type definitions stored in the document.
//!
//! `DataType` and `AddOnInstructionDefinition` elements are read into the
//! shared [`TypeDefinition`] model, and new user types are written back as
//! `DataType` elements with their booleans already packed.

use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use l5x_core::{
    BaseKind, ElementNode, Member, Radix, TypeDefinition, Value,
    types::{AoiMember, Family, MemberKind, TypeOrigin, Usage},
};

use super::{Document, NodePath};

/// Attributes that change on every save and are left out of digests.
const VOLATILE_ATTRIBUTES: &[&str] = &["EditedDate", "CreatedDate", "EditedBy", "CreatedBy"];

/// One member of a user type, as a caller declares it.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberDecl {
    pub name: String,
    pub data_type: String,
    pub dimension: usize,
    pub radix: Option<Radix>,
    pub description: Option<String>,
}

impl MemberDecl {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            dimension: 0,
            radix: None,
            description: None,
        }
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn with_radix(mut self, radix: Radix) -> Self {
        self.radix = Some(radix);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A user-defined structure to create.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub name: String,
    pub description: Option<String>,
    pub members: Vec<MemberDecl>,
}

impl TypeDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            members: Vec::new(),
        }
    }

    pub fn with_member(mut self, member: MemberDecl) -> Self {
        self.members.push(member);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The packed definition this declaration produces.
    pub fn to_definition(&self) -> TypeDefinition {
        let fields = self
            .members
            .iter()
            .map(|decl| {
                let mut member = Member::field(&decl.name, &decl.data_type, decl.dimension);
                if let Some(radix) = decl.radix {
                    member = member.with_radix(radix);
                }
                if let Some(description) = &decl.description {
                    member = member.with_description(description);
                }
                member
            })
            .collect();
        let definition = TypeDefinition::user(&self.name, fields);
        match &self.description {
            Some(description) => definition.with_description(description),
            None => definition,
        }
    }
}

impl Document {
    /// Resolve a type name: built-ins first, then user types, then Add-On
    /// Instructions. Names compare case-insensitively.
    pub fn type_definition(&self, name: &str) -> Option<TypeDefinition> {
        if let Some(builtin) = self.schema.builtin_type(name) {
            return Some(builtin.clone());
        }
        let path = self.type_element_path(name)?;
        definition_of(self.node(&path)?)
    }

    /// Path of the `DataType` or `AddOnInstructionDefinition` with this name.
    pub fn type_element_path(&self, name: &str) -> Option<NodePath> {
        self.find_in_controller(&[("DataTypes", None), ("DataType", Some(name))])
            .or_else(|| {
                self.find_in_controller(&[
                    ("AddOnInstructionDefinitions", None),
                    ("AddOnInstructionDefinition", Some(name)),
                ])
            })
    }

    /// Every user type in declaration order.
    pub fn user_types(&self) -> Vec<TypeDefinition> {
        self.definitions_in("DataTypes", "DataType")
    }

    /// Every Add-On Instruction instance layout in declaration order.
    pub fn aoi_types(&self) -> Vec<TypeDefinition> {
        self.definitions_in("AddOnInstructionDefinitions", "AddOnInstructionDefinition")
    }

    fn definitions_in(&self, container: &str, label: &str) -> Vec<TypeDefinition> {
        let Some(container) = self.find_in_controller(&[(container, None)]) else {
            return Vec::new();
        };
        self.children_paths(&container, label)
            .iter()
            .filter_map(|path| self.node(path))
            .filter_map(definition_of)
            .collect()
    }
}

/// Read a `DataType` or `AddOnInstructionDefinition` element.
pub(crate) fn definition_of(element: &ElementNode) -> Option<TypeDefinition> {
    match element.label() {
        "DataType" => Some(datatype_definition(element)),
        "AddOnInstructionDefinition" => Some(aoi_definition(element)),
        _ => None,
    }
}

fn datatype_definition(element: &ElementNode) -> TypeDefinition {
    let name = element.name().unwrap_or_default();
    let members = element
        .child("Members")
        .map(|members| members.children_labeled("Member").map(read_member).collect())
        .unwrap_or_default();

    let mut definition = TypeDefinition::new(name, TypeOrigin::User, members);
    if element.attribute("Family") == Some("StringFamily") {
        definition = definition.with_family(Family::String);
    }
    match element.child_text("Description") {
        Some(description) => definition.with_description(description),
        None => definition,
    }
}

fn read_member(element: &ElementNode) -> Member {
    let name = element.name().unwrap_or_default();
    let data_type = element.attribute("DataType").unwrap_or_default();
    let mut member = match (element.attribute("Target"), element.attribute("BitNumber")) {
        (Some(target), Some(bit)) if data_type.eq_ignore_ascii_case("BIT") => {
            Member::bit(name, target, bit.parse().unwrap_or(0))
        }
        _ => Member::field(name, data_type, dimension_attribute(element)),
    };
    if let Some(radix) = element.attribute("Radix").and_then(Radix::from_name) {
        member = member.with_radix(radix);
    }
    if element.attribute("Hidden") == Some("true") {
        member = member.hidden();
    }
    match element.child_text("Description") {
        Some(description) => member.with_description(description),
        None => member,
    }
}

fn aoi_definition(element: &ElementNode) -> TypeDefinition {
    let name = element.name().unwrap_or_default();
    let mut declared: Vec<AoiMember> = element
        .child("Parameters")
        .map(|p| p.children_labeled("Parameter").map(read_aoi_member).collect())
        .unwrap_or_default();
    if let Some(locals) = element.child("LocalTags") {
        declared.extend(locals.children_labeled("LocalTag").map(read_aoi_member));
    }

    let definition = TypeDefinition::add_on_instruction(name, declared);
    match element.child_text("Description") {
        Some(description) => definition.with_description(description),
        None => definition,
    }
}

fn read_aoi_member(element: &ElementNode) -> AoiMember {
    let data_type = element.attribute("DataType").unwrap_or_default().to_string();
    let default = element
        .children_labeled("DefaultData")
        .find(|d| d.attribute("Format") == Some("Decorated"))
        .and_then(|d| d.child("DataValue"))
        .and_then(|v| v.attribute("Value"))
        .and_then(|text| scalar_default(&data_type, text));

    AoiMember {
        name: element.name().unwrap_or_default().to_string(),
        dimension: dimension_attribute(element),
        usage: element.attribute("Usage").and_then(Usage::from_name),
        radix: element.attribute("Radix").and_then(Radix::from_name),
        default,
        description: element.child_text("Description").map(str::to_string),
        data_type,
    }
}

fn scalar_default(data_type: &str, text: &str) -> Option<Value> {
    let kind = BaseKind::from_name(data_type)?;
    match kind {
        BaseKind::Bool => Some(Value::Bool(text == "1")),
        kind if kind.is_real() => text.parse().ok().map(Value::Real),
        _ => text.parse().ok().map(Value::Integer),
    }
}

fn dimension_attribute(element: &ElementNode) -> usize {
    element
        .attribute("Dimension")
        .or_else(|| element.attribute("Dimensions"))
        .and_then(|d| d.trim().parse().ok())
        .unwrap_or(0)
}

/// Radix attribute written for a member of the given type.
fn member_radix(data_type: &str, radix: Option<Radix>) -> &'static str {
    if let Some(radix) = radix {
        return radix.name();
    }
    match BaseKind::from_name(data_type) {
        Some(kind) => kind.default_radix().name(),
        None if data_type.eq_ignore_ascii_case("BIT") => Radix::Decimal.name(),
        None => Radix::NullType.name(),
    }
}

/// The `DataType` element for a user definition.
pub(crate) fn datatype_element(definition: &TypeDefinition) -> ElementNode {
    let family = match definition.family() {
        Family::String => "StringFamily",
        Family::None => "NoFamily",
    };
    let mut element = ElementNode::new("DataType")
        .with_attribute("Name", definition.name())
        .with_attribute("Family", family)
        .with_attribute("Class", "User");
    if let Some(description) = definition.description() {
        element = element.with_child(ElementNode::new("Description").with_text(description));
    }

    let members = definition.members().iter().map(|member| {
        let mut node = ElementNode::new("Member")
            .with_attribute("Name", member.name())
            .with_attribute("DataType", member.data_type())
            .with_attribute("Dimension", member.dimension().to_string())
            .with_attribute("Radix", member_radix(member.data_type(), member.radix()))
            .with_attribute("Hidden", member.is_hidden().to_string());
        if let MemberKind::Bit(binding) = member.kind() {
            node = node
                .with_attribute("Target", binding.target.as_str())
                .with_attribute("BitNumber", binding.bit.to_string());
        }
        node = node.with_attribute("ExternalAccess", "Read/Write");
        match member.description() {
            Some(description) => {
                node.with_child(ElementNode::new("Description").with_text(description))
            }
            None => node,
        }
    });
    element.with_child(ElementNode::new("Members").with_children(members))
}

/// Digest of an element's content, ignoring edit and creation stamps.
pub(crate) fn content_digest(element: &ElementNode) -> u64 {
    fn feed(element: &ElementNode, hasher: &mut DefaultHasher) {
        element.label().hash(hasher);
        for (name, value) in element.attributes() {
            if !VOLATILE_ATTRIBUTES.contains(&name.as_str()) {
                name.hash(hasher);
                value.hash(hasher);
            }
        }
        match element.text() {
            Some(text) => text.hash(hasher),
            None => {
                element.children().len().hash(hasher);
                for child in element.children() {
                    feed(child, hasher);
                }
            }
        }
    }

    let mut hasher = DefaultHasher::new();
    feed(element, &mut hasher);
    hasher.finish()
}
