//! The in-memory project tree.
//!
//! A [`Document`] owns the element tree of one L5X file together with the
//! [`SchemaTable`] that governs it. Every mutation goes through a small set
//! of primitives that keep container children in schema order and record an
//! inverse edit, so a [`Checkpoint`] can be rolled back exactly.
//!
//! Nodes are addressed by [`NodePath`], the chain of child positions from the
//! root. A path is only valid until the next structural edit of an ancestor.

mod describe;
mod edit;
mod model;
mod order;
mod resolve;
mod xml;

use std::{collections::HashMap, fmt, sync::Arc};

use log::{debug, info};
use thiserror::Error;

use l5x_core::{ElementNode, SchemaTable};

pub use edit::Checkpoint;
pub use model::{MemberDecl, TypeDecl};
pub use resolve::{DependencyError, resolve_insertion_order};

pub(crate) use model::{content_digest, datatype_element, definition_of};
pub(crate) use xml::check_cdata;

use edit::Journal;

/// Label of the document root.
pub const ROOT_LABEL: &str = "RSLogix5000Content";

/// Errors raised by document reads and primitive edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("malformed markup: {0}")]
    Xml(String),

    #[error("root element must be `{ROOT_LABEL}`, found `{0}`")]
    InvalidRoot(String),

    #[error("project has no `Controller` element")]
    MissingController,

    #[error("no element at `{0}`")]
    NotFound(String),

    #[error("`{child}` is not an allowed child of `{container}`")]
    UnorderedLabel { container: String, child: String },

    #[error("`{0}` has no child ordering")]
    NoOrdering(String),

    #[error("text of `{label}` contains the CDATA delimiter `]]>`")]
    CdataDelimiter { label: String },

    #[error("position {ordinal} is out of range for `{label}` (count {count})")]
    InvalidOrdinal {
        label: String,
        ordinal: usize,
        count: usize,
    },

    #[error("`{0}` holds text, not child elements")]
    NotAContainer(String),
}

/// Position of a node: the child index taken at each level from the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    /// The root element.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path of the `index`th child of this node.
    pub fn child(&self, index: usize) -> Self {
        let mut steps = self.0.clone();
        steps.push(index);
        Self(steps)
    }

    /// Path of the parent and the index within it. `None` for the root.
    pub fn split_last(&self) -> Option<(NodePath, usize)> {
        let (last, parent) = self.0.split_last()?;
        Some((Self(parent.to_vec()), *last))
    }

    pub fn steps(&self) -> &[usize] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Whether `self` is `other` or lies below it.
    pub fn starts_with(&self, other: &NodePath) -> bool {
        self.0.starts_with(&other.0)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/")?;
        let steps: Vec<String> = self.0.iter().map(usize::to_string).collect();
        write!(f, "{}", steps.join("/"))
    }
}

/// Snapshot of an Add-On Instruction taken when the document was loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AoiBaseline {
    pub(crate) digest: u64,
    pub(crate) edited_date: Option<String>,
}

/// An L5X project held in memory.
#[derive(Debug, Clone)]
pub struct Document {
    root: ElementNode,
    schema: Arc<SchemaTable>,
    journal: Journal,
    baseline: HashMap<String, AoiBaseline>,
}

impl Document {
    /// Parse L5X markup.
    ///
    /// A leading byte order mark is ignored, CDATA payloads are kept
    /// verbatim and whitespace between elements is dropped. The root must be
    /// `RSLogix5000Content` with a `Controller` child.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Xml`] for malformed markup and
    /// [`DocumentError::InvalidRoot`] or [`DocumentError::MissingController`]
    /// for a tree that is not a project.
    pub fn parse(text: &str, schema: Arc<SchemaTable>) -> Result<Self, DocumentError> {
        let root = xml::read_tree(text)?;
        let document = Self::from_root(root, schema)?;
        info!(
            elements = document.root.descendants().count(),
            aois = document.baseline.len();
            "Document loaded"
        );
        Ok(document)
    }

    /// Wrap an existing tree.
    ///
    /// # Errors
    ///
    /// Fails like [`Document::parse`] when the tree is not a project.
    pub fn from_root(root: ElementNode, schema: Arc<SchemaTable>) -> Result<Self, DocumentError> {
        if root.label() != ROOT_LABEL {
            return Err(DocumentError::InvalidRoot(root.label().to_string()));
        }
        if root.child("Controller").is_none() {
            return Err(DocumentError::MissingController);
        }

        let mut document = Self {
            root,
            schema,
            journal: Journal::default(),
            baseline: HashMap::new(),
        };
        document.baseline = document.aoi_snapshot();
        Ok(document)
    }

    /// Serialize the tree back to markup.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::CdataDelimiter`] if a text payload that is
    /// written as CDATA contains `]]>`.
    pub fn to_xml(&self) -> Result<String, DocumentError> {
        xml::write_tree(&self.root)
    }

    pub fn root(&self) -> &ElementNode {
        &self.root
    }

    pub fn schema(&self) -> &SchemaTable {
        &self.schema
    }

    /// Shared handle to the schema, for building sibling documents.
    pub fn schema_handle(&self) -> Arc<SchemaTable> {
        Arc::clone(&self.schema)
    }

    /// Node at `path`, if the path is still valid.
    pub fn node(&self, path: &NodePath) -> Option<&ElementNode> {
        path.steps()
            .iter()
            .try_fold(&self.root, |node, &index| node.children().get(index))
    }

    /// Node at `path`, or [`DocumentError::NotFound`].
    pub fn require(&self, path: &NodePath) -> Result<&ElementNode, DocumentError> {
        self.node(path)
            .ok_or_else(|| DocumentError::NotFound(path.to_string()))
    }

    fn node_mut(&mut self, path: &NodePath) -> Result<&mut ElementNode, DocumentError> {
        let mut node = &mut self.root;
        for &index in path.steps() {
            node = child_mut(node, index).ok_or_else(|| DocumentError::NotFound(path.to_string()))?;
        }
        Ok(node)
    }

    /// Path of the `Controller` element.
    pub fn controller(&self) -> Result<NodePath, DocumentError> {
        self.root
            .child_index("Controller")
            .map(|index| NodePath::root().child(index))
            .ok_or(DocumentError::MissingController)
    }

    /// Follow a chain of `(label, name)` steps from `start`.
    ///
    /// A step without a name takes the first child with that label. Names
    /// compare case-insensitively.
    pub fn find(&self, start: &NodePath, steps: &[(&str, Option<&str>)]) -> Option<NodePath> {
        let mut path = start.clone();
        let mut node = self.node(start)?;
        for (label, name) in steps {
            let index = match name {
                Some(name) => node.named_child_index(label, name)?,
                None => node.child_index(label)?,
            };
            node = &node.children()[index];
            path = path.child(index);
        }
        Some(path)
    }

    /// Find a path below the controller.
    pub fn find_in_controller(&self, steps: &[(&str, Option<&str>)]) -> Option<NodePath> {
        let controller = self.controller().ok()?;
        self.find(&controller, steps)
    }

    /// Paths of every child of `parent` with the given label.
    pub fn children_paths(&self, parent: &NodePath, label: &str) -> Vec<NodePath> {
        self.node(parent)
            .map(|node| {
                node.children()
                    .iter()
                    .enumerate()
                    .filter(|(_, child)| child.label() == label)
                    .map(|(index, _)| parent.child(index))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Paths of every descendant of `start` with the given label, pre-order.
    pub fn descendant_paths(&self, start: &NodePath, label: &str) -> Vec<NodePath> {
        fn walk(node: &ElementNode, path: NodePath, label: &str, out: &mut Vec<NodePath>) {
            for (index, child) in node.children().iter().enumerate() {
                let child_path = path.child(index);
                if child.label() == label {
                    out.push(child_path.clone());
                }
                walk(child, child_path, label, out);
            }
        }

        let mut out = Vec::new();
        if let Some(node) = self.node(start) {
            walk(node, start.clone(), label, &mut out);
        }
        out
    }

    /// Load-time snapshot of an Add-On Instruction, by lower-case name.
    pub(crate) fn aoi_baseline(&self, name: &str) -> Option<&AoiBaseline> {
        self.baseline.get(&name.to_ascii_lowercase())
    }

    fn aoi_snapshot(&self) -> HashMap<String, AoiBaseline> {
        let mut snapshot = HashMap::new();
        let Some(definitions) = self.find_in_controller(&[("AddOnInstructionDefinitions", None)])
        else {
            return snapshot;
        };
        for path in self.children_paths(&definitions, "AddOnInstructionDefinition") {
            let Some(node) = self.node(&path) else {
                continue;
            };
            let Some(name) = node.name() else {
                continue;
            };
            snapshot.insert(
                name.to_ascii_lowercase(),
                AoiBaseline {
                    digest: model::content_digest(node),
                    edited_date: node.attribute("EditedDate").map(str::to_string),
                },
            );
        }
        debug!(count = snapshot.len(); "Recorded add-on instruction digests");
        snapshot
    }
}

/// Mutable child access that never turns a text payload into children.
fn child_mut(node: &mut ElementNode, index: usize) -> Option<&mut ElementNode> {
    if node.text().is_some() {
        return None;
    }
    node.children_mut()?.get_mut(index)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A small project used across the crate's unit tests.
    pub(crate) const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<RSLogix5000Content SchemaRevision="1.0" SoftwareRevision="33.00" TargetName="Plant" TargetType="Controller" ContainsContext="false">
<Controller Use="Target" Name="Plant" ProcessorType="1756-L83E">
<DataTypes>
<DataType Name="Valve" Family="NoFamily" Class="User">
<Members>
<Member Name="ZZZZZZZZZZValve0" DataType="SINT" Dimension="0" Radix="Decimal" Hidden="true" ExternalAccess="Read/Write"/>
<Member Name="Open" DataType="BIT" Dimension="0" Radix="Decimal" Hidden="false" Target="ZZZZZZZZZZValve0" BitNumber="0" ExternalAccess="Read/Write"/>
<Member Name="Closed" DataType="BIT" Dimension="0" Radix="Decimal" Hidden="false" Target="ZZZZZZZZZZValve0" BitNumber="1" ExternalAccess="Read/Write"/>
<Member Name="Position" DataType="REAL" Dimension="0" Radix="Float" Hidden="false" ExternalAccess="Read/Write"/>
</Members>
</DataType>
</DataTypes>
<Modules>
<Module Name="Local" CatalogNumber="1756-L83E" ParentModule="Local" ParentModPortId="1">
<Ports>
<Port Id="1" Address="0" Type="ICP" Upstream="false"/>
</Ports>
</Module>
</Modules>
<Tags>
<Tag Name="Start" TagType="Base" DataType="BOOL" Radix="Decimal" Constant="false" ExternalAccess="Read/Write">
<Data Format="L5K">
<![CDATA[0]]>
</Data>
<Data Format="Decorated">
<DataValue DataType="BOOL" Radix="Decimal" Value="0"/>
</Data>
</Tag>
</Tags>
<Programs>
<Program Name="MainProgram" TestEdits="false" MainRoutineName="MainRoutine" Disabled="false" UseAsFolder="false">
<Tags>
<Tag Name="Speed" TagType="Base" DataType="DINT" Radix="Decimal" Constant="false" ExternalAccess="Read/Write">
<Description>
<![CDATA[Line speed]]>
</Description>
<Data Format="L5K">
<![CDATA[0]]>
</Data>
<Data Format="Decorated">
<DataValue DataType="DINT" Radix="Decimal" Value="0"/>
</Data>
</Tag>
</Tags>
<Routines>
<Routine Name="MainRoutine" Type="RLL">
<RLLContent>
<Rung Number="0" Type="N">
<Text>
<![CDATA[XIC(Start)MOV(5,Speed);]]>
</Text>
</Rung>
</RLLContent>
</Routine>
</Routines>
</Program>
</Programs>
<Tasks>
<Task Name="MainTask" Type="CONTINUOUS" Priority="10" Watchdog="500" DisableUpdateOutputs="false" InhibitTask="false">
<ScheduledPrograms>
<ScheduledProgram Name="MainProgram"/>
</ScheduledPrograms>
</Task>
</Tasks>
</Controller>
</RSLogix5000Content>
"#;

    pub(crate) fn sample() -> Document {
        Document::parse(SAMPLE, Arc::new(SchemaTable::standard())).unwrap()
    }

    #[test]
    fn test_parse_and_write_are_stable() {
        let document = sample();
        assert_eq!(document.to_xml().unwrap(), SAMPLE);
    }

    #[test]
    fn test_find_is_case_insensitive() {
        let document = sample();
        let path = document
            .find_in_controller(&[
                ("Programs", None),
                ("Program", Some("mainprogram")),
                ("Routines", None),
                ("Routine", Some("MAINROUTINE")),
            ])
            .unwrap();
        assert_eq!(document.node(&path).unwrap().name(), Some("MainRoutine"));
    }

    #[test]
    fn test_rejects_non_project_root() {
        let schema = Arc::new(SchemaTable::standard());
        let err = Document::parse("<Other/>", Arc::clone(&schema)).unwrap_err();
        assert_eq!(err, DocumentError::InvalidRoot("Other".to_string()));

        let err = Document::parse("<RSLogix5000Content/>", schema).unwrap_err();
        assert_eq!(err, DocumentError::MissingController);
    }

    #[test]
    fn test_descendant_paths() {
        let document = sample();
        let tags = document.descendant_paths(&NodePath::root(), "Tag");
        let names: Vec<_> = tags
            .iter()
            .filter_map(|p| document.node(p).and_then(ElementNode::name))
            .collect();
        assert_eq!(names, ["Start", "Speed"]);
    }

    #[test]
    fn test_node_path_display() {
        assert_eq!(NodePath::root().child(0).child(3).to_string(), "/0/3");
        assert_eq!(NodePath::root().to_string(), "/");
    }
}
