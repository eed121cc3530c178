//! Importing exported components.
//!
//! A component export is a document whose root `TargetType` names what it
//! carries: a `DataType`, an `AddOnInstructionDefinition`, a `Program`, a
//! `Routine` or a set of `Rung`s. Next to the target it holds the context
//! the target needs: the types it uses and the tags its logic reads.

use std::fmt;

use log::{debug, info};

use l5x_core::{ElementNode, TypeDefinition};

use super::{
    RoutineRef, TagScope, Transaction, edit_timestamp, program_path, routine_path, scope_path,
    tag_path,
};
use crate::{
    config::ConflictPolicy,
    document::{NodePath, ROOT_LABEL, definition_of, resolve_insertion_order},
    error::L5xError,
};

/// Root `TargetType` values that can be imported.
const TARGET_TYPES: &[&str] = &[
    "DataType",
    "AddOnInstructionDefinition",
    "Program",
    "Routine",
    "Rung",
];

/// Why an imported entity collides with an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// A type or instruction of that name exists with a different layout.
    DefinitionMismatch,
    /// A program, routine or tag of that name exists.
    NameExists,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::DefinitionMismatch => write!(f, "definition mismatch"),
            ConflictKind::NameExists => write!(f, "name exists"),
        }
    }
}

/// One collision found while importing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConflict {
    /// Element label, such as `DataType` or `Tag`.
    pub kind: &'static str,
    pub name: String,
    pub conflict: ConflictKind,
    pub detail: String,
}

impl fmt::Display for ImportConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}: {}", self.kind, self.name, self.conflict, self.detail)
    }
}

/// Outcome of an import.
///
/// Items are written as `Label[Name]`, e.g. `DataType[Valve]`. Under
/// [`ConflictPolicy::Report`] `imported` lists what would be written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: Vec<String>,
    pub skipped: Vec<String>,
    pub conflicts: Vec<ImportConflict>,
}

impl ImportReport {
    /// Whether nothing collided.
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Where imported logic goes.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    target_program: Option<String>,
    target_routine: Option<String>,
    rung_position: Option<usize>,
}

impl ImportOptions {
    /// Program receiving an imported routine or rungs, instead of the one
    /// named in the export.
    pub fn with_target_program(mut self, program: impl Into<String>) -> Self {
        self.target_program = Some(program.into());
        self
    }

    /// Routine receiving imported rungs.
    pub fn with_target_routine(mut self, routine: impl Into<String>) -> Self {
        self.target_routine = Some(routine.into());
        self
    }

    /// Position of the first imported rung. Without one rungs are appended.
    pub fn with_rung_position(mut self, position: usize) -> Self {
        self.rung_position = Some(position);
        self
    }
}

/// How an incoming entity relates to the project.
enum Incoming {
    New,
    /// Already present with the same definition.
    Same,
    Conflict {
        conflict: ConflictKind,
        detail: String,
        /// Existing element to replace on overwrite, if it can be replaced.
        existing: Option<NodePath>,
    },
}

impl Transaction<'_> {
    /// Import a component export.
    ///
    /// Context types go first, in dependency order, then context tags, then
    /// the target itself. Identical types are skipped without a conflict.
    /// What happens to a conflicting entity depends on `policy`; under
    /// [`ConflictPolicy::Report`] nothing is written at all.
    ///
    /// # Errors
    ///
    /// Fails on an export that is not a component, on a missing target
    /// program or routine, and under [`ConflictPolicy::Fail`] on the first
    /// conflict.
    pub fn import_component(
        &mut self,
        component: &ElementNode,
        policy: ConflictPolicy,
        options: &ImportOptions,
    ) -> Result<ImportReport, L5xError> {
        if component.label() != ROOT_LABEL {
            return Err(L5xError::InvalidArgument(format!(
                "an export's root must be `{ROOT_LABEL}`, found `{}`",
                component.label()
            )));
        }
        let target_type = component.attribute("TargetType").unwrap_or("Controller");
        if !TARGET_TYPES.contains(&target_type) {
            return Err(L5xError::InvalidArgument(format!(
                "cannot import a `{target_type}` export"
            )));
        }
        let source = component.child("Controller").ok_or_else(|| {
            L5xError::InvalidArgument("export has no `Controller` element".to_string())
        })?;

        let mut import = Import {
            policy,
            report: ImportReport::default(),
        };
        self.import_types(source, &mut import)?;
        for tag in source
            .child("Tags")
            .into_iter()
            .flat_map(|t| t.children_labeled("Tag"))
        {
            self.import_tag(&TagScope::Controller, tag, &mut import)?;
        }

        match target_type {
            "Program" => self.import_program(source, &mut import)?,
            "Routine" => self.import_routine(source, options, &mut import)?,
            "Rung" => self.import_rungs(source, options, &mut import)?,
            _ => {}
        }

        let report = import.report;
        info!(
            target_type,
            policy:? = policy,
            imported = report.imported.len(),
            skipped = report.skipped.len(),
            conflicts = report.conflicts.len();
            "Imported component"
        );
        Ok(report)
    }

    fn import_types(&mut self, source: &ElementNode, import: &mut Import) -> Result<(), L5xError> {
        let elements: Vec<&ElementNode> = source
            .child("DataTypes")
            .into_iter()
            .flat_map(|c| c.children_labeled("DataType"))
            .chain(
                source
                    .child("AddOnInstructionDefinitions")
                    .into_iter()
                    .flat_map(|c| c.children_labeled("AddOnInstructionDefinition")),
            )
            .collect();
        let definitions: Vec<TypeDefinition> =
            elements.iter().filter_map(|e| definition_of(e)).collect();

        for definition in resolve_insertion_order(&definitions)? {
            let Some(element) = elements
                .iter()
                .find(|e| e.name().is_some_and(|n| n.eq_ignore_ascii_case(definition.name())))
            else {
                continue;
            };
            let incoming = self.compare_type(element, definition);
            let label = if element.label() == "DataType" {
                "DataType"
            } else {
                "AddOnInstructionDefinition"
            };
            let mut copy = (*element).clone();
            strip_use(&mut copy);
            if label == "AddOnInstructionDefinition" {
                copy.set_attribute("EditedDate", edit_timestamp());
            }
            let container = if label == "DataType" {
                "DataTypes"
            } else {
                "AddOnInstructionDefinitions"
            };
            let controller = self.controller()?;
            let placement = Placement {
                parent: controller,
                container,
            };
            self.settle(import, label, definition.name(), incoming, placement, copy)?;
        }
        Ok(())
    }

    fn compare_type(&self, element: &ElementNode, incoming: &TypeDefinition) -> Incoming {
        let name = incoming.name();
        if self.document.schema().is_predefined_type(name) {
            return Incoming::Conflict {
                conflict: ConflictKind::NameExists,
                detail: format!("`{name}` is a predefined type"),
                existing: None,
            };
        }
        let Some(path) = self.document.type_element_path(name) else {
            return Incoming::New;
        };
        let existing = self.document.node(&path);
        let same_label = existing.is_some_and(|e| e.label() == element.label());
        let same_layout = existing
            .and_then(definition_of)
            .is_some_and(|e| e.declared_signature() == incoming.declared_signature());
        if same_label && same_layout {
            return Incoming::Same;
        }
        Incoming::Conflict {
            conflict: ConflictKind::DefinitionMismatch,
            detail: "the project defines it differently".to_string(),
            existing: Some(path),
        }
    }

    fn import_tag(
        &mut self,
        scope: &TagScope,
        tag: &ElementNode,
        import: &mut Import,
    ) -> Result<(), L5xError> {
        let name = tag.name().unwrap_or_default();
        let incoming = match tag_path(self.document, scope, name) {
            Err(_) => Incoming::New,
            Ok(path) => {
                let existing = self.document.require(&path)?;
                let same = same_attribute(existing, tag, "DataType")
                    && same_attribute(existing, tag, "Dimensions")
                    && same_attribute(existing, tag, "AliasFor");
                if same {
                    Incoming::Same
                } else {
                    Incoming::Conflict {
                        conflict: ConflictKind::NameExists,
                        detail: format!(
                            "{scope} already has `{name}` of type {}",
                            existing.attribute("DataType").unwrap_or("alias")
                        ),
                        existing: Some(path),
                    }
                }
            }
        };
        let mut copy = tag.clone();
        strip_use(&mut copy);
        let placement = Placement {
            parent: scope_path(self.document, scope)?,
            container: "Tags",
        };
        self.settle(import, "Tag", name, incoming, placement, copy)
    }

    fn import_program(&mut self, source: &ElementNode, import: &mut Import) -> Result<(), L5xError> {
        let Some(program) = target_child(source.child("Programs"), "Program") else {
            return Err(L5xError::InvalidArgument(
                "program export holds no program".to_string(),
            ));
        };
        let name = program.name().unwrap_or_default();
        let incoming = match program_path(self.document, name) {
            Err(_) => Incoming::New,
            Ok(path) => Incoming::Conflict {
                conflict: ConflictKind::NameExists,
                detail: format!("program `{name}` already exists"),
                existing: Some(path),
            },
        };
        let mut copy = program.clone();
        strip_use(&mut copy);
        let placement = Placement {
            parent: self.controller()?,
            container: "Programs",
        };
        self.settle(import, "Program", name, incoming, placement, copy)
    }

    fn import_routine(
        &mut self,
        source: &ElementNode,
        options: &ImportOptions,
        import: &mut Import,
    ) -> Result<(), L5xError> {
        let context = source_program(source)?;
        let program = target_program_name(context, options);
        let parent = program_path(self.document, &program)?;
        self.import_program_tags(context, &program, import)?;

        let Some(routine) = target_child(context.child("Routines"), "Routine") else {
            return Err(L5xError::InvalidArgument(
                "routine export holds no routine".to_string(),
            ));
        };
        let name = routine.name().unwrap_or_default();
        let routine_ref = RoutineRef::program(program.as_str(), name);
        let incoming = match routine_path(self.document, &routine_ref) {
            Err(_) => Incoming::New,
            Ok(path) => Incoming::Conflict {
                conflict: ConflictKind::NameExists,
                detail: format!("routine {routine_ref} already exists"),
                existing: Some(path),
            },
        };
        let mut copy = routine.clone();
        strip_use(&mut copy);
        let placement = Placement {
            parent,
            container: "Routines",
        };
        self.settle(import, "Routine", name, incoming, placement, copy)
    }

    fn import_rungs(
        &mut self,
        source: &ElementNode,
        options: &ImportOptions,
        import: &mut Import,
    ) -> Result<(), L5xError> {
        let context = source_program(source)?;
        let program = target_program_name(context, options);
        program_path(self.document, &program)?;
        self.import_program_tags(context, &program, import)?;

        let routines: Vec<&ElementNode> = context
            .child("Routines")
            .into_iter()
            .flat_map(|r| r.children_labeled("Routine"))
            .collect();
        let routine = options
            .target_routine
            .clone()
            .or_else(|| routines.first().and_then(|r| r.name()).map(str::to_string))
            .ok_or_else(|| {
                L5xError::InvalidArgument("rung export names no routine".to_string())
            })?;
        let routine = RoutineRef::program(program, routine);
        routine_path(self.document, &routine)?;

        let rungs: Vec<&ElementNode> = routines
            .iter()
            .flat_map(|r| r.child("RLLContent"))
            .flat_map(|c| c.children_labeled("Rung"))
            .collect();
        for (number, rung) in rungs.iter().enumerate() {
            let item = format!("Rung[{number}]");
            if import.policy == ConflictPolicy::Report {
                import.report.imported.push(item);
                continue;
            }
            let text = rung.child_text("Text").unwrap_or_default();
            self.add_rung(&routine, text, rung.child_text("Comment"), options.rung_position)?;
            import.report.imported.push(item);
        }
        Ok(())
    }

    fn import_program_tags(
        &mut self,
        context: &ElementNode,
        program: &str,
        import: &mut Import,
    ) -> Result<(), L5xError> {
        let scope = TagScope::program(program);
        for tag in context
            .child("Tags")
            .into_iter()
            .flat_map(|t| t.children_labeled("Tag"))
        {
            self.import_tag(&scope, tag, import)?;
        }
        Ok(())
    }

    /// Apply the conflict policy to one incoming entity.
    fn settle(
        &mut self,
        import: &mut Import,
        kind: &'static str,
        name: &str,
        incoming: Incoming,
        placement: Placement,
        node: ElementNode,
    ) -> Result<(), L5xError> {
        let item = format!("{kind}[{name}]");
        let (conflict, detail, existing) = match incoming {
            Incoming::New => {
                if import.policy != ConflictPolicy::Report {
                    self.place(&placement, node)?;
                }
                import.report.imported.push(item);
                return Ok(());
            }
            Incoming::Same => {
                debug!(kind, name; "Skipped identical definition");
                import.report.skipped.push(item);
                return Ok(());
            }
            Incoming::Conflict {
                conflict,
                detail,
                existing,
            } => (conflict, detail, existing),
        };

        if import.policy == ConflictPolicy::Fail {
            return Err(L5xError::ImportConflict {
                kind,
                name: name.to_string(),
                reason: detail,
            });
        }
        import.report.conflicts.push(ImportConflict {
            kind,
            name: name.to_string(),
            conflict,
            detail,
        });
        match (import.policy, existing) {
            (ConflictPolicy::Overwrite, Some(path)) => {
                let retyped = matches!(kind, "DataType" | "AddOnInstructionDefinition");
                let snapshots = if retyped {
                    self.snapshot_tags()
                } else {
                    Vec::new()
                };
                let same_label = self.document.node(&path).is_some_and(|e| e.label() == kind);
                if same_label {
                    // In place, so types stay ahead of their users.
                    self.document.replace_subtree(&path, node)?;
                    self.structure_changed();
                } else {
                    self.document.remove_subtree(&path)?;
                    self.place(&placement, node)?;
                }
                if retyped {
                    let rewritten = self.reshape_tags(snapshots)?;
                    debug!(kind, name, rewritten; "Overwrote type, re-encoded dependent tags");
                } else {
                    debug!(kind, name; "Overwrote existing entity");
                }
                import.report.imported.push(item);
            }
            (ConflictPolicy::Report, _) => {}
            _ => import.report.skipped.push(item),
        }
        Ok(())
    }

    fn place(&mut self, placement: &Placement, node: ElementNode) -> Result<(), L5xError> {
        let container = self
            .document
            .ensure_container(&placement.parent, placement.container)?;
        self.document.insert_at(&container, node)?;
        self.structure_changed();
        Ok(())
    }
}

/// Where a new entity is inserted.
struct Placement {
    parent: NodePath,
    container: &'static str,
}

struct Import {
    policy: ConflictPolicy,
    report: ImportReport,
}

/// The child marked `Use="Target"`, else the first one.
fn target_child<'a>(
    container: Option<&'a ElementNode>,
    label: &'a str,
) -> Option<&'a ElementNode> {
    let container = container?;
    container
        .children_labeled(label)
        .find(|c| c.attribute("Use") == Some("Target"))
        .or_else(|| container.children_labeled(label).next())
}

/// The program of a routine or rung export.
fn source_program(source: &ElementNode) -> Result<&ElementNode, L5xError> {
    source
        .child("Programs")
        .and_then(|p| p.children_labeled("Program").next())
        .ok_or_else(|| L5xError::InvalidArgument("export holds no program".to_string()))
}

fn target_program_name(context: &ElementNode, options: &ImportOptions) -> String {
    options
        .target_program
        .clone()
        .unwrap_or_else(|| context.name().unwrap_or_default().to_string())
}

fn same_attribute(a: &ElementNode, b: &ElementNode, name: &str) -> bool {
    match (a.attribute(name), b.attribute(name)) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        (None, None) => true,
        _ => false,
    }
}

/// Drop the export markers `Use="Target"` and `Use="Context"`.
fn strip_use(node: &mut ElementNode) {
    node.remove_attribute("Use");
    if let Some(children) = node.children_mut() {
        children.iter_mut().for_each(strip_use);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use l5x_core::{Dimensions, SchemaTable, Value};

    use super::*;
    use crate::{
        codec,
        document::tests::sample,
        project::{Project, TagOptions},
    };

    fn export(target_type: &str, body: &str) -> ElementNode {
        let xml = format!(
            r#"<RSLogix5000Content SchemaRevision="1.0" TargetType="{target_type}"><Controller Use="Context" Name="Plant">{body}</Controller></RSLogix5000Content>"#
        );
        crate::document::Document::parse(&xml, Arc::new(SchemaTable::standard()))
            .unwrap()
            .root()
            .clone()
    }

    const PUMP: &str = r#"<DataTypes>
<DataType Name="Pump" Family="NoFamily" Class="User" Use="Target">
<Members>
<Member Name="Drive" DataType="Valve" Dimension="0" Radix="NullType" Hidden="false" ExternalAccess="Read/Write"/>
<Member Name="Rate" DataType="REAL" Dimension="0" Radix="Float" Hidden="false" ExternalAccess="Read/Write"/>
</Members>
</DataType>
<DataType Name="Valve" Family="NoFamily" Class="User" Use="Context">
<Members>
<Member Name="ZZZZZZZZZZValve0" DataType="SINT" Dimension="0" Radix="Decimal" Hidden="true" ExternalAccess="Read/Write"/>
<Member Name="Open" DataType="BIT" Dimension="0" Radix="Decimal" Hidden="false" Target="ZZZZZZZZZZValve0" BitNumber="0" ExternalAccess="Read/Write"/>
<Member Name="Closed" DataType="BIT" Dimension="0" Radix="Decimal" Hidden="false" Target="ZZZZZZZZZZValve0" BitNumber="1" ExternalAccess="Read/Write"/>
<Member Name="Position" DataType="REAL" Dimension="0" Radix="Float" Hidden="false" ExternalAccess="Read/Write"/>
</Members>
</DataType>
</DataTypes>"#;

    #[test]
    fn test_import_type_skips_identical_context() {
        let mut project = Project::new(sample());
        let report = project
            .import_component(
                &export("DataType", PUMP),
                Some(ConflictPolicy::Skip),
                &ImportOptions::default(),
            )
            .unwrap();
        assert!(report.is_clean());
        assert_eq!(report.imported, ["DataType[Pump]"]);
        assert_eq!(report.skipped, ["DataType[Valve]"]);

        let path = project.document().type_element_path("Pump").unwrap();
        assert!(project.document().node(&path).unwrap().attribute("Use").is_none());
    }

    #[test]
    fn test_report_policy_writes_nothing() {
        let mut project = Project::new(sample());
        let before = project.to_xml().unwrap();
        let report = project
            .import_component(&export("DataType", PUMP), None, &ImportOptions::default())
            .unwrap();
        assert_eq!(report.imported, ["DataType[Pump]"]);
        assert_eq!(project.to_xml().unwrap(), before);
    }

    #[test]
    fn test_mismatched_type_under_each_policy() {
        let changed = PUMP.replace(
            "<Member Name=\"Position\" DataType=\"REAL\"",
            "<Member Name=\"Position\" DataType=\"DINT\"",
        );
        let component = export("DataType", &changed);

        let mut project = Project::new(sample());
        let err = project
            .import_component(&component, Some(ConflictPolicy::Fail), &ImportOptions::default())
            .unwrap_err();
        assert!(matches!(err, L5xError::ImportConflict { kind: "DataType", .. }));

        let report = project
            .import_component(&component, Some(ConflictPolicy::Skip), &ImportOptions::default())
            .unwrap();
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].conflict, ConflictKind::DefinitionMismatch);
        assert_eq!(report.skipped, ["DataType[Valve]"]);

        let mut project = Project::new(sample());
        let report = project
            .import_component(&component, Some(ConflictPolicy::Overwrite), &ImportOptions::default())
            .unwrap();
        assert!(report.imported.contains(&"DataType[Valve]".to_string()));
        let valve = project.document().type_definition("Valve").unwrap();
        assert!(
            valve
                .declared_signature()
                .iter()
                .any(|(name, data_type, _)| name == "POSITION" && data_type == "DINT")
        );
        // Overwriting keeps the type ahead of the types that use it.
        let container = project.document().find_in_controller(&[("DataTypes", None)]).unwrap();
        let first = project.document().children_paths(&container, "DataType")[0].clone();
        assert_eq!(project.document().node(&first).unwrap().name(), Some("Valve"));
    }

    const VALVE_REVISED: &str = r#"<DataTypes>
<DataType Name="Valve" Family="NoFamily" Class="User" Use="Target">
<Members>
<Member Name="ZZZZZZZZZZValve0" DataType="SINT" Dimension="0" Radix="Decimal" Hidden="true" ExternalAccess="Read/Write"/>
<Member Name="Open" DataType="BIT" Dimension="0" Radix="Decimal" Hidden="false" Target="ZZZZZZZZZZValve0" BitNumber="0" ExternalAccess="Read/Write"/>
<Member Name="Position" DataType="DINT" Dimension="0" Radix="Decimal" Hidden="false" ExternalAccess="Read/Write"/>
<Member Name="Limit" DataType="DINT" Dimension="0" Radix="Decimal" Hidden="false" ExternalAccess="Read/Write"/>
</Members>
</DataType>
</DataTypes>"#;

    #[test]
    fn test_overwritten_type_re_encodes_its_tags() {
        let mut project = Project::new(sample());
        project
            .create_tag(
                &TagScope::program("MainProgram"),
                "Inlet",
                "Valve",
                &Dimensions::scalar(),
                Some(&Value::structure([
                    ("Open", Value::Bool(true)),
                    ("Position", Value::Real(2.5)),
                ])),
                &TagOptions::default(),
            )
            .unwrap();

        let report = project
            .import_component(
                &export("DataType", VALVE_REVISED),
                Some(ConflictPolicy::Overwrite),
                &ImportOptions::default(),
            )
            .unwrap();
        assert_eq!(report.imported, ["DataType[Valve]"]);

        let value = project.tag_value(&TagScope::program("MainProgram"), "Inlet").unwrap();
        assert_eq!(value.member("Open"), Some(&Value::Bool(true)));
        assert_eq!(value.member("Position"), Some(&Value::Integer(0)));
        assert_eq!(value.member("Limit"), Some(&Value::Integer(0)));
        assert_eq!(value.member("Closed"), None);

        let document = project.document();
        let path = tag_path(document, &TagScope::program("MainProgram"), "Inlet").unwrap();
        let tag = document.node(&path).unwrap();
        let shape = codec::tag_shape(document, tag).unwrap();
        let compact = codec::tag_data(tag, "L5K").and_then(ElementNode::text).unwrap();
        let structured = &codec::tag_data(tag, "Decorated").unwrap().children()[0];
        assert_eq!(
            codec::decode_checked(&shape, compact.trim(), structured).unwrap(),
            value
        );
        assert!(!project.validate().has_errors());
    }

    #[test]
    fn test_import_rungs_with_context_tags() {
        let body = r#"<Tags>
<Tag Name="Stop" TagType="Base" DataType="BOOL" Radix="Decimal" Constant="false" ExternalAccess="Read/Write">
<Data Format="L5K">
<![CDATA[0]]>
</Data>
<Data Format="Decorated">
<DataValue DataType="BOOL" Radix="Decimal" Value="0"/>
</Data>
</Tag>
</Tags>
<Programs>
<Program Use="Context" Name="MainProgram">
<Routines>
<Routine Use="Context" Name="MainRoutine" Type="RLL">
<RLLContent>
<Rung Use="Target" Number="0" Type="N">
<Text>
<![CDATA[XIC(Stop)OTU(Start);]]>
</Text>
</Rung>
<Rung Use="Target" Number="1" Type="N">
<Comment>
<![CDATA[Reset speed]]>
</Comment>
<Text>
<![CDATA[XIC(Stop)MOV(0,Speed);]]>
</Text>
</Rung>
</RLLContent>
</Routine>
</Routines>
</Program>
</Programs>"#;
        let mut project = Project::new(sample());
        let report = project
            .import_component(
                &export("Rung", body),
                Some(ConflictPolicy::Skip),
                &ImportOptions::default().with_rung_position(0),
            )
            .unwrap();
        assert_eq!(report.imported, ["Tag[Stop]", "Rung[0]", "Rung[1]"]);

        let document = project.document();
        let texts: Vec<_> = document
            .descendant_paths(&NodePath::root(), "Rung")
            .iter()
            .filter_map(|p| document.node(p).and_then(|r| r.child_text("Text")))
            .map(|t| t.trim().to_string())
            .collect();
        assert_eq!(
            texts,
            ["XIC(Stop)OTU(Start);", "XIC(Stop)MOV(0,Speed);", "XIC(Start)MOV(5,Speed);"]
        );
    }

    #[test]
    fn test_existing_program_is_a_name_conflict() {
        let body = r#"<Programs>
<Program Use="Target" Name="MainProgram" TestEdits="false" Disabled="false" UseAsFolder="false">
<Tags/>
<Routines/>
</Program>
</Programs>"#;
        let mut project = Project::new(sample());
        let report = project
            .import_component(&export("Program", body), Some(ConflictPolicy::Skip), &ImportOptions::default())
            .unwrap();
        assert_eq!(report.conflicts[0].conflict, ConflictKind::NameExists);
        assert_eq!(report.skipped, ["Program[MainProgram]"]);
    }

    #[test]
    fn test_rejects_non_component_exports() {
        let mut project = Project::new(sample());
        let whole = project.document().root().clone();
        let err = project
            .import_component(&whole, Some(ConflictPolicy::Skip), &ImportOptions::default())
            .unwrap_err();
        assert!(matches!(err, L5xError::InvalidArgument(_)));
    }
}
