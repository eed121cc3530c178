//! Exporting components.
//!
//! The counterpart of [`import`](super::import): a component export is a
//! standalone document whose root `TargetType` names the target and whose
//! `Controller Use="Context"` carries what the target needs. Types come in
//! dependency order so that an import can place them front to back.

use chrono::Utc;
use log::{debug, info};

use l5x_core::{ElementNode, TypeDefinition};

use super::{
    RoutineRef, TagScope, aoi_path, edit_timestamp, program_path, routine_path, tag_path,
};
use crate::{
    document::{Document, DocumentError, ROOT_LABEL, definition_of, resolve_insertion_order},
    error::L5xError,
};

const EXPORT_OPTIONS: &str =
    "NoRawData L5KData DecoratedData ForceProtectedEncoding AllProjDocTrans";

/// Controller attributes copied into the context controller.
const CONTROLLER_ATTRIBUTES: &[&str] = &["Name", "ProcessorType", "MajorRev", "MinorRev"];

/// What to export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    DataType(String),
    AddOnInstruction(String),
    Program(String),
    Routine {
        program: String,
        routine: String,
    },
    /// Rungs of a ladder routine, by position.
    Rungs {
        program: String,
        routine: String,
        indices: Vec<usize>,
    },
}

impl ExportTarget {
    /// Root `TargetType` of the export.
    pub fn target_type(&self) -> &'static str {
        match self {
            ExportTarget::DataType(_) => "DataType",
            ExportTarget::AddOnInstruction(_) => "AddOnInstructionDefinition",
            ExportTarget::Program(_) => "Program",
            ExportTarget::Routine { .. } => "Routine",
            ExportTarget::Rungs { .. } => "Rung",
        }
    }
}

/// Tags and types an exported piece of logic reads.
#[derive(Debug, Default)]
struct Context {
    controller_tags: Vec<ElementNode>,
    program_tags: Vec<ElementNode>,
    types: Vec<String>,
}

impl Context {
    fn add_type(&mut self, name: &str) {
        if !self.types.iter().any(|t| t.eq_ignore_ascii_case(name)) {
            self.types.push(name.to_string());
        }
    }

    fn add_tag(&mut self, scope: &TagScope, tag: &ElementNode) {
        let list = match scope {
            TagScope::Controller => &self.controller_tags,
            TagScope::Program(_) => &self.program_tags,
        };
        if list.iter().any(|t| t.name() == tag.name()) {
            return;
        }
        if let Some(data_type) = tag.attribute("DataType") {
            self.add_type(data_type);
        }
        let list = match scope {
            TagScope::Controller => &mut self.controller_tags,
            TagScope::Program(_) => &mut self.program_tags,
        };
        list.push(marked(tag, "Context"));
    }

    /// Collect what the rungs reference, looking names up in `program`
    /// before the controller.
    fn read_rungs<'a>(
        &mut self,
        document: &Document,
        program: &str,
        rungs: impl IntoIterator<Item = &'a ElementNode>,
    ) {
        let scopes = [TagScope::program(program), TagScope::Controller];
        for rung in rungs {
            let Some(text) = rung.child_text("Text") else {
                continue;
            };
            let Ok(parsed) = l5x_rung::parse(text.trim()) else {
                continue;
            };
            for call in parsed.instructions() {
                if aoi_path(document, &call.name).is_ok() {
                    self.add_type(&call.name);
                }
            }
            for name in parsed.tag_references(document.schema()).tags {
                let found = scopes.iter().find_map(|scope| {
                    let path = tag_path(document, scope, &name).ok()?;
                    Some((scope, document.node(&path)?))
                });
                if let Some((scope, tag)) = found {
                    self.add_tag(scope, tag);
                }
            }
        }
    }
}

/// Build a standalone export of `target`.
///
/// # Errors
///
/// Fails when the target does not exist, when rungs are asked of a routine
/// that is not ladder, and on cyclic type dependencies.
pub(super) fn export_component(
    document: &Document,
    target: &ExportTarget,
) -> Result<Document, L5xError> {
    let mut context = Context::default();
    let mut header: Vec<(&str, String)> = Vec::new();
    let mut program: Option<ElementNode> = None;
    let mut target_type_name = None;

    match target {
        ExportTarget::DataType(name) | ExportTarget::AddOnInstruction(name) => {
            let path = match target {
                ExportTarget::DataType(_) => document
                    .find_in_controller(&[("DataTypes", None), ("DataType", Some(name))])
                    .ok_or_else(|| L5xError::not_found("data type", name.as_str()))?,
                _ => aoi_path(document, name)?,
            };
            let element = document.require(&path)?;
            let name = element.name().unwrap_or(name).to_string();
            header.push(("TargetName", name.clone()));
            if element.label() == "AddOnInstructionDefinition" {
                header.push(("TargetClass", class_of(element)));
                header.push((
                    "TargetRevision",
                    element.attribute("Revision").unwrap_or("1.0").to_string(),
                ));
                header.push(("TargetLastEdited", edit_timestamp()));
            }
            context.add_type(&name);
            target_type_name = Some(name);
        }
        ExportTarget::Program(name) => {
            let element = document.require(&program_path(document, name)?)?;
            header.push(("TargetName", element.name().unwrap_or(name).to_string()));
            header.push(("TargetClass", class_of(element)));
            let tags = element
                .child("Tags")
                .into_iter()
                .flat_map(|t| t.children_labeled("Tag"));
            for tag in tags {
                if let Some(data_type) = tag.attribute("DataType") {
                    context.add_type(data_type);
                }
            }
            let rungs = element.descendants().filter(|e| e.label() == "Rung");
            context.read_rungs(document, name, rungs);
            // Its own tags travel inside the program.
            context.program_tags.clear();
            program = Some(marked(element, "Target"));
        }
        ExportTarget::Routine {
            program: owner,
            routine,
        } => {
            let routine_ref = RoutineRef::program(owner.as_str(), routine.as_str());
            let element = document.require(&routine_path(document, &routine_ref)?)?;
            let kind = element.attribute("Type").unwrap_or("RLL");
            header.push(("TargetName", element.name().unwrap_or(routine).to_string()));
            header.push(("TargetSubType", kind.to_string()));
            header.push(("TargetClass", "Standard".to_string()));
            if kind == "RLL" {
                let rungs = element
                    .child("RLLContent")
                    .into_iter()
                    .flat_map(|c| c.children_labeled("Rung"));
                context.read_rungs(document, owner, rungs);
            }
            let routines = context_container("Routines", [marked(element, "Target")]);
            program = Some(context_program(document, owner, &mut context, routines)?);
        }
        ExportTarget::Rungs {
            program: owner,
            routine,
            indices,
        } => {
            let routine_ref = RoutineRef::program(owner.as_str(), routine.as_str());
            let element = document.require(&routine_path(document, &routine_ref)?)?;
            if element.attribute("Type").unwrap_or("RLL") != "RLL" {
                return Err(L5xError::InvalidArgument(format!(
                    "routine {routine_ref} is not a ladder routine"
                )));
            }
            let all: Vec<&ElementNode> = element
                .child("RLLContent")
                .into_iter()
                .flat_map(|c| c.children_labeled("Rung"))
                .collect();
            let mut rungs = Vec::with_capacity(indices.len());
            for (number, &index) in indices.iter().enumerate() {
                let rung = all.get(index).ok_or_else(|| DocumentError::InvalidOrdinal {
                    label: "Rung".to_string(),
                    ordinal: index,
                    count: all.len(),
                })?;
                let mut copy = marked(rung, "Target");
                copy.set_attribute("Number", number.to_string());
                rungs.push(copy);
            }
            let selected = indices.iter().filter_map(|&index| all.get(index).copied());
            context.read_rungs(document, owner, selected);
            header.push(("TargetCount", rungs.len().to_string()));

            let copy = ElementNode::new("Routine")
                .with_attribute("Name", element.name().unwrap_or(routine))
                .with_attribute("Type", "RLL")
                .with_child(ElementNode::new("RLLContent").with_children(rungs));
            let routines = context_container("Routines", [copy]);
            program = Some(context_program(document, owner, &mut context, routines)?);
        }
    }

    let (data_types, aois) = type_closure(document, &context.types, target_type_name.as_deref())?;
    let controller = document.require(&document.controller()?)?;
    let mut shell = ElementNode::new("Controller").with_attribute("Use", "Context");
    for name in CONTROLLER_ATTRIBUTES {
        if let Some(value) = controller.attribute(name) {
            shell.set_attribute(*name, value);
        }
    }
    let shell = shell
        .with_child(context_container("DataTypes", data_types))
        .with_child(context_container("AddOnInstructionDefinitions", aois))
        .with_child(context_container("Tags", context.controller_tags))
        .with_child(context_container("Programs", program));

    let root = export_root(document, target.target_type(), header).with_child(shell);
    let export = Document::from_root(root, document.schema_handle())?;
    info!(target_type = target.target_type(); "Exported component");
    Ok(export)
}

/// The root element of an export, with the target attributes in `header`.
fn export_root(
    document: &Document,
    target_type: &str,
    header: Vec<(&str, String)>,
) -> ElementNode {
    let mut root = ElementNode::new(ROOT_LABEL).with_attribute("SchemaRevision", "1.0");
    if let Some(revision) = document.root().attribute("SoftwareRevision") {
        root.set_attribute("SoftwareRevision", revision);
    }
    root.set_attribute("TargetType", target_type);
    for (name, value) in header {
        root.set_attribute(name, value);
    }
    root.with_attribute("ContainsContext", "true")
        .with_attribute("ExportDate", Utc::now().format("%a %b %d %H:%M:%S %Y").to_string())
        .with_attribute("ExportOptions", EXPORT_OPTIONS)
}

/// A context program holding the context tags and `routines`.
fn context_program(
    document: &Document,
    name: &str,
    context: &mut Context,
    routines: ElementNode,
) -> Result<ElementNode, L5xError> {
    let source = document.require(&program_path(document, name)?)?;
    let mut program = ElementNode::new("Program")
        .with_attribute("Use", "Context")
        .with_attribute("Name", source.name().unwrap_or(name));
    let tags = std::mem::take(&mut context.program_tags);
    if !tags.is_empty() {
        program.push_child(context_container("Tags", tags));
    }
    Ok(program.with_child(routines))
}

/// User types and Add-On Instructions that `roots` need, dependencies
/// first, split into `DataType` and `AddOnInstructionDefinition` elements.
/// Built-in types are left out.
fn type_closure(
    document: &Document,
    roots: &[String],
    target: Option<&str>,
) -> Result<(Vec<ElementNode>, Vec<ElementNode>), L5xError> {
    let mut needed: Vec<String> = Vec::new();
    let mut pending: Vec<String> = roots.to_vec();
    while let Some(name) = pending.pop() {
        if needed.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
            continue;
        }
        let Some(element) = document.type_element_path(&name).and_then(|p| document.node(&p))
        else {
            continue;
        };
        let Some(definition) = definition_of(element) else {
            continue;
        };
        pending.extend(definition.dependencies().into_iter().map(str::to_string));
        pending.extend(called_instructions(document, element));
        needed.push(name);
    }

    // Document order first, so independent types keep their relative order.
    let elements: Vec<&ElementNode> = ["DataTypes", "AddOnInstructionDefinitions"]
        .into_iter()
        .filter_map(|container| document.find_in_controller(&[(container, None)]))
        .flat_map(|path| document.node(&path).map(ElementNode::children).unwrap_or_default())
        .filter(|e| {
            e.name()
                .is_some_and(|n| needed.iter().any(|m| m.eq_ignore_ascii_case(n)))
        })
        .collect();
    let definitions: Vec<TypeDefinition> =
        elements.iter().filter_map(|e| definition_of(e)).collect();

    let mut data_types = Vec::new();
    let mut aois = Vec::new();
    for definition in resolve_insertion_order(&definitions)? {
        let Some(element) = elements
            .iter()
            .find(|e| e.name().is_some_and(|n| n.eq_ignore_ascii_case(definition.name())))
        else {
            continue;
        };
        let is_target = target.is_some_and(|t| t.eq_ignore_ascii_case(definition.name()));
        let copy = marked(element, if is_target { "Target" } else { "Context" });
        if element.label() == "DataType" {
            data_types.push(copy);
        } else {
            aois.push(copy);
        }
    }
    debug!(data_types = data_types.len(), aois = aois.len(); "Collected export types");
    Ok((data_types, aois))
}

/// Add-On Instructions called from the logic of an Add-On Instruction.
fn called_instructions(document: &Document, element: &ElementNode) -> Vec<String> {
    if element.label() != "AddOnInstructionDefinition" {
        return Vec::new();
    }
    element
        .descendants()
        .filter(|e| e.label() == "Rung")
        .filter_map(|rung| rung.child_text("Text"))
        .filter_map(|text| l5x_rung::parse(text.trim()).ok())
        .flat_map(|rung| {
            rung.instructions()
                .into_iter()
                .map(|call| call.name.clone())
                .collect::<Vec<_>>()
        })
        .filter(|name| aoi_path(document, name).is_ok())
        .collect()
}

fn context_container(
    label: &str,
    children: impl IntoIterator<Item = ElementNode>,
) -> ElementNode {
    ElementNode::new(label)
        .with_attribute("Use", "Context")
        .with_children(children)
}

/// A copy of `element` carrying the export marker `Use`.
fn marked(element: &ElementNode, usage: &str) -> ElementNode {
    let mut copy = element.clone();
    copy.remove_attribute("Use");
    copy.insert_attribute_at(0, "Use", usage);
    copy
}

fn class_of(element: &ElementNode) -> String {
    element.attribute("Class").unwrap_or("Standard").to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use l5x_core::{Dimensions, SchemaTable};

    use super::*;
    use crate::{
        config::ConflictPolicy,
        document::{MemberDecl, TypeDecl, tests::sample},
        project::{ImportOptions, Project, TagOptions},
    };

    const EMPTY: &str = r#"<RSLogix5000Content SchemaRevision="1.0" TargetType="Controller"><Controller Name="Fresh" ProcessorType="1756-L83E"><Tasks><Task Name="MainTask" Type="CONTINUOUS"/></Tasks></Controller></RSLogix5000Content>"#;

    fn main_routine() -> RoutineRef {
        RoutineRef::program("MainProgram", "MainRoutine")
    }

    /// The sample with a nested type used by a controller tag in the logic.
    fn project() -> Project {
        let mut project = Project::new(sample());
        let pump = TypeDecl::new("Pump")
            .with_member(MemberDecl::new("Drive", "Valve"))
            .with_member(MemberDecl::new("Rate", "REAL"));
        project.create_type(&pump).unwrap();
        project
            .create_tag(
                &TagScope::Controller,
                "P1",
                "Pump",
                &Dimensions::scalar(),
                None,
                &TagOptions::default(),
            )
            .unwrap();
        project
            .add_rung(&main_routine(), "XIC(P1.Drive.Open)OTE(Start);", None, None)
            .unwrap();
        project
    }

    fn names(container: Option<&ElementNode>, label: &str) -> Vec<String> {
        container
            .into_iter()
            .flat_map(|c| c.children_labeled(label))
            .filter_map(|e| e.name().map(str::to_string))
            .collect()
    }

    fn empty() -> Project {
        Project::parse(EMPTY, Arc::new(SchemaTable::standard())).unwrap()
    }

    #[test]
    fn test_program_export_round_trips() {
        let source = project();
        let export = source
            .export_component(&ExportTarget::Program("MainProgram".to_string()))
            .unwrap();
        let root = export.root();
        assert_eq!(root.attribute("TargetType"), Some("Program"));
        assert_eq!(root.attribute("TargetName"), Some("MainProgram"));
        assert_eq!(root.attribute("ContainsContext"), Some("true"));
        let controller = root.child("Controller").unwrap();
        assert_eq!(controller.attribute("Use"), Some("Context"));
        assert_eq!(names(controller.child("DataTypes"), "DataType"), ["Valve", "Pump"]);
        assert_eq!(names(controller.child("Tags"), "Tag"), ["Start", "P1"]);
        let program = controller.child("Programs").unwrap().child("Program").unwrap();
        assert_eq!(program.attribute("Use"), Some("Target"));

        let mut target = empty();
        let report = target
            .import_component(root, Some(ConflictPolicy::Fail), &ImportOptions::default())
            .unwrap();
        assert!(report.is_clean());
        assert_eq!(
            report.imported,
            ["DataType[Valve]", "DataType[Pump]", "Tag[Start]", "Tag[P1]", "Program[MainProgram]"]
        );
        assert!(!target.validate().has_errors());
        assert!(target.tag_value(&TagScope::program("MainProgram"), "Speed").is_ok());
    }

    #[test]
    fn test_data_type_export_carries_its_dependencies() {
        let source = project();
        let export = source
            .export_component(&ExportTarget::DataType("pump".to_string()))
            .unwrap();
        let root = export.root();
        assert_eq!(root.attribute("TargetType"), Some("DataType"));
        assert_eq!(root.attribute("TargetName"), Some("Pump"));
        let data_types = root.child("Controller").unwrap().child("DataTypes").unwrap();
        let usage: Vec<_> = data_types
            .children_labeled("DataType")
            .map(|e| (e.name().unwrap(), e.attribute("Use").unwrap()))
            .collect();
        assert_eq!(usage, [("Valve", "Context"), ("Pump", "Target")]);

        let mut target = empty();
        let report = target
            .import_component(root, Some(ConflictPolicy::Fail), &ImportOptions::default())
            .unwrap();
        assert_eq!(report.imported, ["DataType[Valve]", "DataType[Pump]"]);
        assert!(!target.validate().has_errors());
    }

    #[test]
    fn test_rung_export_imports_back_into_its_routine() {
        let mut project = project();
        let export = project
            .export_component(&ExportTarget::Rungs {
                program: "MainProgram".to_string(),
                routine: "MainRoutine".to_string(),
                indices: vec![1],
            })
            .unwrap();
        let controller = export.root().child("Controller").unwrap();
        assert_eq!(export.root().attribute("TargetCount"), Some("1"));
        assert_eq!(names(controller.child("Tags"), "Tag"), ["P1", "Start"]);
        let program = controller.child("Programs").unwrap().child("Program").unwrap();
        assert!(program.child("Tags").is_none());
        let rung = program.descendants().find(|e| e.label() == "Rung").unwrap();
        assert_eq!(rung.attribute("Number"), Some("0"));

        let report = project
            .import_component(export.root(), Some(ConflictPolicy::Fail), &ImportOptions::default())
            .unwrap();
        assert_eq!(report.skipped.len(), 4);
        assert_eq!(report.imported, ["Rung[0]"]);
        let document = project.document();
        let routine = document
            .require(&routine_path(document, &main_routine()).unwrap())
            .unwrap();
        assert_eq!(routine.descendants().filter(|e| e.label() == "Rung").count(), 3);
    }

    #[test]
    fn test_routine_export_keeps_program_tags_as_context() {
        let export = Project::new(sample())
            .export_component(&ExportTarget::Routine {
                program: "MainProgram".to_string(),
                routine: "MainRoutine".to_string(),
            })
            .unwrap();
        let root = export.root();
        assert_eq!(root.attribute("TargetSubType"), Some("RLL"));
        let program = root
            .child("Controller")
            .and_then(|c| c.child("Programs"))
            .and_then(|p| p.child("Program"))
            .unwrap();
        assert_eq!(program.attribute("Use"), Some("Context"));
        assert_eq!(names(program.child("Tags"), "Tag"), ["Speed"]);
        let routine = program.child("Routines").unwrap().child("Routine").unwrap();
        assert_eq!(routine.attribute("Use"), Some("Target"));
    }

    #[test]
    fn test_missing_targets_are_rejected() {
        let project = Project::new(sample());
        let err = project
            .export_component(&ExportTarget::Program("Nowhere".to_string()))
            .unwrap_err();
        assert!(matches!(err, L5xError::NotFound { kind: "program", .. }));
        let err = project
            .export_component(&ExportTarget::Rungs {
                program: "MainProgram".to_string(),
                routine: "MainRoutine".to_string(),
                indices: vec![4],
            })
            .unwrap_err();
        assert!(matches!(
            err,
            L5xError::Document(DocumentError::InvalidOrdinal { ordinal: 4, count: 1, .. })
        ));
    }
}
