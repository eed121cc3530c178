//! Transactional editing of a project.
//!
//! A [`Project`] owns a [`Document`] and applies every edit inside a
//! [`Transaction`]. The document records the inverse of each primitive edit
//! made by the transaction. When the edit closure fails, or when validation
//! finds an error the commit policy does not accept, every edit is undone and
//! the document is left exactly as it was.
//!
//! Single operations on [`Project`] are one-edit transactions. Batches go
//! through [`Project::transaction`], where rung positions are read against
//! the routine as it was when the batch started.
//!
//! # Example
//!
//! ```
//! # use std::sync::Arc;
//! # use l5x::project::{Project, TagOptions, TagScope};
//! # use l5x_core::{Dimensions, SchemaTable, Value};
//! let xml = r#"<RSLogix5000Content SchemaRevision="1.0" TargetType="Controller">
//! <Controller Name="Plant">
//! <Tasks>
//! <Task Name="MainTask" Type="CONTINUOUS"/>
//! </Tasks>
//! </Controller>
//! </RSLogix5000Content>"#;
//! let mut project = Project::parse(xml, Arc::new(SchemaTable::standard())).unwrap();
//! project
//!     .create_tag(
//!         &TagScope::Controller,
//!         "Setpoint",
//!         "DINT",
//!         &Dimensions::scalar(),
//!         Some(&Value::Integer(42)),
//!         &TagOptions::default(),
//!     )
//!     .unwrap();
//! assert_eq!(
//!     project.tag_value(&TagScope::Controller, "Setpoint").unwrap(),
//!     Value::Integer(42)
//! );
//! ```

mod export;
mod import;
mod index;
mod logic;
mod modules;
mod rebase;
mod rename;
mod tags;
mod types;

use std::{collections::HashMap, fmt, sync::Arc};

use chrono::Utc;
use indexmap::IndexMap;
use log::{debug, info, warn};

use l5x_core::{Dimensions, ElementNode, Radix, SchemaTable, Value, types::ExternalAccess};

pub use export::ExportTarget;
pub use import::{ConflictKind, ImportConflict, ImportOptions, ImportReport};
pub use modules::ModulePlacement;
pub use rebase::IndexRebaser;

use crate::{
    config::{CommitPolicy, ConflictPolicy, EditorConfig, EngineConfig},
    document::{Document, NodePath, TypeDecl},
    error::{L5xError, TransactionError},
    validate::{ValidationReport, Validator},
};
use index::ReferenceIndex;

/// Where a tag is declared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagScope {
    /// Project-wide tags, visible to every program.
    Controller,
    /// Tags of one program, visible to its routines only.
    Program(String),
}

impl TagScope {
    pub fn program(name: impl Into<String>) -> Self {
        TagScope::Program(name.into())
    }
}

impl fmt::Display for TagScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagScope::Controller => write!(f, "Controller"),
            TagScope::Program(name) => write!(f, "Program[{name}]"),
        }
    }
}

/// The element a routine belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoutineOwner {
    Program(String),
    AddOnInstruction(String),
}

/// A routine, named through its owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutineRef {
    pub owner: RoutineOwner,
    pub name: String,
}

impl RoutineRef {
    /// A routine of a program.
    pub fn program(program: impl Into<String>, routine: impl Into<String>) -> Self {
        Self {
            owner: RoutineOwner::Program(program.into()),
            name: routine.into(),
        }
    }

    /// A logic routine of an Add-On Instruction.
    pub fn add_on_instruction(aoi: impl Into<String>, routine: impl Into<String>) -> Self {
        Self {
            owner: RoutineOwner::AddOnInstruction(aoi.into()),
            name: routine.into(),
        }
    }

    /// Case-insensitive identity, used to key per-routine state.
    fn key(&self) -> String {
        self.to_string().to_ascii_lowercase()
    }
}

impl fmt::Display for RoutineRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            RoutineOwner::Program(program) => write!(f, "Program[{program}]")?,
            RoutineOwner::AddOnInstruction(aoi) => write!(f, "AddOnInstructionDefinition[{aoi}]")?,
        }
        write!(f, "/Routine[{}]", self.name)
    }
}

/// Kinds of entities [`Transaction::rename_entity`] can rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKind {
    Tag(TagScope),
    DataType,
    AddOnInstruction,
    Program,
    Routine { program: String },
    Task,
    Module,
}

impl EntityKind {
    /// Lower-case noun used in error messages.
    pub fn noun(&self) -> &'static str {
        match self {
            EntityKind::Tag(_) => "tag",
            EntityKind::DataType => "data type",
            EntityKind::AddOnInstruction => "add-on instruction",
            EntityKind::Program => "program",
            EntityKind::Routine { .. } => "routine",
            EntityKind::Task => "task",
            EntityKind::Module => "module",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Tag(scope) => write!(f, "tag in {scope}"),
            EntityKind::Routine { program } => write!(f, "routine in Program[{program}]"),
            kind => f.write_str(kind.noun()),
        }
    }
}

/// Optional attributes of a new tag.
#[derive(Debug, Clone, Default)]
pub struct TagOptions {
    description: Option<String>,
    radix: Option<Radix>,
    constant: bool,
    external_access: Option<ExternalAccess>,
}

impl TagOptions {
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Display radix. Only used for base-type tags.
    pub fn with_radix(mut self, radix: Radix) -> Self {
        self.radix = Some(radix);
        self
    }

    pub fn constant(mut self) -> Self {
        self.constant = true;
        self
    }

    /// External access. Without one the editor's default applies.
    pub fn with_external_access(mut self, access: ExternalAccess) -> Self {
        self.external_access = Some(access);
        self
    }
}

/// How a task is triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    Continuous,
    /// Runs every `rate_ms` milliseconds.
    Periodic { rate_ms: u32 },
    Event,
}

impl TaskType {
    /// Value of the task's `Type` attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Continuous => "CONTINUOUS",
            TaskType::Periodic { .. } => "PERIODIC",
            TaskType::Event => "EVENT",
        }
    }
}

/// Languages a new routine can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineKind {
    /// Relay ladder logic.
    Rll,
    /// Structured text. Lines are stored, never parsed.
    St,
}

impl RoutineKind {
    /// Value of the routine's `Type` attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            RoutineKind::Rll => "RLL",
            RoutineKind::St => "ST",
        }
    }

    fn content_label(self) -> &'static str {
        match self {
            RoutineKind::Rll => "RLLContent",
            RoutineKind::St => "STContent",
        }
    }
}

/// A project document with transactional editing.
#[derive(Debug, Clone)]
pub struct Project {
    document: Document,
    config: EngineConfig,
    validator: Validator,
}

impl Project {
    /// Wrap a document, using the default configuration.
    pub fn new(document: Document) -> Self {
        Self::with_config(document, EngineConfig::default())
    }

    /// Wrap a document.
    ///
    /// # Arguments
    ///
    /// * `document` - The loaded project.
    /// * `config` - Validation and editor settings.
    pub fn with_config(document: Document, config: EngineConfig) -> Self {
        let validator = Validator::from_config(config.validation());
        Self {
            document,
            config,
            validator,
        }
    }

    /// Parse L5X markup into a project with the default configuration.
    pub fn parse(text: &str, schema: Arc<SchemaTable>) -> Result<Self, L5xError> {
        Ok(Self::new(Document::parse(text, schema)?))
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Serialize the project.
    pub fn to_xml(&self) -> Result<String, L5xError> {
        Ok(self.document.to_xml()?)
    }

    /// Run the configured validation categories.
    pub fn validate(&self) -> ValidationReport {
        self.validator.run(&self.document)
    }

    /// Run `edit` as one transaction.
    ///
    /// The edits commit only if `edit` succeeds and validation accepts the
    /// result under the configured [`CommitPolicy`]. Otherwise the document
    /// is rolled back and the error is returned. A transaction that changes
    /// nothing commits without validating.
    ///
    /// # Errors
    ///
    /// Returns the error of `edit`, or [`TransactionError::RolledBack`]
    /// carrying the report that rejected the result.
    pub fn transaction<T>(
        &mut self,
        edit: impl FnOnce(&mut Transaction<'_>) -> Result<T, L5xError>,
    ) -> Result<T, L5xError> {
        let baseline = match self.config.editor().commit_policy() {
            CommitPolicy::NoNewErrors => Some(self.validator.run(&self.document)),
            CommitPolicy::Strict => None,
        };
        let checkpoint = self.document.checkpoint();

        let outcome = {
            let mut tx = Transaction::new(&mut self.document, self.config.editor());
            edit(&mut tx).and_then(|value| tx.finish().map(|()| value))
        };
        let value = match outcome {
            Ok(value) => value,
            Err(err) => {
                warn!(err:%; "Transaction failed, rolling back");
                self.document.rollback_to(checkpoint);
                return Err(err);
            }
        };

        if !self.document.has_changes_since(checkpoint) {
            self.document.commit(checkpoint);
            return Ok(value);
        }

        let report = self.validator.run(&self.document);
        let blocking = match &baseline {
            Some(baseline) => report.new_errors_since(baseline).len(),
            None => report.errors().count(),
        };
        if blocking > 0 {
            warn!(errors = blocking; "Validation rejected transaction, rolling back");
            self.document.rollback_to(checkpoint);
            return Err(TransactionError::RolledBack { report }.into());
        }

        self.document.commit(checkpoint);
        info!(warnings = report.warnings().count(); "Transaction committed");
        Ok(value)
    }

    /// Current value of a tag.
    pub fn tag_value(&self, scope: &TagScope, name: &str) -> Result<Value, L5xError> {
        tags::read_value(&self.document, scope, name)
    }

    pub fn create_type(&mut self, decl: &TypeDecl) -> Result<(), L5xError> {
        self.transaction(|tx| tx.create_type(decl))
    }

    pub fn create_types(&mut self, decls: &[TypeDecl]) -> Result<(), L5xError> {
        self.transaction(|tx| tx.create_types(decls))
    }

    pub fn create_tag(
        &mut self,
        scope: &TagScope,
        name: &str,
        data_type: &str,
        dims: &Dimensions,
        value: Option<&Value>,
        options: &TagOptions,
    ) -> Result<(), L5xError> {
        self.transaction(|tx| tx.create_tag(scope, name, data_type, dims, value, options))
    }

    pub fn create_alias_tag(
        &mut self,
        scope: &TagScope,
        name: &str,
        alias_for: &str,
        description: Option<&str>,
    ) -> Result<(), L5xError> {
        self.transaction(|tx| tx.create_alias_tag(scope, name, alias_for, description))
    }

    pub fn set_tag_value(
        &mut self,
        scope: &TagScope,
        name: &str,
        value: &Value,
    ) -> Result<(), L5xError> {
        self.transaction(|tx| tx.set_tag_value(scope, name, value))
    }

    pub fn delete_tag(&mut self, scope: &TagScope, name: &str) -> Result<(), L5xError> {
        self.transaction(|tx| tx.delete_tag(scope, name))
    }

    pub fn copy_tag(
        &mut self,
        scope: &TagScope,
        name: &str,
        target: &TagScope,
        new_name: &str,
    ) -> Result<(), L5xError> {
        self.transaction(|tx| tx.copy_tag(scope, name, target, new_name))
    }

    pub fn move_tag(
        &mut self,
        scope: &TagScope,
        name: &str,
        target: &TagScope,
    ) -> Result<(), L5xError> {
        self.transaction(|tx| tx.move_tag(scope, name, target))
    }

    pub fn rename_entity(
        &mut self,
        kind: &EntityKind,
        old: &str,
        new: &str,
        cascade: bool,
    ) -> Result<(), L5xError> {
        self.transaction(|tx| tx.rename_entity(kind, old, new, cascade))
    }

    pub fn add_rung(
        &mut self,
        routine: &RoutineRef,
        text: &str,
        comment: Option<&str>,
        position: Option<usize>,
    ) -> Result<usize, L5xError> {
        self.transaction(|tx| tx.add_rung(routine, text, comment, position))
    }

    pub fn modify_rung(
        &mut self,
        routine: &RoutineRef,
        index: usize,
        text: Option<&str>,
        comment: Option<&str>,
    ) -> Result<(), L5xError> {
        self.transaction(|tx| tx.modify_rung(routine, index, text, comment))
    }

    pub fn delete_rung(&mut self, routine: &RoutineRef, index: usize) -> Result<(), L5xError> {
        self.transaction(|tx| tx.delete_rung(routine, index))
    }

    pub fn duplicate_rung_with_substitution(
        &mut self,
        routine: &RoutineRef,
        index: usize,
        mapping: &IndexMap<String, String>,
        comment: Option<&str>,
    ) -> Result<usize, L5xError> {
        self.transaction(|tx| tx.duplicate_rung_with_substitution(routine, index, mapping, comment))
    }

    pub fn create_program(
        &mut self,
        name: &str,
        main_routine: Option<&str>,
        description: Option<&str>,
    ) -> Result<(), L5xError> {
        self.transaction(|tx| tx.create_program(name, main_routine, description))
    }

    pub fn delete_program(&mut self, name: &str) -> Result<(), L5xError> {
        self.transaction(|tx| tx.delete_program(name))
    }

    pub fn create_routine(
        &mut self,
        routine: &RoutineRef,
        kind: RoutineKind,
        description: Option<&str>,
    ) -> Result<(), L5xError> {
        self.transaction(|tx| tx.create_routine(routine, kind, description))
    }

    pub fn delete_routine(&mut self, routine: &RoutineRef) -> Result<(), L5xError> {
        self.transaction(|tx| tx.delete_routine(routine))
    }

    pub fn create_task(&mut self, name: &str, task_type: TaskType) -> Result<(), L5xError> {
        self.transaction(|tx| tx.create_task(name, task_type))
    }

    pub fn schedule_program(&mut self, task: &str, program: &str) -> Result<(), L5xError> {
        self.transaction(|tx| tx.schedule_program(task, program))
    }

    pub fn unschedule_program(&mut self, task: &str, program: &str) -> Result<(), L5xError> {
        self.transaction(|tx| tx.unschedule_program(task, program))
    }

    pub fn add_st_line(
        &mut self,
        routine: &RoutineRef,
        text: &str,
        position: Option<usize>,
    ) -> Result<usize, L5xError> {
        self.transaction(|tx| tx.add_st_line(routine, text, position))
    }

    /// Add a module copied from `template`.
    pub fn import_module(
        &mut self,
        template: &ElementNode,
        name: &str,
        placement: &ModulePlacement,
    ) -> Result<(), L5xError> {
        self.transaction(|tx| tx.import_module(template, name, placement))
    }

    pub fn delete_module(&mut self, name: &str) -> Result<(), L5xError> {
        self.transaction(|tx| tx.delete_module(name))
    }

    pub fn set_module_address(
        &mut self,
        name: &str,
        port_id: &str,
        address: &str,
    ) -> Result<(), L5xError> {
        self.transaction(|tx| tx.set_module_address(name, port_id, address))
    }

    pub fn set_module_inhibited(&mut self, name: &str, inhibited: bool) -> Result<(), L5xError> {
        self.transaction(|tx| tx.set_module_inhibited(name, inhibited))
    }

    /// Import an exported component.
    ///
    /// Without a `policy` the editor's default conflict policy applies.
    pub fn import_component(
        &mut self,
        component: &ElementNode,
        policy: Option<ConflictPolicy>,
        options: &ImportOptions,
    ) -> Result<ImportReport, L5xError> {
        let policy = policy.unwrap_or(self.config.editor().default_conflict_policy());
        self.transaction(|tx| tx.import_component(component, policy, options))
    }

    /// Export a component as a standalone document that
    /// [`Project::import_component`] accepts.
    ///
    /// The export carries the target together with the types, Add-On
    /// Instructions and tags it needs, types in dependency order.
    pub fn export_component(&self, target: &ExportTarget) -> Result<Document, L5xError> {
        export::export_component(&self.document, target)
    }
}

/// Edits in progress on a project.
///
/// Obtained through [`Project::transaction`]. Every method edits the
/// document immediately; the enclosing transaction decides whether the
/// edits are kept.
pub struct Transaction<'a> {
    document: &'a mut Document,
    editor: &'a EditorConfig,
    rebasers: HashMap<String, IndexRebaser>,
    index: Option<ReferenceIndex>,
    touched_aois: Vec<String>,
}

impl<'a> Transaction<'a> {
    fn new(document: &'a mut Document, editor: &'a EditorConfig) -> Self {
        Self {
            document,
            editor,
            rebasers: HashMap::new(),
            index: None,
            touched_aois: Vec::new(),
        }
    }

    /// The document with the edits made so far.
    pub fn document(&self) -> &Document {
        self.document
    }

    fn controller(&self) -> Result<NodePath, L5xError> {
        Ok(self.document.controller()?)
    }

    /// Drop state derived from the tree's structure or rung text.
    fn structure_changed(&mut self) {
        self.index = None;
    }

    fn reference_index(&mut self) -> &ReferenceIndex {
        let document = &*self.document;
        self.index.get_or_insert_with(|| ReferenceIndex::build(document))
    }

    /// Remember that an Add-On Instruction changed.
    fn touch_aoi(&mut self, name: &str) {
        if !self.touched_aois.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            self.touched_aois.push(name.to_string());
        }
    }

    /// Remember the Add-On Instruction containing `path`, if any.
    fn touch_path(&mut self, path: &NodePath) {
        let owner = self
            .document
            .find_in_controller(&[("AddOnInstructionDefinitions", None)])
            .into_iter()
            .flat_map(|c| self.document.children_paths(&c, "AddOnInstructionDefinition"))
            .find(|aoi| path.starts_with(aoi))
            .and_then(|aoi| self.document.node(&aoi))
            .and_then(ElementNode::name)
            .map(str::to_string);
        if let Some(name) = owner {
            self.touch_aoi(&name);
        }
    }

    /// Refresh the edit stamp of every Add-On Instruction this transaction
    /// changed.
    fn finish(&mut self) -> Result<(), L5xError> {
        if !self.editor.stamp_edited_date() {
            return Ok(());
        }
        let stamp = edit_timestamp();
        for name in std::mem::take(&mut self.touched_aois) {
            // Deleted instructions have nothing left to stamp.
            let Ok(path) = aoi_path(self.document, &name) else {
                continue;
            };
            self.document.set_attribute(&path, "EditedDate", stamp.as_str())?;
            debug!(aoi:% = name, stamp:% = stamp; "Stamped add-on instruction");
        }
        Ok(())
    }
}

/// Current time in the `EditedDate` format.
fn edit_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn program_path(document: &Document, name: &str) -> Result<NodePath, L5xError> {
    document
        .find_in_controller(&[("Programs", None), ("Program", Some(name))])
        .ok_or_else(|| L5xError::not_found("program", name))
}

fn aoi_path(document: &Document, name: &str) -> Result<NodePath, L5xError> {
    document
        .find_in_controller(&[
            ("AddOnInstructionDefinitions", None),
            ("AddOnInstructionDefinition", Some(name)),
        ])
        .ok_or_else(|| L5xError::not_found("add-on instruction", name))
}

fn task_path(document: &Document, name: &str) -> Result<NodePath, L5xError> {
    document
        .find_in_controller(&[("Tasks", None), ("Task", Some(name))])
        .ok_or_else(|| L5xError::not_found("task", name))
}

/// The element holding the `Tags` container of a scope.
fn scope_path(document: &Document, scope: &TagScope) -> Result<NodePath, L5xError> {
    match scope {
        TagScope::Controller => Ok(document.controller()?),
        TagScope::Program(program) => program_path(document, program),
    }
}

fn tag_path(document: &Document, scope: &TagScope, name: &str) -> Result<NodePath, L5xError> {
    let parent = scope_path(document, scope)?;
    document
        .find(&parent, &[("Tags", None), ("Tag", Some(name))])
        .ok_or_else(|| L5xError::not_found("tag", format!("{scope}/{name}")))
}

fn routine_path(document: &Document, routine: &RoutineRef) -> Result<NodePath, L5xError> {
    let owner = match &routine.owner {
        RoutineOwner::Program(program) => program_path(document, program)?,
        RoutineOwner::AddOnInstruction(aoi) => aoi_path(document, aoi)?,
    };
    document
        .find(&owner, &[("Routines", None), ("Routine", Some(&routine.name))])
        .ok_or_else(|| L5xError::not_found("routine", routine.to_string()))
}
