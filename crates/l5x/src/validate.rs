//! Document validation.
//!
//! A [`Validator`] runs independent checks over a [`Document`] and collects
//! every [`Finding`] into a [`ValidationReport`]. Checks never mutate the
//! document and never stop at the first problem. Each check belongs to one
//! [`Category`]; categories can be run alone or together, and any of them
//! can be switched off.
//!
//! # Example
//!
//! ```
//! # use std::sync::Arc;
//! # use l5x::{document::Document, validate::{Category, Validator}};
//! # use l5x_core::SchemaTable;
//! let xml = r#"<RSLogix5000Content TargetType="Controller">
//! <Controller Name="Plant"/>
//! </RSLogix5000Content>"#;
//! let document = Document::parse(xml, Arc::new(SchemaTable::standard())).unwrap();
//!
//! let report = Validator::new().run_category(&document, Category::Tasks);
//! assert_eq!(report.errors().count(), 1);
//! ```

mod dependencies;
mod formats;
mod freshness;
mod modules;
mod naming;
mod references;
mod rungs;
mod scope;
mod structure;
mod tasks;

use std::fmt;

use log::{debug, info};
use serde::Deserialize;

use l5x_rung::SyntaxKind;

use crate::{config::ValidationConfig, document::Document};

pub(crate) use modules::{Slot, slot_of};

/// Group of related checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Structure,
    References,
    Naming,
    Dependencies,
    Modules,
    Tasks,
    Rungs,
    Freshness,
    Formats,
}

impl Category {
    /// Every category, in the order [`Validator::run`] executes them.
    pub const ALL: [Category; 9] = [
        Category::Structure,
        Category::References,
        Category::Naming,
        Category::Dependencies,
        Category::Modules,
        Category::Tasks,
        Category::Rungs,
        Category::Freshness,
        Category::Formats,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::Structure => "structure",
            Category::References => "references",
            Category::Naming => "naming",
            Category::Dependencies => "dependencies",
            Category::Modules => "modules",
            Category::Tasks => "tasks",
            Category::Rungs => "rungs",
            Category::Freshness => "freshness",
            Category::Formats => "formats",
        }
    }

    /// Category by its lower-case name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a finding blocks a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// What a finding is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FindingKind {
    MissingContainer,
    OrderingViolation,
    DuplicateContainer,
    UndefinedTag,
    AmbiguousReference,
    UndefinedRoutine,
    UndefinedType,
    InvalidName,
    DuplicateName,
    CyclicDependency,
    DeclarationOrder,
    MissingParentModule,
    SlotConflict,
    NoTasks,
    InvalidTaskType,
    UndefinedProgram,
    MultipleContinuous,
    DuplicateSchedule,
    RungSyntax(SyntaxKind),
    ArityMismatch,
    UnknownInstruction,
    StaleEditDate,
    MissingEditDate,
    MissingFormat,
    /// Stored data does not fit the tag's current type.
    UndecodableData,
    FormatMismatch,
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FindingKind::RungSyntax(kind) => write!(f, "RungSyntax({kind})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// One problem found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub category: Category,
    pub severity: Severity,
    pub kind: FindingKind,
    /// Entity path, as rendered by [`Document::describe`].
    pub locator: String,
    pub message: String,
}

impl Finding {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Whether two findings report the same problem at the same place.
    fn same_problem(&self, other: &Finding) -> bool {
        self.kind == other.kind && self.locator == other.locator && self.message == other.message
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}/{}] {}: {}",
            self.severity, self.category, self.kind, self.locator, self.message
        )
    }
}

/// Every finding of a validation run, in check order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    /// Findings of one kind.
    pub fn of_kind(&self, kind: FindingKind) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.kind == kind)
    }

    /// Errors of this report that `baseline` does not already contain.
    pub fn new_errors_since<'a>(&'a self, baseline: &'a ValidationReport) -> Vec<&'a Finding> {
        self.errors()
            .filter(|f| !baseline.findings.iter().any(|b| b.same_problem(f)))
            .collect()
    }

    fn extend(&mut self, other: ValidationReport) {
        self.findings.extend(other.findings);
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for finding in &self.findings {
            writeln!(f, "{finding}")?;
        }
        write!(
            f,
            "{} error(s), {} warning(s)",
            self.errors().count(),
            self.warnings().count()
        )
    }
}

/// Findings of one category as they are produced.
pub(crate) struct Findings {
    category: Category,
    items: Vec<Finding>,
}

impl Findings {
    fn new(category: Category) -> Self {
        Self {
            category,
            items: Vec::new(),
        }
    }

    fn push(
        &mut self,
        severity: Severity,
        kind: FindingKind,
        locator: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.items.push(Finding {
            category: self.category,
            severity,
            kind,
            locator: locator.into(),
            message: message.into(),
        });
    }

    fn error(&mut self, kind: FindingKind, locator: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Error, kind, locator, message);
    }

    fn warning(&mut self, kind: FindingKind, locator: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Warning, kind, locator, message);
    }
}

/// Runs the validation categories over a document.
#[derive(Debug, Clone)]
pub struct Validator {
    disabled: Vec<Category>,
    unknown_instruction: Severity,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            disabled: Vec::new(),
            unknown_instruction: Severity::Warning,
        }
    }
}

impl Validator {
    /// A validator running every category.
    pub fn new() -> Self {
        Self::default()
    }

    /// A validator set up from the `[validation]` configuration section.
    pub fn from_config(config: &ValidationConfig) -> Self {
        Self {
            disabled: config.disabled().to_vec(),
            unknown_instruction: config.unknown_instruction(),
        }
    }

    /// Skip a category in [`Validator::run`].
    pub fn without(mut self, category: Category) -> Self {
        if !self.disabled.contains(&category) {
            self.disabled.push(category);
        }
        self
    }

    /// Severity of calls to instructions that are neither in the catalog
    /// nor defined as Add-On Instructions.
    pub fn with_unknown_instruction_severity(mut self, severity: Severity) -> Self {
        self.unknown_instruction = severity;
        self
    }

    pub fn is_enabled(&self, category: Category) -> bool {
        !self.disabled.contains(&category)
    }

    /// Run every enabled category.
    pub fn run(&self, document: &Document) -> ValidationReport {
        let mut report = ValidationReport::default();
        for category in Category::ALL {
            if self.is_enabled(category) {
                report.extend(self.run_category(document, category));
            }
        }
        info!(
            errors = report.errors().count(),
            warnings = report.warnings().count();
            "Validated document"
        );
        report
    }

    /// Run a single category, enabled or not.
    pub fn run_category(&self, document: &Document, category: Category) -> ValidationReport {
        let mut findings = Findings::new(category);
        match category {
            Category::Structure => structure::check(document, &mut findings),
            Category::References => references::check(document, &mut findings),
            Category::Naming => naming::check(document, &mut findings),
            Category::Dependencies => dependencies::check(document, &mut findings),
            Category::Modules => modules::check(document, &mut findings),
            Category::Tasks => tasks::check(document, &mut findings),
            Category::Rungs => rungs::check(document, self.unknown_instruction, &mut findings),
            Category::Freshness => freshness::check(document, &mut findings),
            Category::Formats => formats::check(document, &mut findings),
        }
        debug!(category:% = category, count = findings.items.len(); "Ran validation category");
        ValidationReport {
            findings: findings.items,
        }
    }
}
