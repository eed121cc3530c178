//! Configuration types for the L5X editing engine.
//!
//! All types implement [`serde::Deserialize`], so the command line front end
//! can load them from a TOML file. Every section and field is optional.
//!
//! # Overview
//!
//! - [`EngineConfig`] - Top-level configuration combining validation and editor settings.
//! - [`ValidationConfig`] - Which validation categories run and how strict they are.
//! - [`EditorConfig`] - How transactions commit and what edits fill in by default.
//!
//! # Example
//!
//! ```
//! # use l5x::config::{CommitPolicy, EngineConfig};
//! let config = EngineConfig::default();
//! assert_eq!(config.editor().commit_policy(), CommitPolicy::Strict);
//! assert!(config.editor().stamp_edited_date());
//! ```

use serde::Deserialize;

use l5x_core::types::ExternalAccess;

use crate::validate::{Category, Severity};

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    /// Validation configuration section.
    #[serde(default)]
    validation: ValidationConfig,

    /// Editor configuration section.
    #[serde(default)]
    editor: EditorConfig,
}

impl EngineConfig {
    /// Creates a new [`EngineConfig`] from its sections.
    ///
    /// # Arguments
    ///
    /// * `validation` - Validation category settings.
    /// * `editor` - Transaction and default-value settings.
    pub fn new(validation: ValidationConfig, editor: EditorConfig) -> Self {
        Self { validation, editor }
    }

    /// Returns the validation configuration.
    pub fn validation(&self) -> &ValidationConfig {
        &self.validation
    }

    /// Returns the editor configuration.
    pub fn editor(&self) -> &EditorConfig {
        &self.editor
    }
}

/// Validation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    /// Categories that [`crate::validate::Validator::run`] skips.
    #[serde(default)]
    disabled: Vec<Category>,

    /// Severity of calls to unknown instructions.
    #[serde(default = "default_unknown_instruction")]
    unknown_instruction: Severity,
}

fn default_unknown_instruction() -> Severity {
    Severity::Warning
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            disabled: Vec::new(),
            unknown_instruction: default_unknown_instruction(),
        }
    }
}

impl ValidationConfig {
    /// Creates a new [`ValidationConfig`].
    ///
    /// # Arguments
    ///
    /// * `disabled` - Categories to skip.
    /// * `unknown_instruction` - Severity of unknown instruction findings.
    pub fn new(disabled: Vec<Category>, unknown_instruction: Severity) -> Self {
        Self {
            disabled,
            unknown_instruction,
        }
    }

    /// Returns the disabled categories.
    pub fn disabled(&self) -> &[Category] {
        &self.disabled
    }

    /// Returns the severity of unknown instruction findings.
    pub fn unknown_instruction(&self) -> Severity {
        self.unknown_instruction
    }
}

/// When a transaction may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitPolicy {
    /// Any error finding rolls the transaction back.
    #[default]
    Strict,
    /// Only error findings the document did not already have roll back.
    NoNewErrors,
}

/// What [`crate::project::Transaction::import_component`] does when an
/// imported entity already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Analyse only. Nothing is written.
    #[default]
    Report,
    /// Keep the existing entity.
    Skip,
    /// Replace the existing entity.
    Overwrite,
    /// Abort the import on the first conflict.
    Fail,
}

/// Editor settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EditorConfig {
    /// Commit rule of transactions.
    #[serde(default)]
    commit_policy: CommitPolicy,

    /// Whether edits to an Add-On Instruction refresh its `EditedDate`.
    #[serde(default = "default_stamp_edited_date")]
    stamp_edited_date: bool,

    /// External access of tags created without one.
    #[serde(default)]
    default_external_access: ExternalAccess,

    /// Conflict policy of imports that do not name one.
    #[serde(default)]
    default_conflict_policy: ConflictPolicy,
}

fn default_stamp_edited_date() -> bool {
    true
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            commit_policy: CommitPolicy::default(),
            stamp_edited_date: default_stamp_edited_date(),
            default_external_access: ExternalAccess::default(),
            default_conflict_policy: ConflictPolicy::default(),
        }
    }
}

impl EditorConfig {
    /// Creates a new [`EditorConfig`].
    ///
    /// # Arguments
    ///
    /// * `commit_policy` - Commit rule of transactions.
    /// * `stamp_edited_date` - Whether Add-On Instruction edits refresh `EditedDate`.
    pub fn new(commit_policy: CommitPolicy, stamp_edited_date: bool) -> Self {
        Self {
            commit_policy,
            stamp_edited_date,
            ..Self::default()
        }
    }

    /// Returns the commit policy.
    pub fn commit_policy(&self) -> CommitPolicy {
        self.commit_policy
    }

    /// Returns whether Add-On Instruction edits refresh `EditedDate`.
    pub fn stamp_edited_date(&self) -> bool {
        self.stamp_edited_date
    }

    /// Returns the external access of new tags.
    pub fn default_external_access(&self) -> ExternalAccess {
        self.default_external_access
    }

    /// Returns the conflict policy of imports that do not name one.
    pub fn default_conflict_policy(&self) -> ConflictPolicy {
        self.default_conflict_policy
    }
}
