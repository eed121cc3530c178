//! CLI logic for the L5X project tool.
//!
//! This module contains the core CLI logic: reading and writing project
//! files, loading configuration and driving the engine for each subcommand.
//! Results go to standard output; logs go through `log`.

pub mod error_adapter;

mod args;
mod config;
mod error;

pub use args::{Args, Command};
pub use config::ConfigError;
pub use error::CliError;

use std::{fs, io::Write, path::Path, sync::Arc};

use log::{debug, info};

use l5x::{
    SchemaTable,
    config::EngineConfig,
    document::Document,
    validate::{Category, Finding, Validator},
};

/// Run the L5X CLI application
///
/// # Arguments
///
/// * `args` - Command-line arguments
/// * `out` - Where command results are written
///
/// # Errors
///
/// Returns `CliError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Malformed projects or rung text
/// - Validation errors in the project
pub fn run(args: &Args, out: &mut impl Write) -> Result<(), CliError> {
    let config = config::load_config(args.config.as_ref())?;
    debug!(config:?; "Loaded configuration");

    match &args.command {
        Command::Validate { input, categories } => validate(input, categories, &config, out),
        Command::Rung { text } => rung(text, out),
        Command::Normalize { input, output } => normalize(input, output.as_deref(), out),
    }
}

fn load_document(input: &Path) -> Result<Document, CliError> {
    info!(input_path:% = input.display(); "Reading project");
    let source = fs::read_to_string(input)?;
    let document = Document::parse(&source, Arc::new(SchemaTable::standard()))
        .map_err(l5x::L5xError::from)?;
    Ok(document)
}

fn validate(
    input: &Path,
    categories: &[String],
    config: &EngineConfig,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let document = load_document(input)?;
    let validator = Validator::from_config(config.validation());

    let findings: Vec<Finding> = if categories.is_empty() {
        validator.run(&document).findings().to_vec()
    } else {
        let mut findings = Vec::new();
        for name in categories {
            let category =
                Category::from_name(name).ok_or_else(|| CliError::UnknownCategory(name.clone()))?;
            findings.extend_from_slice(validator.run_category(&document, category).findings());
        }
        findings
    };

    for finding in &findings {
        writeln!(out, "{finding}")?;
    }
    let errors = findings.iter().filter(|f| f.is_error()).count();
    info!(
        errors,
        warnings = findings.len() - errors;
        "Validation finished"
    );
    if errors > 0 {
        return Err(CliError::Invalid { errors });
    }
    Ok(())
}

fn rung(text: &str, out: &mut impl Write) -> Result<(), CliError> {
    let parsed = l5x_rung::parse(text).map_err(|err| CliError::Rung {
        err,
        src: text.to_string(),
    })?;
    let references = parsed.tag_references(&SchemaTable::standard());

    writeln!(out, "{parsed}")?;
    for tag in &references.tags {
        writeln!(out, "tag {tag}")?;
    }
    for routine in &references.routines {
        writeln!(out, "routine {routine}")?;
    }
    Ok(())
}

fn normalize(input: &Path, output: Option<&Path>, out: &mut impl Write) -> Result<(), CliError> {
    let document = load_document(input)?;
    let xml = document.to_xml().map_err(l5x::L5xError::from)?;

    match output {
        Some(path) => {
            fs::write(path, xml)?;
            info!(output_file:% = path.display(); "Project written");
        }
        None => out.write_all(xml.as_bytes())?,
    }
    Ok(())
}
