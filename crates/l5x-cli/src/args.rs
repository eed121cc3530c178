//! Command-line argument definitions for the L5X CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. A subcommand selects the work; the global options choose
//! the configuration file and the logging verbosity.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command-line arguments for the L5X project tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a project and print every finding
    Validate {
        /// Path to the L5X file
        input: PathBuf,

        /// Only run these categories (e.g. references, tasks)
        #[arg(long = "category", value_name = "NAME")]
        categories: Vec<String>,
    },

    /// Parse rung text and print its canonical form and tag references
    Rung {
        /// Rung text, terminated by `;`
        text: String,
    },

    /// Read a project and write it back in canonical form
    Normalize {
        /// Path to the L5X file
        input: PathBuf,

        /// Output path. Defaults to standard output.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
