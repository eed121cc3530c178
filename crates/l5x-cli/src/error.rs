//! Errors of the command-line front end.

use std::io;

use thiserror::Error;

use l5x::L5xError;
use l5x_rung::ParseError;

use crate::config::ConfigError;

/// Everything a CLI run can fail with.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] L5xError),

    /// Rung text given on the command line did not parse.
    #[error("{err}")]
    Rung { err: ParseError, src: String },

    #[error("unknown validation category `{0}`")]
    UnknownCategory(String),

    #[error("validation found {errors} error(s)")]
    Invalid { errors: usize },
}
