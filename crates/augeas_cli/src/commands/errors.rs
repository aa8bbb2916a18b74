//! Errors command: lists per-file load and save errors.

use crate::error::CliResult;
use crate::output::Outcome;
use augeas_core::{Augeas, Engine};

/// Runs the errors command for one file or for every file.
pub fn run<E: Engine>(aug: &Augeas<E>, file: Option<&str>) -> CliResult<Outcome> {
    let errors = match file {
        Some(file) => aug.file_error(file)?.into_iter().collect(),
        None => aug.file_errors()?,
    };
    Ok(Outcome::Errors { errors })
}
