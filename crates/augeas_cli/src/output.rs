//! Rendering command results as text or JSON.

use crate::error::CliResult;
use augeas_core::FileError;
use clap::ValueEnum;
use serde::Serialize;
use std::io::Write;

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Plain text, one item per line.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Result of one command.
#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Value of a node; `None` when nothing matched.
    Value {
        /// Queried path.
        path: String,
        /// Value found.
        value: Option<String>,
    },
    /// An edit without a count.
    Done {
        /// Operation name.
        operation: &'static str,
    },
    /// An operation returning a node count.
    Count {
        /// Operation name.
        operation: &'static str,
        /// Number of nodes.
        count: u32,
    },
    /// Matching paths.
    Paths {
        /// Paths in document order.
        paths: Vec<String>,
    },
    /// A script run.
    Script {
        /// Commands executed; unknown when the script stopped at `quit`.
        executed: Option<u32>,
        /// Script output.
        output: String,
        /// Whether the script stopped at `quit`.
        quit: bool,
    },
    /// Files that failed to load or save.
    Errors {
        /// One entry per file.
        errors: Vec<FileError>,
    },
}

/// Writes `outcome` to `out` in `format`.
pub fn write(out: &mut dyn Write, format: Format, outcome: &Outcome) -> CliResult<()> {
    match format {
        Format::Json => {
            serde_json::to_writer_pretty(&mut *out, outcome)?;
            writeln!(out)?;
        }
        Format::Text => write_text(out, outcome)?,
    }
    Ok(())
}

fn write_text(out: &mut dyn Write, outcome: &Outcome) -> std::io::Result<()> {
    match outcome {
        Outcome::Value {
            path,
            value: Some(value),
        } => writeln!(out, "{path} = {value}"),
        Outcome::Value { path, value: None } => writeln!(out, "{path} (no match)"),
        Outcome::Done { .. } => Ok(()),
        Outcome::Count { count, .. } => writeln!(out, "{count}"),
        Outcome::Paths { paths } => {
            for path in paths {
                writeln!(out, "{path}")?;
            }
            Ok(())
        }
        Outcome::Script { output, .. } => out.write_all(output.as_bytes()),
        Outcome::Errors { errors } => {
            for error in errors {
                writeln!(out, "{error}")?;
            }
            Ok(())
        }
    }
}
