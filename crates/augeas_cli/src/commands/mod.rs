//! CLI command implementations.

pub mod edit;
pub mod errors;
pub mod query;
pub mod script;

use crate::error::CliResult;
use crate::output::Outcome;
use augeas_core::{Augeas, Engine};
use clap::Subcommand;
use std::path::PathBuf;

/// Commands that run against an open session.
#[derive(Debug, Clone, Subcommand)]
pub enum Operation {
    /// Print the value of the node matching PATH
    Get {
        /// Path expression
        path: String,
    },

    /// Set the node matching PATH, creating it if needed
    Set {
        /// Path expression
        path: String,
        /// New value; omitted clears the value
        value: Option<String>,
    },

    /// Set SUB below every node matching BASE
    Setm {
        /// Base path expression
        base: String,
        /// Expression relative to each base node ("." for the node itself)
        sub: String,
        /// New value; omitted clears the value
        value: Option<String>,
    },

    /// Remove every node matching PATH
    Rm {
        /// Path expression
        path: String,
    },

    /// Move the node matching SRC to DST
    Mv {
        /// Source path expression
        src: String,
        /// Destination path expression
        dst: String,
    },

    /// Insert a node labelled LABEL next to the node matching PATH
    Insert {
        /// Label of the new node
        label: String,
        /// Path expression of the sibling
        path: String,
        /// Insert before the sibling instead of after it
        #[arg(short, long)]
        before: bool,
    },

    /// List the paths of every node matching PATH
    Match {
        /// Path expression
        path: String,
    },

    /// Count the nodes matching PATH
    Count {
        /// Path expression
        path: String,
    },

    /// Run a command script
    Srun {
        /// Script file, or "-" for stdin
        script: PathBuf,
    },

    /// Show files that failed to load or save
    Errors {
        /// Only show this file
        file: Option<String>,
    },
}

/// Runs `operation` against `aug`.
pub fn execute<E: Engine>(aug: &mut Augeas<E>, operation: &Operation) -> CliResult<Outcome> {
    match operation {
        Operation::Get { path } => query::get(aug, path),
        Operation::Match { path } => query::matches(aug, path),
        Operation::Count { path } => query::count(aug, path),
        Operation::Set { path, value } => edit::set(aug, path, value.as_deref()),
        Operation::Setm { base, sub, value } => edit::setm(aug, base, sub, value.as_deref()),
        Operation::Rm { path } => edit::rm(aug, path),
        Operation::Mv { src, dst } => edit::mv(aug, src, dst),
        Operation::Insert {
            label,
            path,
            before,
        } => edit::insert(aug, path, label, *before),
        Operation::Srun { script } => script::run(aug, &script::read_source(script)?),
        Operation::Errors { file } => errors::run(aug, file.as_deref()),
    }
}
