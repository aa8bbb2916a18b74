//! CLI error type.

use augeas_core::AugError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by the `augeas` binary.
#[derive(Debug, Error)]
pub enum CliError {
    /// A session operation failed.
    #[error(transparent)]
    Augeas(#[from] AugError),

    /// An input file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// File that was read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The options file is not a valid options record.
    #[error("invalid options file {}: {source}", path.display())]
    Options {
        /// Options file.
        path: PathBuf,
        /// Decoding error.
        #[source]
        source: serde_json::Error,
    },

    /// Output could not be written.
    #[error("cannot write output: {0}")]
    Output(#[from] io::Error),

    /// Output could not be encoded as JSON.
    #[error("cannot encode output: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
