//! Per-file load and save errors recorded by the engine.
//!
//! The engine does not fail `load` when a single file cannot be parsed.
//! It records the failure under `/augeas/files/<path>/error` instead:
//!
//! ```text
//! /augeas/files/etc/hosts/error = "parse_failed"
//! /augeas/files/etc/hosts/error/message = "Get did not match entire input"
//! /augeas/files/etc/hosts/error/line = "3"
//! /augeas/files/etc/hosts/error/char = "0"
//! ```

use crate::engine::Engine;
use crate::error::AugResult;
use crate::session::Augeas;
use serde::Serialize;
use std::fmt;

/// Prefix of the per-file status nodes.
pub const FILES_PREFIX: &str = "/augeas/files";

/// An error the engine recorded for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
    /// Filesystem path of the file.
    pub file: String,
    /// Line of the failure, if known.
    pub line: Option<String>,
    /// Character position of the failure, if known.
    pub column: Option<String>,
    /// Error message, if the engine recorded one.
    pub message: Option<String>,
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file)?;
        if let Some(line) = &self.line {
            write!(f, ":{line}")?;
        }
        if let Some(column) = &self.column {
            write!(f, ":{column}")?;
        }
        match &self.message {
            Some(message) => write!(f, ": {message}"),
            None => f.write_str(": unknown error"),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl<E: Engine> Augeas<E> {
    /// Returns the error recorded for `file`, or `None` if it has none.
    pub fn file_error(&self, file: &str) -> AugResult<Option<FileError>> {
        let file = if file.starts_with('/') {
            file.to_string()
        } else {
            format!("/{file}")
        };
        let base = format!("{FILES_PREFIX}{file}/error");
        if self.count(&base)? == 0 {
            return Ok(None);
        }
        Ok(Some(FileError {
            line: non_empty(self.get(&format!("{base}/line"))?),
            column: non_empty(self.get(&format!("{base}/char"))?),
            message: non_empty(self.get(&format!("{base}/message"))?),
            file,
        }))
    }

    /// Returns the errors of every file that has one.
    ///
    /// A node labelled `error` only counts when its parent is the status
    /// node of a file, i.e. has a `path` entry naming that file's tree.
    /// Directories that happen to be called `error` are skipped.
    pub fn file_errors(&self) -> AugResult<Vec<FileError>> {
        let mut files: Vec<String> = self
            .matches(&format!("{FILES_PREFIX}//error"))?
            .into_iter()
            .filter_map(|path| {
                path.strip_prefix(FILES_PREFIX)
                    .and_then(|rest| rest.strip_suffix("/error"))
                    .map(str::to_string)
            })
            .collect();
        files.dedup();

        let mut errors = Vec::with_capacity(files.len());
        for file in files {
            if !self.is_file_status(&file)? {
                continue;
            }
            if let Some(error) = self.file_error(&file)? {
                errors.push(error);
            }
        }
        Ok(errors)
    }

    fn is_file_status(&self, file: &str) -> AugResult<bool> {
        let tree = self.get(&format!("{FILES_PREFIX}{file}/path"))?;
        Ok(tree.as_deref() == Some(format!("/files{file}").as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_full() {
        let error = FileError {
            file: "/etc/mke2fs.conf".into(),
            line: Some("3".into()),
            column: Some("0".into()),
            message: Some("Get did not match entire input".into()),
        };
        assert_eq!(
            error.to_string(),
            "/etc/mke2fs.conf:3:0: Get did not match entire input"
        );
    }

    #[test]
    fn display_partial() {
        let error = FileError {
            file: "/etc/sudoers".into(),
            line: None,
            column: None,
            message: Some("Permission denied".into()),
        };
        assert_eq!(error.to_string(), "/etc/sudoers: Permission denied");

        let error = FileError {
            message: None,
            ..error
        };
        assert_eq!(error.to_string(), "/etc/sudoers: unknown error");
    }
}
