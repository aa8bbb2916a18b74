//! The session: a safe adapter over one engine handle.

use crate::config::InitOptions;
use crate::engine::Engine;
use crate::error::{AugError, AugResult, ErrorCode, ErrorDetail};
use crate::script::Script;
use std::ffi::{CStr, CString};
use std::os::raw::c_int;
use tracing::debug;

/// Where [`Augeas::insert`] places the new node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Before the matched node.
    Before,
    /// After the matched node.
    After,
}

/// Result of [`Augeas::defnode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefinedNode {
    /// Number of nodes in the variable's nodeset.
    pub count: u32,
    /// Whether the node had to be created.
    pub created: bool,
}

/// Result of [`Augeas::srun`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutput {
    /// Number of commands executed.
    pub executed: u32,
    /// Everything the commands printed.
    pub output: String,
}

/// An open Augeas session.
///
/// Owns exactly one engine handle; dropping the session closes it. Every
/// operation converts its arguments, calls the engine, and turns a failure
/// code into an [`AugError`] carrying the engine's own error detail.
///
/// # Example
///
/// ```rust,ignore
/// use augeas_core::Augeas;
///
/// let mut aug = Augeas::from_engine(engine);
/// aug.set("/files/etc/hosts/1/ipaddr", Some("127.0.0.2"))?;
/// assert_eq!(aug.get("/files/etc/hosts/1/ipaddr")?.as_deref(), Some("127.0.0.2"));
/// aug.save()?;
/// ```
pub struct Augeas<E: Engine> {
    engine: E,
}

fn cstring(value: &str) -> AugResult<CString> {
    Ok(CString::new(value)?)
}

fn opt_cstring(value: Option<&str>) -> AugResult<Option<CString>> {
    value.map(cstring).transpose()
}

fn owned(value: &CStr) -> String {
    value.to_string_lossy().into_owned()
}

impl<E: Engine> Augeas<E> {
    /// Wraps an open engine handle.
    pub fn from_engine(engine: E) -> Self {
        Self { engine }
    }

    /// Returns the underlying engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Returns the underlying engine mutably.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Unwraps the engine handle.
    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Applies the lens and script parts of `options` to a fresh session.
    ///
    /// With a lens, its load entry is written under `/augeas/load` together
    /// with the include and exclude patterns, then the tree is loaded. The
    /// setup script runs last.
    pub fn configure(&mut self, options: &InitOptions) -> AugResult<()> {
        if let (Some(label), Some(lens)) = (options.lens_label(), options.qualified_lens()) {
            debug!("Configuring lens {lens}");
            let base = format!("/augeas/load/{label}");
            self.set(&format!("{base}/lens"), Some(lens.as_str()))?;
            for pattern in &options.incl {
                self.set(&format!("{base}/incl[last()+1]"), Some(pattern.as_str()))?;
            }
            for pattern in &options.excl {
                self.set(&format!("{base}/excl[last()+1]"), Some(pattern.as_str()))?;
            }
            self.load()?;
        }
        if let Some(script) = options.srun.as_ref().filter(|script| !script.is_empty()) {
            self.srun(script)?;
        }
        Ok(())
    }

    /// Reads the error state of the most recent operation.
    fn detail(&self) -> ErrorDetail {
        ErrorDetail {
            code: ErrorCode::from_raw(self.engine.error_code()),
            message: self.engine.error_message().as_deref().map(owned),
            minor: self.engine.error_minor_message().as_deref().map(owned),
            details: self.engine.error_details().as_deref().map(owned),
        }
    }

    fn fail(&self, operation: &'static str) -> AugError {
        let detail = self.detail();
        debug!("{operation}() failed: {detail}");
        AugError::engine(operation, detail)
    }

    fn status(&self, operation: &'static str, rc: c_int) -> AugResult<()> {
        if rc == 0 {
            Ok(())
        } else {
            Err(self.fail(operation))
        }
    }

    fn counted(&self, operation: &'static str, rc: c_int) -> AugResult<u32> {
        u32::try_from(rc).map_err(|_| self.fail(operation))
    }

    /// Returns the value of the node matching `path`.
    ///
    /// `Ok(None)` means nothing matches. A matching node without a value
    /// reads as an empty string. Several matches, or an invalid expression,
    /// is an error.
    pub fn get(&self, path: &str) -> AugResult<Option<String>> {
        let path = cstring(path)?;
        let (rc, value) = self.engine.get(&path);
        match rc {
            1 => Ok(Some(value.map(owned).unwrap_or_default())),
            0 => Ok(None),
            rc if rc < 0 => Err(self.fail("aug_get")),
            rc => Err(AugError::Unexpected {
                operation: "aug_get",
                code: rc,
            }),
        }
    }

    /// Sets the value of the node matching `path`, creating it if needed.
    ///
    /// Only changes the tree; call [`Augeas::save`] to write files.
    pub fn set(&mut self, path: &str, value: Option<&str>) -> AugResult<()> {
        let path = cstring(path)?;
        let value = opt_cstring(value)?;
        let rc = self.engine.set(&path, value.as_deref());
        self.status("aug_set", rc)
    }

    /// Sets `sub` (or the node itself when `sub` is `None`) below every
    /// node matching `base`. Returns the number of modified nodes.
    pub fn setm(&mut self, base: &str, sub: Option<&str>, value: Option<&str>) -> AugResult<u32> {
        let base = cstring(base)?;
        let sub = opt_cstring(sub)?;
        let value = opt_cstring(value)?;
        let rc = self.engine.setm(&base, sub.as_deref(), value.as_deref());
        self.counted("aug_setm", rc)
    }

    /// Removes every node matching `path` with its descendants.
    /// Returns the number of removed nodes.
    pub fn rm(&mut self, path: &str) -> AugResult<u32> {
        let path = cstring(path)?;
        let rc = self.engine.rm(&path);
        self.counted("aug_rm", rc)
    }

    /// Moves the node matching `src` to `dst`.
    pub fn mv(&mut self, src: &str, dst: &str) -> AugResult<()> {
        let src = cstring(src)?;
        let dst = cstring(dst)?;
        let rc = self.engine.mv(&src, &dst);
        self.status("aug_mv", rc)
    }

    /// Inserts a node labelled `label` next to the node matching `path`.
    pub fn insert(&mut self, path: &str, label: &str, position: Position) -> AugResult<()> {
        let path = cstring(path)?;
        let label = cstring(label)?;
        let rc = self
            .engine
            .insert(&path, &label, position == Position::Before);
        self.status("aug_insert", rc)
    }

    /// Inserts a node before the node matching `path`.
    pub fn insert_before(&mut self, path: &str, label: &str) -> AugResult<()> {
        self.insert(path, label, Position::Before)
    }

    /// Inserts a node after the node matching `path`.
    pub fn insert_after(&mut self, path: &str, label: &str) -> AugResult<()> {
        self.insert(path, label, Position::After)
    }

    /// Counts the nodes matching `path`.
    pub fn count(&self, path: &str) -> AugResult<u32> {
        let path = cstring(path)?;
        let rc = self.engine.count(&path);
        self.counted("aug_match", rc)
    }

    /// Returns the paths of every node matching `path`.
    pub fn matches(&self, path: &str) -> AugResult<Vec<String>> {
        let path = cstring(path)?;
        let (rc, paths) = self.engine.matches(&path);
        self.counted("aug_match", rc)?;
        Ok(paths.iter().map(|p| owned(p)).collect())
    }

    /// Defines the variable `name` as the result of `expr`; `None` removes it.
    ///
    /// Returns the node count for a nodeset and 0 otherwise.
    pub fn defvar(&mut self, name: &str, expr: Option<&str>) -> AugResult<u32> {
        let name = cstring(name)?;
        let expr = opt_cstring(expr)?;
        let rc = self.engine.defvar(&name, expr.as_deref());
        self.counted("aug_defvar", rc)
    }

    /// Defines the variable `name` as the nodes matching `expr`, creating a
    /// node with `value` when none matches.
    pub fn defnode(&mut self, name: &str, expr: &str, value: Option<&str>) -> AugResult<DefinedNode> {
        let name = cstring(name)?;
        let expr = cstring(expr)?;
        let value = opt_cstring(value)?;
        let (rc, created) = self.engine.defnode(&name, &expr, value.as_deref());
        let count = self.counted("aug_defnode", rc)?;
        Ok(DefinedNode { count, created })
    }

    /// Like [`Augeas::defnode`], reporting the created flag to `on_created`
    /// before returning.
    pub fn defnode_with<F>(
        &mut self,
        name: &str,
        expr: &str,
        value: Option<&str>,
        on_created: F,
    ) -> AugResult<DefinedNode>
    where
        F: FnOnce(bool),
    {
        let defined = self.defnode(name, expr, value)?;
        on_created(defined.created);
        Ok(defined)
    }

    /// Writes every changed file to disk. Blocks until done.
    pub fn save(&mut self) -> AugResult<()> {
        debug!("Saving tree");
        let rc = self.engine.save();
        self.status("aug_save", rc)
    }

    /// Loads the configured files.
    ///
    /// Files that fail to parse do not fail the call; see
    /// [`Augeas::file_errors`].
    pub fn load(&mut self) -> AugResult<()> {
        debug!("Loading files");
        let rc = self.engine.load();
        self.status("aug_load", rc)
    }

    /// Runs a command script.
    ///
    /// A `quit` command ends the script with [`AugError::ScriptQuit`] and a
    /// failing command with [`AugError::Script`]. Both keep what the script
    /// printed up to that point.
    pub fn srun(&mut self, script: &Script) -> AugResult<ScriptOutput> {
        let text = cstring(script.text())?;
        let (rc, output) = self.engine.srun(&text).map_err(AugError::Capture)?;
        debug!("aug_srun() -> {rc}");
        match u32::try_from(rc) {
            Ok(executed) => Ok(ScriptOutput { executed, output }),
            Err(_) if rc == -2 => Err(AugError::ScriptQuit { output }),
            Err(_) => {
                let detail = self.detail();
                debug!("aug_srun() failed: {detail}");
                Err(AugError::Script { detail, output })
            }
        }
    }

    /// Error code of the most recent operation.
    pub fn error(&self) -> ErrorCode {
        ErrorCode::from_raw(self.engine.error_code())
    }

    /// Composed error message of the most recent operation, if it failed.
    pub fn error_message(&self) -> Option<String> {
        self.last_error().map(|detail| detail.compose())
    }

    /// Error detail of the most recent operation, if it failed.
    pub fn last_error(&self) -> Option<ErrorDetail> {
        let detail = self.detail();
        if detail.code.is_ok() {
            None
        } else {
            Some(detail)
        }
    }
}
