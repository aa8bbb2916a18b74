//! In-memory engine for tests.
//!
//! [`MemoryEngine`] keeps the tree in process and understands the path
//! subset described in [`crate::path`]. "Disk" is a snapshot of the tree:
//! `save` replaces it, `load` restores `/files` from it. It follows the
//! engine's return-code protocol and error reporting closely enough to test
//! everything layered on [`Engine`], and nothing more.

use crate::path::{self, PathExpr, Start, Step};
use crate::script::{self, Command};
use crate::tree::{NodeId, Tree, ROOT};
use augeas_core::{Engine, ErrorCode, Flags};
use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::fmt::Write as _;
use std::io;
use std::os::raw::c_int;
use std::thread;
use std::time::Duration;

/// Value of `/augeas/version`.
pub const MEMORY_VERSION: &str = "1.14.1";

/// Primary message the engine reports for `code`.
pub fn message_for(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::NoError => "No error",
        ErrorCode::NoMemory => "Cannot allocate memory",
        ErrorCode::Internal => "Internal error (please file a bug)",
        ErrorCode::PathExpression => "Invalid path expression",
        ErrorCode::NoMatch => "No match for path expression",
        ErrorCode::MultipleMatches => "Too many matches for path expression",
        ErrorCode::Syntax => "Syntax error in lens definition",
        ErrorCode::NoLens => "Lens not found",
        ErrorCode::MultipleTransforms => "Multiple transforms",
        ErrorCode::NoSpan => "Node has no span info",
        ErrorCode::MoveIntoDescendant => "Cannot move node into its descendant",
        ErrorCode::CommandRun => "Failed to execute command",
        ErrorCode::BadArgument => "Invalid argument in function call",
        ErrorCode::Other(_) => "Unknown error code",
    }
}

/// A failed operation, recorded as the engine's error state.
#[derive(Debug, Clone)]
struct Failure {
    code: ErrorCode,
    minor: Option<String>,
    details: Option<String>,
}

impl Failure {
    fn new(code: ErrorCode) -> Self {
        Self {
            code,
            minor: None,
            details: None,
        }
    }

    fn minor(mut self, minor: impl Into<String>) -> Self {
        self.minor = Some(minor.into());
        self
    }

    fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    fn too_many(expr: &str, count: usize) -> Self {
        Failure::new(ErrorCode::MultipleMatches)
            .minor(format!("{count} nodes"))
            .details(expr)
    }

    fn no_match(expr: &str) -> Self {
        Failure::new(ErrorCode::NoMatch).details(expr)
    }
}

type Op<T> = Result<T, Failure>;

#[derive(Debug)]
struct ErrorState {
    code: ErrorCode,
    minor: Option<CString>,
    details: Option<CString>,
}

impl Default for ErrorState {
    fn default() -> Self {
        Self {
            code: ErrorCode::NoError,
            minor: None,
            details: None,
        }
    }
}

fn c_string(text: impl Into<String>) -> CString {
    // Inputs arrive as C strings, so they hold no interior NUL.
    CString::new(text.into()).unwrap_or_default()
}

fn text(value: &CStr) -> Op<&str> {
    value
        .to_str()
        .map_err(|_| Failure::new(ErrorCode::BadArgument).minor("string is not valid UTF-8"))
}

fn opt_text(value: Option<&CStr>) -> Op<Option<&str>> {
    value.map(text).transpose()
}

fn as_rc(n: usize) -> c_int {
    c_int::try_from(n).unwrap_or(c_int::MAX)
}

/// Outcome of a script run.
enum ScriptEnd {
    Completed(usize),
    Quit,
}

/// An [`Engine`] holding its tree in memory.
///
/// # Example
///
/// ```rust
/// use augeas_core::Augeas;
/// use augeas_testkit::MemoryEngine;
///
/// let engine = MemoryEngine::new().with_value("/files/etc/hosts/1/ipaddr", "127.0.0.1");
/// let aug = Augeas::from_engine(engine);
/// assert_eq!(aug.get("/files/etc/hosts/1/ipaddr").unwrap().as_deref(), Some("127.0.0.1"));
/// ```
#[derive(Debug)]
pub struct MemoryEngine {
    tree: Tree,
    disk: Tree,
    vars: HashMap<String, Vec<NodeId>>,
    flags: Flags,
    error: RefCell<ErrorState>,
    save_delay: Duration,
    save_failure: Option<String>,
    saves: usize,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    /// Creates an engine with the `/augeas` and `/files` trees.
    pub fn new() -> Self {
        let mut engine = Self {
            tree: Tree::new(),
            disk: Tree::new(),
            vars: HashMap::new(),
            flags: Flags::NONE,
            error: RefCell::new(ErrorState::default()),
            save_delay: Duration::ZERO,
            save_failure: None,
            saves: 0,
        };
        engine.seed("/augeas/root", Some("/"));
        engine.seed("/augeas/version", Some(MEMORY_VERSION));
        engine.seed("/augeas/context", Some("/files"));
        engine.seed("/files", None);
        engine.disk = engine.tree.clone();
        engine
    }

    fn seed(&mut self, path: &str, value: Option<&str>) {
        if let Err(failure) = self.set_path(path, value) {
            panic!("cannot seed {path}: {failure:?}");
        }
    }

    /// Sets `path` to `value` in the tree and on disk.
    #[must_use]
    pub fn with_value(mut self, path: &str, value: &str) -> Self {
        self.seed(path, Some(value));
        self.disk = self.tree.clone();
        self
    }

    /// Creates `path` without a value, in the tree and on disk.
    #[must_use]
    pub fn with_node(mut self, path: &str) -> Self {
        self.seed(path, None);
        self.disk = self.tree.clone();
        self
    }

    /// Records a load error for `file` under `/augeas/files`, together
    /// with the `path` entry the engine keeps for every loaded file.
    #[must_use]
    pub fn with_file_error(
        mut self,
        file: &str,
        message: &str,
        line: Option<u32>,
        column: Option<u32>,
    ) -> Self {
        self.seed(&format!("/augeas/files{file}/path"), Some(&format!("/files{file}")));
        let base = format!("/augeas/files{file}/error");
        self.seed(&base, Some("parse_failed"));
        self.seed(&format!("{base}/message"), Some(message));
        if let Some(line) = line {
            self.seed(&format!("{base}/line"), Some(&line.to_string()));
        }
        if let Some(column) = column {
            self.seed(&format!("{base}/char"), Some(&column.to_string()));
        }
        self
    }

    /// Sets the initialization flags. `SAVE_NOOP` makes saves leave the
    /// disk untouched.
    #[must_use]
    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    /// Makes every save take at least `delay`.
    #[must_use]
    pub fn with_save_delay(mut self, delay: Duration) -> Self {
        self.save_delay = delay;
        self
    }

    /// Makes the next save fail with `message`.
    pub fn fail_next_save(&mut self, message: impl Into<String>) {
        self.save_failure = Some(message.into());
    }

    /// Number of successful saves.
    pub fn saves(&self) -> usize {
        self.saves
    }

    /// Value of the single node matching `path` in the saved snapshot.
    pub fn saved_value(&self, path: &str) -> Option<String> {
        let expr = path::parse(path).ok()?;
        let nodes = evaluate(&self.disk, &HashMap::new(), &expr).ok()?;
        match nodes.as_slice() {
            [node] => Some(
                self.disk
                    .value(*node)
                    .map(|v| v.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            ),
            _ => None,
        }
    }

    /// Every node path in the tree, in document order.
    pub fn paths(&self) -> Vec<String> {
        self.tree
            .subtree(ROOT)
            .into_iter()
            .skip(1)
            .map(|id| self.tree.path(id))
            .collect()
    }

    fn reset_error(&self) {
        *self.error.borrow_mut() = ErrorState::default();
    }

    fn record(&self, failure: Failure) {
        *self.error.borrow_mut() = ErrorState {
            code: failure.code,
            minor: failure.minor.map(c_string),
            details: failure.details.map(c_string),
        };
    }

    /// Runs `op` with a fresh error state, recording a failure.
    fn run<T>(&self, op: impl FnOnce() -> Op<T>) -> Option<T> {
        self.reset_error();
        match op() {
            Ok(value) => Some(value),
            Err(failure) => {
                self.record(failure);
                None
            }
        }
    }

    fn run_mut<T>(&mut self, op: impl FnOnce(&mut Self) -> Op<T>) -> Option<T> {
        self.reset_error();
        match op(self) {
            Ok(value) => Some(value),
            Err(failure) => {
                self.record(failure);
                None
            }
        }
    }

    fn parse(expr: &str) -> Op<PathExpr> {
        path::parse(expr).map_err(|e| {
            Failure::new(ErrorCode::PathExpression)
                .minor(e.reason)
                .details(expr)
        })
    }

    fn select(&self, expr: &str) -> Op<Vec<NodeId>> {
        evaluate(&self.tree, &self.vars, &Self::parse(expr)?).map_err(|f| f.details(expr))
    }

    fn select_one(&self, expr: &str) -> Op<NodeId> {
        match self.select(expr)?.as_slice() {
            [node] => Ok(*node),
            [] => Err(Failure::no_match(expr)),
            nodes => Err(Failure::too_many(expr, nodes.len())),
        }
    }

    /// Finds the deepest existing node on the way to `expr` and the steps
    /// left to create below it.
    fn locate(&self, expr: &str) -> Op<(NodeId, Vec<Step>)> {
        let parsed = Self::parse(expr)?;
        let contexts =
            start_nodes(&self.tree, &self.vars, &parsed.start).map_err(|f| f.details(expr))?;
        let start = match contexts.as_slice() {
            [node] => *node,
            [] => return Err(Failure::no_match(expr)),
            nodes => return Err(Failure::too_many(expr, nodes.len())),
        };
        let (node, matched) = self.descend(start, &parsed.steps, expr)?;
        Ok((node, parsed.steps[matched..].to_vec()))
    }

    /// Follows `steps` while each matches exactly one node.
    fn descend(&self, from: NodeId, steps: &[Step], expr: &str) -> Op<(NodeId, usize)> {
        let mut current = from;
        for (i, step) in steps.iter().enumerate() {
            match self.tree.select(&[current], step).as_slice() {
                [node] => current = *node,
                [] => return Ok((current, i)),
                nodes => return Err(Failure::too_many(expr, nodes.len())),
            }
        }
        Ok((current, steps.len()))
    }

    /// Finds the single node matching `expr`, creating missing steps.
    fn resolve_or_create(&mut self, expr: &str) -> Op<NodeId> {
        let (node, rest) = self.locate(expr)?;
        self.create(node, &rest, expr)
    }

    fn create(&mut self, from: NodeId, steps: &[Step], expr: &str) -> Op<NodeId> {
        let labels = steps
            .iter()
            .map(|step| step.creatable_label().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                Failure::new(ErrorCode::PathExpression)
                    .minor("cannot create node for wildcard or axis step")
                    .details(expr)
            })?;
        let mut current = from;
        for label in labels {
            current = self.tree.append_child(current, &label);
        }
        Ok(current)
    }

    fn set_path(&mut self, path: &str, value: Option<&str>) -> Op<()> {
        let node = self.resolve_or_create(path)?;
        self.tree.set_value(node, value.map(c_string));
        Ok(())
    }

    fn setm_paths(&mut self, base: &str, sub: Option<&str>, value: Option<&str>) -> Op<usize> {
        let bases = self.select(base)?;
        let steps = match sub {
            Some(sub) if sub.trim() != "." => path::parse_relative(sub).map_err(|e| {
                Failure::new(ErrorCode::PathExpression)
                    .minor(e.reason)
                    .details(sub)
            })?,
            _ => Vec::new(),
        };
        let expr = sub.unwrap_or(base);
        for &node in &bases {
            let (found, matched) = self.descend(node, &steps, expr)?;
            let target = self.create(found, &steps[matched..], expr)?;
            self.tree.set_value(target, value.map(c_string));
        }
        Ok(bases.len())
    }

    fn rm_paths(&mut self, path: &str) -> Op<usize> {
        let nodes = self.select(path)?;
        Ok(nodes.into_iter().map(|node| self.tree.remove(node)).sum())
    }

    fn mv_path(&mut self, src: &str, dst: &str) -> Op<()> {
        let source = self.select_one(src)?;
        let (anchor, rest) = self.locate(dst)?;
        if self.tree.is_ancestor_or_self(source, anchor) {
            return Err(Failure::new(ErrorCode::MoveIntoDescendant).details(format!("{src} into {dst}")));
        }
        let target = self.create(anchor, &rest, dst)?;
        self.tree.move_onto(source, target);
        Ok(())
    }

    fn insert_path(&mut self, path: &str, label: &str, before: bool) -> Op<()> {
        if label.is_empty() || label.contains(['/', '[', ']']) {
            return Err(Failure::new(ErrorCode::BadArgument)
                .minor("invalid label")
                .details(label));
        }
        let node = self.select_one(path)?;
        let (Some(parent), Some(index)) = (self.tree.parent(node), self.tree.index_in_parent(node)) else {
            return Err(Failure::new(ErrorCode::BadArgument)
                .minor("cannot insert sibling of the root")
                .details(path));
        };
        let index = if before { index } else { index + 1 };
        self.tree.insert_child(parent, index, label);
        Ok(())
    }

    fn defvar_expr(&mut self, name: &str, expr: Option<&str>) -> Op<usize> {
        match expr {
            None => {
                self.vars.remove(name);
                Ok(0)
            }
            Some(expr) => {
                let nodes = self.select(expr)?;
                let n = nodes.len();
                self.vars.insert(name.to_string(), nodes);
                Ok(n)
            }
        }
    }

    fn defnode_expr(&mut self, name: &str, expr: &str, value: Option<&str>) -> Op<(usize, bool)> {
        let nodes = self.select(expr)?;
        if !nodes.is_empty() {
            let n = nodes.len();
            self.vars.insert(name.to_string(), nodes);
            return Ok((n, false));
        }
        let node = self.resolve_or_create(expr)?;
        self.tree.set_value(node, value.map(c_string));
        self.vars.insert(name.to_string(), vec![node]);
        Ok((1, true))
    }

    fn save_tree(&mut self) -> Op<()> {
        thread::sleep(self.save_delay);
        if let Some(message) = self.save_failure.take() {
            return Err(Failure::new(ErrorCode::Internal).minor(message));
        }
        if !self.flags.contains(Flags::SAVE_NOOP) {
            self.disk = self.tree.clone();
        }
        self.saves += 1;
        Ok(())
    }

    /// Replaces `/files` with its saved snapshot; `/augeas` is kept.
    fn load_tree(&mut self) {
        let mut tree = Tree::new();
        for &top in self.tree.children(ROOT) {
            if self.tree.label(top) != "files" {
                tree.copy_subtree(ROOT, &self.tree, top);
            }
        }
        for &top in self.disk.children(ROOT) {
            if self.disk.label(top) == "files" {
                tree.copy_subtree(ROOT, &self.disk, top);
            }
        }
        self.tree = tree;
        self.vars.clear();
    }

    fn describe(&self, node: NodeId, out: &mut String) {
        let path = self.tree.path(node);
        match self.tree.value(node) {
            Some(value) => {
                let _ = writeln!(out, "{path} = {}", value.to_string_lossy());
            }
            None => {
                let _ = writeln!(out, "{path} (none)");
            }
        }
    }

    fn run_command(&mut self, command: Command, out: &mut String) -> Op<bool> {
        match command {
            Command::Set { path, value } => self.set_path(&path, value.as_deref())?,
            Command::Rm(path) => {
                let removed = self.rm_paths(&path)?;
                let _ = writeln!(out, "rm : {path} {removed}");
            }
            Command::Defnode { name, expr, value } => {
                self.defnode_expr(&name, &expr, value.as_deref())?;
            }
            Command::Get(path) => match self.select(&path)?.as_slice() {
                [] => {
                    let _ = writeln!(out, "{path} (o)");
                }
                [node] => match self.tree.value(*node) {
                    Some(value) => {
                        let _ = writeln!(out, "{path} = {}", value.to_string_lossy());
                    }
                    None => {
                        let _ = writeln!(out, "{path} (none)");
                    }
                },
                nodes => return Err(Failure::too_many(&path, nodes.len())),
            },
            Command::Match { path, value } => {
                let nodes: Vec<NodeId> = self
                    .select(&path)?
                    .into_iter()
                    .filter(|&node| match &value {
                        Some(wanted) => self
                            .tree
                            .value(node)
                            .is_some_and(|v| v.to_bytes() == wanted.as_bytes()),
                        None => true,
                    })
                    .collect();
                if nodes.is_empty() {
                    out.push_str("  (no matches)\n");
                }
                for node in nodes {
                    self.describe(node, out);
                }
            }
            Command::Save => self.save_tree()?,
            Command::Load => self.load_tree(),
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }

    fn run_script(&mut self, text: &str, out: &mut String) -> Op<ScriptEnd> {
        let mut executed = 0;
        for line in text.lines() {
            let command = script::parse_line(line).map_err(|reason| {
                Failure::new(ErrorCode::CommandRun)
                    .minor(reason)
                    .details(line.trim())
            })?;
            let Some(command) = command else {
                continue;
            };
            if !self.run_command(command, out)? {
                return Ok(ScriptEnd::Quit);
            }
            executed += 1;
        }
        Ok(ScriptEnd::Completed(executed))
    }
}

fn start_nodes(tree: &Tree, vars: &HashMap<String, Vec<NodeId>>, start: &Start) -> Op<Vec<NodeId>> {
    match start {
        Start::Root => Ok(vec![ROOT]),
        Start::Context => Ok(tree
            .children(ROOT)
            .iter()
            .copied()
            .filter(|&id| tree.label(id) == "files")
            .collect()),
        Start::Variable(name) => match vars.get(name) {
            Some(nodes) => Ok(nodes.iter().copied().filter(|&id| tree.contains(id)).collect()),
            None => Err(Failure::new(ErrorCode::PathExpression).minor(format!("undefined variable ${name}"))),
        },
    }
}

fn evaluate(tree: &Tree, vars: &HashMap<String, Vec<NodeId>>, expr: &PathExpr) -> Op<Vec<NodeId>> {
    let contexts = start_nodes(tree, vars, &expr.start)?;
    Ok(expr
        .steps
        .iter()
        .fold(contexts, |contexts, step| tree.select(&contexts, step)))
}

impl Engine for MemoryEngine {
    fn get(&self, path: &CStr) -> (c_int, Option<&CStr>) {
        let found = self.run(|| {
            let path = text(path)?;
            match self.select(path)?.as_slice() {
                [] => Ok(None),
                [node] => Ok(Some(*node)),
                nodes => Err(Failure::too_many(path, nodes.len())),
            }
        });
        match found {
            Some(Some(node)) => (1, self.tree.value(node).map(CString::as_c_str)),
            Some(None) => (0, None),
            None => (-1, None),
        }
    }

    fn set(&mut self, path: &CStr, value: Option<&CStr>) -> c_int {
        self.run_mut(|engine| engine.set_path(text(path)?, opt_text(value)?))
            .map_or(-1, |()| 0)
    }

    fn setm(&mut self, base: &CStr, sub: Option<&CStr>, value: Option<&CStr>) -> c_int {
        self.run_mut(|engine| engine.setm_paths(text(base)?, opt_text(sub)?, opt_text(value)?))
            .map_or(-1, as_rc)
    }

    fn rm(&mut self, path: &CStr) -> c_int {
        self.run_mut(|engine| engine.rm_paths(text(path)?))
            .map_or(-1, as_rc)
    }

    fn mv(&mut self, src: &CStr, dst: &CStr) -> c_int {
        self.run_mut(|engine| engine.mv_path(text(src)?, text(dst)?))
            .map_or(-1, |()| 0)
    }

    fn insert(&mut self, path: &CStr, label: &CStr, before: bool) -> c_int {
        self.run_mut(|engine| engine.insert_path(text(path)?, text(label)?, before))
            .map_or(-1, |()| 0)
    }

    fn count(&self, path: &CStr) -> c_int {
        self.run(|| self.select(text(path)?))
            .map_or(-1, |nodes| as_rc(nodes.len()))
    }

    fn matches(&self, path: &CStr) -> (c_int, Vec<CString>) {
        match self.run(|| self.select(text(path)?)) {
            Some(nodes) => (
                as_rc(nodes.len()),
                nodes.into_iter().map(|id| c_string(self.tree.path(id))).collect(),
            ),
            None => (-1, Vec::new()),
        }
    }

    fn defvar(&mut self, name: &CStr, expr: Option<&CStr>) -> c_int {
        self.run_mut(|engine| engine.defvar_expr(text(name)?, opt_text(expr)?))
            .map_or(-1, as_rc)
    }

    fn defnode(&mut self, name: &CStr, expr: &CStr, value: Option<&CStr>) -> (c_int, bool) {
        self.run_mut(|engine| engine.defnode_expr(text(name)?, text(expr)?, opt_text(value)?))
            .map_or((-1, false), |(n, created)| (as_rc(n), created))
    }

    fn save(&mut self) -> c_int {
        self.run_mut(MemoryEngine::save_tree).map_or(-1, |()| 0)
    }

    fn load(&mut self) -> c_int {
        self.reset_error();
        self.load_tree();
        0
    }

    fn srun(&mut self, text_in: &CStr) -> io::Result<(c_int, String)> {
        let mut out = String::new();
        let end = self.run_mut(|engine| engine.run_script(text(text_in)?, &mut out));
        let rc = match end {
            Some(ScriptEnd::Completed(executed)) => as_rc(executed),
            Some(ScriptEnd::Quit) => -2,
            None => -1,
        };
        Ok((rc, out))
    }

    fn error_code(&self) -> c_int {
        self.error.borrow().code.code()
    }

    fn error_message(&self) -> Option<CString> {
        Some(c_string(message_for(self.error.borrow().code)))
    }

    fn error_minor_message(&self) -> Option<CString> {
        self.error.borrow().minor.clone()
    }

    fn error_details(&self) -> Option<CString> {
        self.error.borrow().details.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(text: &str) -> CString {
        CString::new(text).unwrap()
    }

    #[test]
    fn seeded_tree() {
        let engine = MemoryEngine::new();
        let (rc, value) = engine.get(&c("/augeas/version"));
        assert_eq!(rc, 1);
        assert_eq!(value.unwrap().to_str().unwrap(), MEMORY_VERSION);
        assert_eq!(engine.count(&c("/files")), 1);
    }

    #[test]
    fn set_creates_missing_steps() {
        let mut engine = MemoryEngine::new();
        assert_eq!(engine.set(&c("/files/etc/hosts/1/ipaddr"), Some(&c("127.0.0.1"))), 0);
        assert_eq!(engine.count(&c("/files/etc/hosts/1")), 1);
        assert_eq!(engine.error_code(), 0);
    }

    #[test]
    fn set_through_wildcard_without_match_fails() {
        let mut engine = MemoryEngine::new();
        assert_eq!(engine.set(&c("/files/*/x"), Some(&c("v"))), -1);
        assert_eq!(engine.error_code(), ErrorCode::PathExpression.code());
    }

    #[test]
    fn errors_reset_on_next_call() {
        let engine = MemoryEngine::new()
            .with_value("/a/b[1]", "1")
            .with_node("/a/b[last()+1]");
        assert_eq!(engine.get(&c("/a/b")).0, -1);
        assert_eq!(engine.error_code(), ErrorCode::MultipleMatches.code());
        assert_eq!(
            engine.error_minor_message().unwrap().to_str().unwrap(),
            "2 nodes"
        );
        assert_eq!(engine.get(&c("/a/b[1]")).0, 1);
        assert_eq!(engine.error_code(), 0);
    }

    #[test]
    fn relative_paths_resolve_under_files() {
        let engine = MemoryEngine::new().with_value("/files/etc/hosts/1/ipaddr", "10.0.0.1");
        let (rc, value) = engine.get(&c("etc/hosts/1/ipaddr"));
        assert_eq!(rc, 1);
        assert_eq!(value.unwrap().to_str().unwrap(), "10.0.0.1");
    }

    #[test]
    fn variables_track_removed_nodes() {
        let mut engine = MemoryEngine::new()
            .with_value("/t/a", "1")
            .with_value("/t/b", "2");
        assert_eq!(engine.defvar(&c("v"), Some(&c("/t/*"))), 2);
        assert_eq!(engine.rm(&c("/t/a")), 1);
        assert_eq!(engine.count(&c("$v")), 1);
        assert_eq!(engine.defvar(&c("v"), None), 0);
        assert_eq!(engine.count(&c("$v")), -1);
    }

    #[test]
    fn save_and_load_use_snapshot() {
        let mut engine = MemoryEngine::new().with_value("/files/a", "old");
        engine.set(&c("/files/a"), Some(&c("new")));
        assert_eq!(engine.saved_value("/files/a").as_deref(), Some("old"));

        engine.load();
        assert_eq!(engine.get(&c("/files/a")).1.unwrap().to_str().unwrap(), "old");

        engine.set(&c("/files/a"), Some(&c("new")));
        assert_eq!(engine.save(), 0);
        assert_eq!(engine.saved_value("/files/a").as_deref(), Some("new"));
        assert_eq!(engine.saves(), 1);
    }

    #[test]
    fn save_noop_keeps_disk() {
        let mut engine = MemoryEngine::new()
            .with_value("/files/a", "old")
            .with_flags(Flags::SAVE_NOOP);
        engine.set(&c("/files/a"), Some(&c("new")));
        assert_eq!(engine.save(), 0);
        assert_eq!(engine.saved_value("/files/a").as_deref(), Some("old"));
    }

    #[test]
    fn injected_save_failure() {
        let mut engine = MemoryEngine::new();
        engine.fail_next_save("disk full");
        assert_eq!(engine.save(), -1);
        assert_eq!(engine.error_code(), ErrorCode::Internal.code());
        assert_eq!(engine.error_minor_message().unwrap().to_str().unwrap(), "disk full");
        assert_eq!(engine.save(), 0);
    }

    #[test]
    fn script_output_and_counts() {
        let mut engine = MemoryEngine::new();
        let (rc, out) = engine.srun(&c("# setup\nset /t/x 1\n\nget /t/x\nget /t/y\nrm /t")).unwrap();
        assert_eq!(rc, 4);
        assert_eq!(out, "/t/x = 1\n/t/y (o)\nrm : /t 2\n");
    }

    #[test]
    fn script_errors_stop_execution() {
        let mut engine = MemoryEngine::new();
        let (rc, _) = engine.srun(&c("set /t/x 1\nbogus\nset /t/y 2")).unwrap();
        assert_eq!(rc, -1);
        assert_eq!(engine.error_code(), ErrorCode::CommandRun.code());
        assert_eq!(engine.count(&c("/t/y")), 0);
    }

    #[test]
    fn paths_lists_tree() {
        let engine = MemoryEngine::new().with_value("/files/a", "1");
        assert!(engine.paths().contains(&"/files/a".to_string()));
        assert!(engine.paths().contains(&"/augeas/version".to_string()));
    }
}
