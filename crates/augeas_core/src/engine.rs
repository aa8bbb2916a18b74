//! The engine seam.

use std::ffi::{CStr, CString};
use std::io;
use std::os::raw::c_int;

/// One open handle of a tree-editing engine.
///
/// Methods mirror the engine's C entry points one to one and keep its
/// return-code protocol: the caller ([`crate::Augeas`]) interprets the codes
/// and queries the error accessors after a failure. Implementations never
/// interpret path expressions themselves unless they *are* the engine.
///
/// # Ownership
///
/// - [`Engine::get`] returns a value **borrowed** from the engine. It stays
///   valid until the next `&mut self` call, which the borrow checker enforces.
/// - [`Engine::matches`] returns **owned** strings. Implementations copy each
///   native string and release the native allocation before returning.
/// - The error accessors return **owned** copies, so an implementation may
///   record errors of `&self` queries behind interior mutability.
///
/// # Lifecycle
///
/// The handle is released in `Drop`, exactly once.
///
/// # Implementors
///
/// - `augeas_native::NativeEngine` - the system `libaugeas`
/// - `augeas_testkit::MemoryEngine` - an in-memory double for tests
pub trait Engine: Send {
    /// Reads the value of the single node matching `path`.
    ///
    /// Returns 1 and the value (possibly `None`) if exactly one node matches,
    /// 0 if none does, and a negative code if several match or the
    /// expression is invalid.
    fn get(&self, path: &CStr) -> (c_int, Option<&CStr>);

    /// Sets the value of the node matching `path`, creating it if needed.
    ///
    /// Returns 0 on success. Matching more than one node is an error.
    fn set(&mut self, path: &CStr, value: Option<&CStr>) -> c_int;

    /// Sets `sub` below every node matching `base`.
    ///
    /// Returns the number of modified nodes, or a negative code.
    fn setm(&mut self, base: &CStr, sub: Option<&CStr>, value: Option<&CStr>) -> c_int;

    /// Removes every node matching `path` and their descendants.
    ///
    /// Returns the number of removed nodes, or a negative code.
    fn rm(&mut self, path: &CStr) -> c_int;

    /// Moves the node matching `src` to `dst`.
    ///
    /// Returns 0 on success.
    fn mv(&mut self, src: &CStr, dst: &CStr) -> c_int;

    /// Inserts a sibling labelled `label` before or after the node matching `path`.
    ///
    /// Returns 0 on success.
    fn insert(&mut self, path: &CStr, label: &CStr, before: bool) -> c_int;

    /// Counts the nodes matching `path` without allocating.
    fn count(&self, path: &CStr) -> c_int;

    /// Lists the paths of the nodes matching `path`.
    ///
    /// Returns the count and the owned path strings.
    fn matches(&self, path: &CStr) -> (c_int, Vec<CString>);

    /// Defines (or, with `expr == None`, undefines) a variable.
    ///
    /// Returns 0 for a non-nodeset result, the node count for a nodeset,
    /// and -1 on error.
    fn defvar(&mut self, name: &CStr, expr: Option<&CStr>) -> c_int;

    /// Defines a variable holding the nodes matching `expr`, creating one
    /// node with `value` when nothing matches.
    ///
    /// Returns the node count (or -1) and whether a node was created.
    fn defnode(&mut self, name: &CStr, expr: &CStr, value: Option<&CStr>) -> (c_int, bool);

    /// Writes changed files to disk. Returns 0 on success.
    fn save(&mut self) -> c_int;

    /// Loads the configured files into the tree. Returns 0 on success.
    ///
    /// Per-file failures are recorded under `/augeas/files` and do not make
    /// the call fail.
    fn load(&mut self) -> c_int;

    /// Runs a command script.
    ///
    /// Returns the number of executed commands, -1 on error and -2 when
    /// the script hit `quit`, together with everything the commands printed.
    /// An `Err` means the output could not be captured and the engine was
    /// not called.
    fn srun(&mut self, text: &CStr) -> io::Result<(c_int, String)>;

    /// Error code of the most recent operation.
    fn error_code(&self) -> c_int;

    /// Primary error message of the most recent operation.
    fn error_message(&self) -> Option<CString>;

    /// Minor error message of the most recent operation.
    fn error_minor_message(&self) -> Option<CString>;

    /// Error details of the most recent operation.
    fn error_details(&self) -> Option<CString>;
}
