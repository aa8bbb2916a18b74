//! Python bindings for Augeas.
//!
//! This crate provides the `augeas` Python module using PyO3.
//!
//! Saves can run off the interpreter thread: `saveAsync(callback)` hands the
//! session to a worker and returns at once, and the module function
//! `run_pending()` runs finished callbacks on the calling thread. While a
//! save is in flight every other call on that instance raises
//! `AugeasError`.

use augeas_core::{
    create_options, AugError, CallbackErrors, ErrorCode, Flags, InitOptions, OptionValue,
    PersistBridge, Position, Script, SessionSlot,
};
use augeas_native::{NativeApi, NativeEngine};
use pyo3::create_exception;
use pyo3::exceptions::{PyException, PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Library version.
const VERSION: &str = env!("CARGO_PKG_VERSION");

create_exception!(augeas, AugeasError, PyException, "Error reported by Augeas.");
create_exception!(
    augeas,
    ScriptQuit,
    AugeasError,
    "Raised by srun() when the script stops at a quit command."
);

/// Completion queue shared by every instance in the process.
static BRIDGE: OnceLock<PersistBridge<NativeEngine>> = OnceLock::new();

/// Exceptions raised by save callbacks, re-raised by `run_pending`.
static CALLBACK_ERRORS: CallbackErrors<PyErr> = CallbackErrors::new();

fn bridge() -> &'static PersistBridge<NativeEngine> {
    BRIDGE.get_or_init(PersistBridge::new)
}

/// Script errors carry `(message, output)`, where `output` is what the
/// script printed before it stopped.
fn to_py(err: AugError) -> PyErr {
    let message = err.to_string();
    match err {
        AugError::InvalidArgument { .. } => PyValueError::new_err(message),
        AugError::ScriptQuit { output } => ScriptQuit::new_err((message, output)),
        AugError::Script { output, .. } => AugeasError::new_err((message, output)),
        _ => AugeasError::new_err(message),
    }
}

fn strings(value: &Bound<'_, PyAny>) -> PyResult<Vec<String>> {
    if let Ok(one) = value.extract::<String>() {
        return Ok(vec![one]);
    }
    value
        .extract::<Vec<String>>()
        .map_err(|_| PyTypeError::new_err("expected a string or a list of strings"))
}

fn script(value: &Bound<'_, PyAny>) -> PyResult<Script> {
    strings(value).map(Script::from_lines)
}

fn option_value(value: &Bound<'_, PyAny>) -> PyResult<OptionValue> {
    if let Ok(text) = value.extract::<String>() {
        return Ok(OptionValue::Text(text));
    }
    if let Ok(number) = value.extract::<u32>() {
        return Ok(OptionValue::Number(number));
    }
    if let Ok(lines) = value.extract::<Vec<String>>() {
        return Ok(OptionValue::Lines(lines));
    }
    if let Ok(path) = value.extract::<PathBuf>() {
        return Ok(OptionValue::Text(path.to_string_lossy().into_owned()));
    }
    Err(PyTypeError::new_err(
        "option values must be strings, lists of strings or integers",
    ))
}

fn option_record(dict: &Bound<'_, PyDict>) -> PyResult<Vec<(String, OptionValue)>> {
    let mut record = Vec::with_capacity(dict.len());
    for (key, value) in dict.iter() {
        if value.is_none() {
            continue;
        }
        record.push((key.extract()?, option_value(&value)?));
    }
    Ok(record)
}

/// An Augeas session.
///
/// The slot is empty while the session is held by an asynchronous save.
#[pyclass(name = "Augeas", module = "augeas")]
pub struct PyAugeas {
    slot: SessionSlot<NativeEngine>,
}

impl PyAugeas {
    fn open(options: &InitOptions) -> PyResult<Self> {
        let session = augeas_native::create(options).map_err(to_py)?;
        Ok(Self {
            slot: SessionSlot::new(session),
        })
    }

    fn with_session<T>(
        &self,
        f: impl FnOnce(&mut augeas_core::Augeas<NativeEngine>) -> Result<T, AugError>,
    ) -> PyResult<T> {
        self.slot.with(f).map_err(to_py)
    }
}

#[pymethods]
impl PyAugeas {
    /// Opens a session.
    #[new]
    #[pyo3(signature = (root=None, loadpath=None, flags=0))]
    fn new(root: Option<PathBuf>, loadpath: Option<String>, flags: u32) -> PyResult<Self> {
        Self::open(&create_options(None, root, loadpath, Some(flags)).map_err(to_py)?)
    }

    /// Returns the value of the node matching `path`, or None.
    fn get(&self, path: &str) -> PyResult<Option<String>> {
        self.with_session(|aug| aug.get(path))
    }

    /// Sets the node matching `path`, creating it if needed.
    #[pyo3(signature = (path, value=None))]
    fn set(&self, path: &str, value: Option<&str>) -> PyResult<()> {
        self.with_session(|aug| aug.set(path, value))
    }

    /// Sets `sub` below every node matching `base`; returns the number of
    /// changed nodes.
    #[pyo3(signature = (base, sub=None, value=None))]
    fn setm(&self, base: &str, sub: Option<&str>, value: Option<&str>) -> PyResult<u32> {
        self.with_session(|aug| aug.setm(base, sub, value))
    }

    /// Removes every node matching `path`; returns the number removed.
    fn rm(&self, path: &str) -> PyResult<u32> {
        self.with_session(|aug| aug.rm(path))
    }

    /// Moves the node matching `src` to `dst`.
    fn mv(&self, src: &str, dst: &str) -> PyResult<()> {
        self.with_session(|aug| aug.mv(src, dst))
    }

    /// Inserts a node labelled `label` next to the node matching `path`.
    #[pyo3(signature = (path, label, before=false))]
    fn insert(&self, path: &str, label: &str, before: bool) -> PyResult<()> {
        let position = if before {
            Position::Before
        } else {
            Position::After
        };
        self.with_session(|aug| aug.insert(path, label, position))
    }

    /// Inserts a node before the node matching `path`.
    #[pyo3(name = "insertBefore")]
    fn insert_before(&self, path: &str, label: &str) -> PyResult<()> {
        self.with_session(|aug| aug.insert_before(path, label))
    }

    /// Inserts a node after the node matching `path`.
    #[pyo3(name = "insertAfter")]
    fn insert_after(&self, path: &str, label: &str) -> PyResult<()> {
        self.with_session(|aug| aug.insert_after(path, label))
    }

    /// Writes changed files to disk. The interpreter lock is released
    /// while saving.
    fn save(&self, py: Python<'_>) -> PyResult<()> {
        let mut session = self.slot.take().map_err(to_py)?;
        let (session, result) = py.allow_threads(move || {
            let result = session.save();
            (session, result)
        });
        self.slot.restore(session);
        result.map_err(to_py)
    }

    /// Saves on a worker thread and returns immediately.
    ///
    /// `callback(rc)` runs from `run_pending()` with 0 on success and -1 on
    /// failure; `errorMsg()` describes the failure inside the callback. The
    /// instance raises `AugeasError` for any call until the callback runs.
    #[pyo3(name = "saveAsync")]
    fn save_async(&self, py: Python<'_>, callback: PyObject) -> PyResult<u64> {
        if !callback.bind(py).is_callable() {
            return Err(PyTypeError::new_err("callback must be callable"));
        }
        let ticket = self
            .slot
            .save_async(bridge(), move |rc| {
                Python::with_gil(|py| {
                    if let Err(err) = callback.call1(py, (rc,)) {
                        CALLBACK_ERRORS.push(err);
                    }
                });
            })
            .map_err(to_py)?;
        debug!("Save {} submitted", ticket.id());
        Ok(ticket.id())
    }

    /// Loads the configured files.
    fn load(&self) -> PyResult<()> {
        self.with_session(|aug| aug.load())
    }

    /// Counts the nodes matching `path`.
    fn nmatch(&self, path: &str) -> PyResult<u32> {
        self.with_session(|aug| aug.count(path))
    }

    /// Returns the paths of every node matching `path`.
    #[pyo3(name = "match")]
    fn matches(&self, path: &str) -> PyResult<Vec<String>> {
        self.with_session(|aug| aug.matches(path))
    }

    /// Defines a variable; without `expr` the variable is removed.
    #[pyo3(signature = (name, expr=None))]
    fn defvar(&self, name: &str, expr: Option<&str>) -> PyResult<u32> {
        self.with_session(|aug| aug.defvar(name, expr))
    }

    /// Defines a variable over the nodes matching `expr`, creating a node
    /// with `value` when none matches. `callback(created)` runs before the
    /// call returns.
    #[pyo3(signature = (name, expr, value=None, callback=None))]
    fn defnode(
        &self,
        py: Python<'_>,
        name: &str,
        expr: &str,
        value: Option<&str>,
        callback: Option<PyObject>,
    ) -> PyResult<u32> {
        let defined = self.with_session(|aug| aug.defnode(name, expr, value))?;
        // The slot is released so the callback may use this instance.
        if let Some(callback) = callback {
            callback.call1(py, (defined.created,))?;
        }
        Ok(defined.count)
    }

    /// Error code of the most recent call.
    fn error(&self) -> PyResult<i32> {
        self.with_session(|aug| Ok(aug.error().code()))
    }

    /// Error message of the most recent call, or None.
    #[pyo3(name = "errorMsg")]
    fn error_msg(&self) -> PyResult<Option<String>> {
        self.with_session(|aug| Ok(aug.error_message()))
    }

    /// Runs a command script given as text or as a list of lines.
    ///
    /// Returns `(executed, output)`. A `quit` command raises `ScriptQuit`
    /// and a failing command `AugeasError`; both carry
    /// `(message, output)` with what the script printed so far.
    fn srun(&self, text: &Bound<'_, PyAny>) -> PyResult<(u32, String)> {
        let script = script(text)?;
        let output = self.with_session(|aug| aug.srun(&script))?;
        Ok((output.executed, output.output))
    }

    /// Returns the recorded error of `file`, or None.
    #[pyo3(name = "fileErrorMsg")]
    fn file_error_msg(&self, file: &str) -> PyResult<Option<String>> {
        self.with_session(|aug| aug.file_error(file))
            .map(|error| error.map(|e| e.to_string()))
    }

    /// Returns one line per file with a recorded error.
    #[pyo3(name = "dumpFileErrors")]
    fn dump_file_errors(&self) -> PyResult<Vec<String>> {
        self.with_session(|aug| aug.file_errors())
            .map(|errors| errors.iter().map(ToString::to_string).collect())
    }

    fn __repr__(&self) -> String {
        if self.slot.is_busy() {
            "Augeas(<saving>)".to_string()
        } else {
            "Augeas()".to_string()
        }
    }
}

/// Creates a session from an options dict or positional arguments.
///
/// The dict accepts `root`, `loadpath`, `flags`, `lens`, `incl`, `excl`
/// and `srun`.
#[pyfunction]
#[pyo3(name = "createAugeas", signature = (options=None, loadpath=None, flags=None))]
fn create_augeas(
    options: Option<&Bound<'_, PyAny>>,
    loadpath: Option<String>,
    flags: Option<u32>,
) -> PyResult<PyAugeas> {
    let init = match options {
        Some(value) => match value.downcast::<PyDict>() {
            Ok(dict) => create_options(Some(option_record(dict)?), None, loadpath, flags),
            Err(_) => create_options(None, Some(value.extract()?), loadpath, flags),
        },
        None => create_options(None, None, loadpath, flags),
    }
    .map_err(to_py)?;
    PyAugeas::open(&init)
}

/// Runs callbacks of finished saves on the calling thread.
///
/// With `block=True`, waits until no save is in flight. Returns the number
/// of callbacks run; an exception raised by a callback is re-raised here.
#[pyfunction]
#[pyo3(signature = (block=false))]
fn run_pending(py: Python<'_>, block: bool) -> PyResult<usize> {
    py.allow_threads(|| CALLBACK_ERRORS.drive(bridge(), block))
}

/// Returns the binding version.
#[pyfunction]
fn version() -> &'static str {
    VERSION
}

/// Python module initialization.
#[pymodule]
fn augeas(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let py = m.py();
    bridge();
    if let Err(e) = NativeApi::shared() {
        warn!("libaugeas not available: {e}");
    }

    m.add_class::<PyAugeas>()?;
    m.add("AugeasError", py.get_type::<AugeasError>())?;
    m.add("ScriptQuit", py.get_type::<ScriptQuit>())?;
    for (name, flag) in Flags::NAMED {
        m.add(name, flag.bits())?;
    }
    for code in ErrorCode::ALL {
        m.add(code.name(), code.code())?;
    }
    m.add_function(wrap_pyfunction!(create_augeas, m)?)?;
    m.add_function(wrap_pyfunction!(run_pending, m)?)?;
    m.add_function(wrap_pyfunction!(version, m)?)?;
    Ok(())
}
