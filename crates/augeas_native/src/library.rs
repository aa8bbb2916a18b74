//! Runtime loading of `libaugeas`.

use augeas_core::{AugError, AugResult};
use libloading::Library;
use std::ffi::OsString;
use std::os::raw::{c_char, c_int, c_uint};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// Environment variable naming the library file to load.
pub const LIBRARY_ENV: &str = "AUGEAS_LIBRARY";

/// Library names tried when [`LIBRARY_ENV`] is not set.
pub const DEFAULT_LIBRARY_NAMES: [&str; 4] = [
    "libaugeas.so.0",
    "libaugeas.so",
    "libaugeas.0.dylib",
    "libaugeas.dylib",
];

/// Opaque engine handle (`struct augeas`).
#[repr(C)]
pub struct RawAugeas {
    _private: [u8; 0],
}

type InitFn = unsafe extern "C" fn(*const c_char, *const c_char, c_uint) -> *mut RawAugeas;
type CloseFn = unsafe extern "C" fn(*mut RawAugeas);
type GetFn = unsafe extern "C" fn(*const RawAugeas, *const c_char, *mut *const c_char) -> c_int;
type SetFn = unsafe extern "C" fn(*mut RawAugeas, *const c_char, *const c_char) -> c_int;
type SetmFn =
    unsafe extern "C" fn(*mut RawAugeas, *const c_char, *const c_char, *const c_char) -> c_int;
type PathFn = unsafe extern "C" fn(*mut RawAugeas, *const c_char) -> c_int;
type MvFn = unsafe extern "C" fn(*mut RawAugeas, *const c_char, *const c_char) -> c_int;
type InsertFn = unsafe extern "C" fn(*mut RawAugeas, *const c_char, *const c_char, c_int) -> c_int;
type MatchFn =
    unsafe extern "C" fn(*const RawAugeas, *const c_char, *mut *mut *mut c_char) -> c_int;
type DefvarFn = unsafe extern "C" fn(*mut RawAugeas, *const c_char, *const c_char) -> c_int;
type DefnodeFn = unsafe extern "C" fn(
    *mut RawAugeas,
    *const c_char,
    *const c_char,
    *const c_char,
    *mut c_int,
) -> c_int;
type HandleFn = unsafe extern "C" fn(*mut RawAugeas) -> c_int;
type SrunFn = unsafe extern "C" fn(*mut RawAugeas, *mut libc::FILE, *const c_char) -> c_int;
type MessageFn = unsafe extern "C" fn(*mut RawAugeas) -> *const c_char;

const AUG_INIT: &[u8] = b"aug_init\0";
const AUG_CLOSE: &[u8] = b"aug_close\0";
const AUG_GET: &[u8] = b"aug_get\0";
const AUG_SET: &[u8] = b"aug_set\0";
const AUG_SETM: &[u8] = b"aug_setm\0";
const AUG_RM: &[u8] = b"aug_rm\0";
const AUG_MV: &[u8] = b"aug_mv\0";
const AUG_INSERT: &[u8] = b"aug_insert\0";
const AUG_MATCH: &[u8] = b"aug_match\0";
const AUG_DEFVAR: &[u8] = b"aug_defvar\0";
const AUG_DEFNODE: &[u8] = b"aug_defnode\0";
const AUG_SAVE: &[u8] = b"aug_save\0";
const AUG_LOAD: &[u8] = b"aug_load\0";
const AUG_SRUN: &[u8] = b"aug_srun\0";
const AUG_ERROR: &[u8] = b"aug_error\0";
const AUG_ERROR_MESSAGE: &[u8] = b"aug_error_message\0";
const AUG_ERROR_MINOR_MESSAGE: &[u8] = b"aug_error_minor_message\0";
const AUG_ERROR_DETAILS: &[u8] = b"aug_error_details\0";

/// Entry points resolved from an open `libaugeas`.
///
/// The function pointers stay valid as long as the library is loaded, which
/// is as long as this value lives. Every engine handle keeps an `Arc` to it.
pub struct NativeApi {
    pub(crate) init: InitFn,
    pub(crate) close: CloseFn,
    pub(crate) get: GetFn,
    pub(crate) set: SetFn,
    pub(crate) setm: SetmFn,
    pub(crate) rm: PathFn,
    pub(crate) mv: MvFn,
    pub(crate) insert: InsertFn,
    pub(crate) matches: MatchFn,
    pub(crate) defvar: DefvarFn,
    pub(crate) defnode: DefnodeFn,
    pub(crate) save: HandleFn,
    pub(crate) load: HandleFn,
    pub(crate) srun: SrunFn,
    pub(crate) error: HandleFn,
    pub(crate) error_message: MessageFn,
    pub(crate) error_minor_message: MessageFn,
    pub(crate) error_details: MessageFn,
    path: OsString,
    _library: Library,
}

static SHARED: OnceLock<Result<Arc<NativeApi>, String>> = OnceLock::new();

fn symbol<T: Copy>(library: &Library, name: &[u8]) -> AugResult<T> {
    // SAFETY: `T` is the function pointer type of the named C entry point.
    let symbol = unsafe { library.get::<T>(name) }.map_err(|e| {
        let name = String::from_utf8_lossy(&name[..name.len() - 1]);
        AugError::library(format!("missing symbol {name}: {e}"))
    })?;
    Ok(*symbol)
}

/// Returns the library names to try, in order.
pub fn library_candidates() -> Vec<OsString> {
    let mut candidates = Vec::new();
    if let Some(path) = std::env::var_os(LIBRARY_ENV).filter(|p| !p.is_empty()) {
        candidates.push(path);
    }
    candidates.extend(DEFAULT_LIBRARY_NAMES.iter().map(OsString::from));
    candidates
}

impl NativeApi {
    /// Returns the process-wide library, loading it on first use.
    ///
    /// A failed load is remembered; later calls return the same error.
    pub fn shared() -> AugResult<Arc<NativeApi>> {
        SHARED
            .get_or_init(|| Self::search().map(Arc::new).map_err(|e| e.to_string()))
            .clone()
            .map_err(AugError::library)
    }

    /// Loads the first library found in [`library_candidates`].
    pub fn search() -> AugResult<NativeApi> {
        let mut failures = Vec::new();
        for candidate in library_candidates() {
            match Self::open(Path::new(&candidate)) {
                Ok(api) => return Ok(api),
                Err(e) => {
                    debug!("{}: {e}", candidate.to_string_lossy());
                    failures.push(candidate.to_string_lossy().into_owned());
                }
            }
        }
        Err(AugError::library(format!(
            "not found (tried {}; set {LIBRARY_ENV} to the library path)",
            failures.join(", ")
        )))
    }

    /// Loads the library at `path` and resolves every entry point.
    pub fn open(path: &Path) -> AugResult<NativeApi> {
        // SAFETY: loading libaugeas runs no initialization routines with
        // preconditions on the caller.
        let library = unsafe { Library::new(path) }
            .map_err(|e| AugError::library(format!("{}: {e}", path.display())))?;

        let api = NativeApi {
            init: symbol(&library, AUG_INIT)?,
            close: symbol(&library, AUG_CLOSE)?,
            get: symbol(&library, AUG_GET)?,
            set: symbol(&library, AUG_SET)?,
            setm: symbol(&library, AUG_SETM)?,
            rm: symbol(&library, AUG_RM)?,
            mv: symbol(&library, AUG_MV)?,
            insert: symbol(&library, AUG_INSERT)?,
            matches: symbol(&library, AUG_MATCH)?,
            defvar: symbol(&library, AUG_DEFVAR)?,
            defnode: symbol(&library, AUG_DEFNODE)?,
            save: symbol(&library, AUG_SAVE)?,
            load: symbol(&library, AUG_LOAD)?,
            srun: symbol(&library, AUG_SRUN)?,
            error: symbol(&library, AUG_ERROR)?,
            error_message: symbol(&library, AUG_ERROR_MESSAGE)?,
            error_minor_message: symbol(&library, AUG_ERROR_MINOR_MESSAGE)?,
            error_details: symbol(&library, AUG_ERROR_DETAILS)?,
            path: path.as_os_str().to_owned(),
            _library: library,
        };
        info!("Loaded {}", path.display());
        Ok(api)
    }

    /// Path or name the library was loaded from.
    pub fn path(&self) -> &Path {
        Path::new(&self.path)
    }
}
