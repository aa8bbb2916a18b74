//! Engine implementation over one native handle.

use crate::library::{NativeApi, RawAugeas};
use augeas_core::{AugError, AugResult, Augeas, Engine, Flags, InitOptions};
use std::ffi::{CStr, CString};
use std::io;
use std::os::raw::{c_char, c_int, c_void};
use std::path::Path;
use std::ptr;
use std::sync::Arc;
use tracing::{info, warn};

/// Size of the buffer used to drain script output.
const OUTPUT_CHUNK: usize = 4096;

/// One open `libaugeas` handle.
///
/// Created by [`NativeEngine::init`] or [`NativeEngine::open`]; closed with
/// `aug_close` when dropped. A handle that failed to initialize is never
/// returned.
pub struct NativeEngine {
    handle: *mut RawAugeas,
    api: Arc<NativeApi>,
}

// SAFETY: the engine handle has no thread affinity. It is used by one thread
// at a time, which `&mut self` on every mutating call and the lack of `Sync`
// guarantee.
unsafe impl Send for NativeEngine {}

fn opt_ptr(value: Option<&CStr>) -> *const c_char {
    value.map_or(ptr::null(), CStr::as_ptr)
}

/// Borrows a C string returned by the engine.
///
/// # Safety
///
/// `raw` must be null or point to a NUL-terminated string that lives at
/// least as long as `'a`.
unsafe fn borrowed<'a>(raw: *const c_char) -> Option<&'a CStr> {
    if raw.is_null() {
        None
    } else {
        Some(CStr::from_ptr(raw))
    }
}

impl NativeEngine {
    /// Opens a handle on the process-wide library.
    ///
    /// `NO_ERR_CLOSE` is always added so a failed initialization can be
    /// described; the handle is then closed and [`AugError::Init`] returned.
    pub fn init(root: Option<&Path>, loadpath: Option<&str>, flags: Flags) -> AugResult<Self> {
        let api = NativeApi::shared()?;
        Self::init_with(api, root, loadpath, flags)
    }

    /// Opens a handle on a specific library.
    pub fn init_with(
        api: Arc<NativeApi>,
        root: Option<&Path>,
        loadpath: Option<&str>,
        flags: Flags,
    ) -> AugResult<Self> {
        let root = root
            .map(|root| {
                root.to_str()
                    .ok_or_else(|| AugError::invalid_argument("root is not valid UTF-8"))
                    .and_then(|root| Ok(CString::new(root)?))
            })
            .transpose()?;
        let loadpath = loadpath.map(CString::new).transpose()?;
        let flags = flags | Flags::NO_ERR_CLOSE;

        // SAFETY: both strings are NUL-terminated or null.
        let handle = unsafe {
            (api.init)(
                opt_ptr(root.as_deref()),
                opt_ptr(loadpath.as_deref()),
                flags.bits(),
            )
        };
        if handle.is_null() {
            warn!("aug_init() returned no handle");
            return Err(AugError::init("out of memory"));
        }

        let session = Augeas::from_engine(NativeEngine { handle, api });
        if let Some(detail) = session.last_error() {
            let message = detail.compose();
            warn!("aug_init() failed: {message}");
            // Dropping the session closes the handle.
            return Err(AugError::init(message));
        }

        info!(
            "Opened handle (root={:?}, loadpath={:?}, flags={flags})",
            root, loadpath
        );
        Ok(session.into_engine())
    }

    /// Opens a handle from `options`.
    ///
    /// Only the root, load path and flags are used here; apply the lens and
    /// script with [`Augeas::configure`].
    pub fn open(options: &InitOptions) -> AugResult<Self> {
        Self::init(
            options.root.as_deref(),
            options.loadpath.as_deref(),
            options.effective_flags(),
        )
    }

    /// The library this handle was opened on.
    pub fn api(&self) -> &Arc<NativeApi> {
        &self.api
    }

    fn capture_output(&mut self, text: &CStr) -> io::Result<(c_int, String)> {
        // SAFETY: tmpfile has no preconditions.
        let out = unsafe { libc::tmpfile() };
        if out.is_null() {
            let err = io::Error::last_os_error();
            warn!("cannot create script output file: {err}");
            return Err(err);
        }

        // SAFETY: the handle is open, `out` is a writable stream and `text`
        // is NUL-terminated.
        let rc = unsafe { (self.api.srun)(self.handle, out, text.as_ptr()) };

        let mut output = Vec::new();
        let mut chunk = [0u8; OUTPUT_CHUNK];
        // SAFETY: `out` stays open until the fclose below and `chunk` is
        // valid for OUTPUT_CHUNK bytes.
        unsafe {
            libc::fflush(out);
            libc::rewind(out);
            loop {
                let read = libc::fread(chunk.as_mut_ptr().cast::<c_void>(), 1, OUTPUT_CHUNK, out);
                if read == 0 {
                    break;
                }
                output.extend_from_slice(&chunk[..read]);
            }
            libc::fclose(out);
        }
        Ok((rc, String::from_utf8_lossy(&output).into_owned()))
    }
}

impl Drop for NativeEngine {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            // SAFETY: the handle came from aug_init and is closed only here.
            unsafe { (self.api.close)(self.handle) };
            self.handle = ptr::null_mut();
        }
    }
}

impl Engine for NativeEngine {
    fn get(&self, path: &CStr) -> (c_int, Option<&CStr>) {
        let mut value: *const c_char = ptr::null();
        // SAFETY: the handle is open and `value` is a valid out pointer.
        let rc = unsafe { (self.api.get)(self.handle, path.as_ptr(), &mut value) };
        if rc != 1 {
            return (rc, None);
        }
        // SAFETY: the value is owned by the tree and stays valid until the
        // next mutating call, which needs `&mut self`.
        (rc, unsafe { borrowed(value) })
    }

    fn set(&mut self, path: &CStr, value: Option<&CStr>) -> c_int {
        // SAFETY: the handle is open and both strings are NUL-terminated or null.
        unsafe { (self.api.set)(self.handle, path.as_ptr(), opt_ptr(value)) }
    }

    fn setm(&mut self, base: &CStr, sub: Option<&CStr>, value: Option<&CStr>) -> c_int {
        // SAFETY: as for `set`.
        unsafe { (self.api.setm)(self.handle, base.as_ptr(), opt_ptr(sub), opt_ptr(value)) }
    }

    fn rm(&mut self, path: &CStr) -> c_int {
        // SAFETY: as for `set`.
        unsafe { (self.api.rm)(self.handle, path.as_ptr()) }
    }

    fn mv(&mut self, src: &CStr, dst: &CStr) -> c_int {
        // SAFETY: as for `set`.
        unsafe { (self.api.mv)(self.handle, src.as_ptr(), dst.as_ptr()) }
    }

    fn insert(&mut self, path: &CStr, label: &CStr, before: bool) -> c_int {
        // SAFETY: as for `set`.
        unsafe {
            (self.api.insert)(
                self.handle,
                path.as_ptr(),
                label.as_ptr(),
                c_int::from(before),
            )
        }
    }

    fn count(&self, path: &CStr) -> c_int {
        // SAFETY: aug_match accepts a null out pointer and only counts.
        unsafe { (self.api.matches)(self.handle, path.as_ptr(), ptr::null_mut()) }
    }

    fn matches(&self, path: &CStr) -> (c_int, Vec<CString>) {
        let mut raw: *mut *mut c_char = ptr::null_mut();
        // SAFETY: the handle is open and `raw` is a valid out pointer.
        let rc = unsafe { (self.api.matches)(self.handle, path.as_ptr(), &mut raw) };
        let mut paths = Vec::new();
        if raw.is_null() {
            return (rc, paths);
        }

        let len = usize::try_from(rc).unwrap_or(0);
        paths.reserve(len);
        // SAFETY: on success the engine returns an array of `rc` malloc'd
        // strings; each string and the array are ours to free.
        unsafe {
            for i in 0..len {
                let entry = *raw.add(i);
                if let Some(path) = borrowed(entry) {
                    paths.push(path.to_owned());
                }
                libc::free(entry.cast::<c_void>());
            }
            libc::free(raw.cast::<c_void>());
        }
        (rc, paths)
    }

    fn defvar(&mut self, name: &CStr, expr: Option<&CStr>) -> c_int {
        // SAFETY: as for `set`.
        unsafe { (self.api.defvar)(self.handle, name.as_ptr(), opt_ptr(expr)) }
    }

    fn defnode(&mut self, name: &CStr, expr: &CStr, value: Option<&CStr>) -> (c_int, bool) {
        let mut created: c_int = 0;
        // SAFETY: as for `set`; `created` is a valid out pointer.
        let rc = unsafe {
            (self.api.defnode)(
                self.handle,
                name.as_ptr(),
                expr.as_ptr(),
                opt_ptr(value),
                &mut created,
            )
        };
        (rc, created != 0)
    }

    fn save(&mut self) -> c_int {
        // SAFETY: the handle is open.
        unsafe { (self.api.save)(self.handle) }
    }

    fn load(&mut self) -> c_int {
        // SAFETY: the handle is open.
        unsafe { (self.api.load)(self.handle) }
    }

    fn srun(&mut self, text: &CStr) -> io::Result<(c_int, String)> {
        self.capture_output(text)
    }

    fn error_code(&self) -> c_int {
        // SAFETY: the handle is open; the query does not modify the tree.
        unsafe { (self.api.error)(self.handle) }
    }

    fn error_message(&self) -> Option<CString> {
        // SAFETY: the message is owned by the handle; it is copied before
        // any other call can invalidate it.
        let message = unsafe { borrowed((self.api.error_message)(self.handle)) };
        message.map(CStr::to_owned)
    }

    fn error_minor_message(&self) -> Option<CString> {
        // SAFETY: as for `error_message`.
        let message = unsafe { borrowed((self.api.error_minor_message)(self.handle)) };
        message.map(CStr::to_owned)
    }

    fn error_details(&self) -> Option<CString> {
        // SAFETY: as for `error_message`.
        let message = unsafe { borrowed((self.api.error_details)(self.handle)) };
        message.map(CStr::to_owned)
    }
}
