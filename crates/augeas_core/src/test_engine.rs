//! Engine double answering every call with canned codes.

use crate::engine::Engine;
use crate::error::ErrorCode;
use std::cell::Cell;
use std::ffi::{CStr, CString};
use std::io;
use std::os::raw::c_int;
use std::thread;
use std::time::Duration;

#[derive(Default)]
pub(crate) struct Canned {
    pub(crate) rc: c_int,
    pub(crate) value: Option<CString>,
    pub(crate) paths: Vec<CString>,
    pub(crate) created: bool,
    pub(crate) output: String,
    pub(crate) code: c_int,
    pub(crate) message: Option<CString>,
    pub(crate) minor: Option<CString>,
    pub(crate) details: Option<CString>,
    pub(crate) calls: Cell<u32>,
    pub(crate) save_delay: Duration,
    pub(crate) save_panics: bool,
    pub(crate) capture_fails: bool,
}

impl Canned {
    pub(crate) fn returning(rc: c_int) -> Self {
        Self {
            rc,
            ..Self::default()
        }
    }

    pub(crate) fn failing(rc: c_int, code: ErrorCode, message: &str) -> Self {
        Self {
            rc,
            code: code.code(),
            message: Some(CString::new(message).unwrap()),
            ..Self::default()
        }
    }

    fn hit(&self) -> c_int {
        self.calls.set(self.calls.get() + 1);
        self.rc
    }
}

impl Engine for Canned {
    fn get(&self, _path: &CStr) -> (c_int, Option<&CStr>) {
        (self.hit(), self.value.as_deref())
    }
    fn set(&mut self, _path: &CStr, _value: Option<&CStr>) -> c_int {
        self.hit()
    }
    fn setm(&mut self, _base: &CStr, _sub: Option<&CStr>, _value: Option<&CStr>) -> c_int {
        self.hit()
    }
    fn rm(&mut self, _path: &CStr) -> c_int {
        self.hit()
    }
    fn mv(&mut self, _src: &CStr, _dst: &CStr) -> c_int {
        self.hit()
    }
    fn insert(&mut self, _path: &CStr, _label: &CStr, _before: bool) -> c_int {
        self.hit()
    }
    fn count(&self, _path: &CStr) -> c_int {
        self.hit()
    }
    fn matches(&self, _path: &CStr) -> (c_int, Vec<CString>) {
        (self.hit(), self.paths.clone())
    }
    fn defvar(&mut self, _name: &CStr, _expr: Option<&CStr>) -> c_int {
        self.hit()
    }
    fn defnode(&mut self, _name: &CStr, _expr: &CStr, _value: Option<&CStr>) -> (c_int, bool) {
        (self.hit(), self.created)
    }
    fn save(&mut self) -> c_int {
        thread::sleep(self.save_delay);
        if self.save_panics {
            panic!("engine crashed while saving");
        }
        self.hit()
    }
    fn load(&mut self) -> c_int {
        self.hit()
    }
    fn srun(&mut self, _text: &CStr) -> io::Result<(c_int, String)> {
        if self.capture_fails {
            return Err(io::Error::other("no temporary files"));
        }
        Ok((self.hit(), self.output.clone()))
    }
    fn error_code(&self) -> c_int {
        self.code
    }
    fn error_message(&self) -> Option<CString> {
        self.message.clone()
    }
    fn error_minor_message(&self) -> Option<CString> {
        self.minor.clone()
    }
    fn error_details(&self) -> Option<CString> {
        self.details.clone()
    }
}
