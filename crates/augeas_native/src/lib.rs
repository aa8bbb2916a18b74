//! # Augeas Native
//!
//! [`Engine`](augeas_core::Engine) implementation over the system
//! `libaugeas`.
//!
//! The library is opened at runtime, once per process, so binaries built
//! against this crate start on hosts without Augeas and report a
//! [`AugError::Library`](augeas_core::AugError::Library) error only when a
//! session is requested. Set `AUGEAS_LIBRARY` to load a specific file.
//!
//! All unsafe code of the workspace lives in this crate.

#![warn(missing_docs)]

mod engine;
mod library;

pub use engine::NativeEngine;
pub use library::{library_candidates, NativeApi, RawAugeas, DEFAULT_LIBRARY_NAMES, LIBRARY_ENV};

use augeas_core::{AugResult, Augeas, InitOptions};

/// Opens a session from `options` and applies its lens and setup script.
pub fn create(options: &InitOptions) -> AugResult<Augeas<NativeEngine>> {
    let mut session = Augeas::from_engine(NativeEngine::open(options)?);
    session.configure(options)?;
    Ok(session)
}
