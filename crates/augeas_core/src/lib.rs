//! # Augeas Core
//!
//! Safe session API over an Augeas engine handle.
//!
//! This crate owns everything between a host and the engine except the
//! unsafe FFI itself:
//!
//! - [`Engine`] - the seam mirroring the engine's C return-code protocol
//! - [`Augeas`] - one session: argument conversion, return-code
//!   interpretation and error retrieval
//! - [`PersistBridge`] - runs blocking saves on worker threads and hands
//!   the result back to the host thread
//! - [`InitOptions`], [`Flags`], [`Script`] - configuration
//! - [`FileError`] - per-file load and save errors from `/augeas/files`
//! - [`SessionSlot`], [`create_options`] - plumbing for host-language bindings
//!
//! ## Design Principles
//!
//! - The engine owns the tree, path language and lenses; this crate never
//!   interprets path expressions
//! - Every failure code surfaces the engine's own error detail
//! - A handle is used by one thread at a time, enforced by ownership
//!
//! ## Example
//!
//! ```rust,ignore
//! use augeas_core::{Augeas, InitOptions};
//! use augeas_native::NativeEngine;
//!
//! let options = InitOptions::new().root("/").lens("Hosts").incl("/etc/hosts");
//! let mut aug = Augeas::from_engine(NativeEngine::open(&options)?);
//! aug.configure(&options)?;
//! for path in aug.matches("/files/etc/hosts/*/ipaddr")? {
//!     println!("{path} = {:?}", aug.get(&path)?);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bridge;
mod config;
mod engine;
mod error;
mod file_error;
mod flags;
mod host;
mod script;
mod session;

#[cfg(test)]
mod test_engine;

pub use bridge::{PersistBridge, SaveCallback, SaveState, SaveTicket, SubmitError, WORKER_NAME};
pub use config::{InitOptions, LENS_SUFFIX};
pub use engine::Engine;
pub use error::{AugError, AugResult, ErrorCode, ErrorDetail};
pub use file_error::{FileError, FILES_PREFIX};
pub use flags::Flags;
pub use host::{create_options, CallbackErrors, OptionValue, SessionSlot, SAVE_FAILED, SAVE_OK};
pub use script::{Script, ScriptSource};
pub use session::{Augeas, DefinedNode, Position, ScriptOutput};
