//! # Augeas Testkit
//!
//! Test utilities for the Augeas bindings.
//!
//! This crate provides:
//! - [`MemoryEngine`], an in-memory [`Engine`](augeas_core::Engine) for
//!   hosts without `libaugeas`
//! - Test fixtures and session helpers
//! - Property-based test generators using proptest
//!
//! The in-memory engine is a test double: it understands a small path
//! subset (see [`path`]) and keeps "disk" as a snapshot of its tree.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use augeas_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_session() {
//!     with_session(|aug| {
//!         aug.set("/files/etc/hosts/1/ipaddr", Some("127.0.0.1")).unwrap();
//!         // ... test operations
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod memory;
pub mod path;
pub mod script;
pub mod tree;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::memory::MemoryEngine;
}

pub use fixtures::*;
pub use generators::*;
pub use memory::{message_for, MemoryEngine, MEMORY_VERSION};
