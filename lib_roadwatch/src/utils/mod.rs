//! # Utilities Module
//!
//! General-purpose helpers shared by the snapshot writer and the archive
//! manager.
//!
//! ## Contained Modules:
//!
//! - **`atomic_file`**: replace a file's contents through a sibling temporary
//!   file and a rename, so readers only ever observe the previous complete
//!   contents or the new complete contents.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// All-or-nothing file replacement.
pub mod atomic_file;

pub use atomic_file::{copy_atomic, write_atomic, AtomicWriteError};
