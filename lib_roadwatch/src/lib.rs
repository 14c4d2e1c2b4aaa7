//! # lib_roadwatch
//!
//! Shared library behind the `disruptions` executable. Each top-level folder is
//! gated by a Cargo feature of the same name; `full` (the default) enables all
//! of them.
//!
//! The flow of a run is `roads::tfl::apicall` (fetch) → `snapshots::fallback`
//! (when the fetch yields nothing) → `snapshots::writer` → `snapshots::archive`,
//! driven by [`pipeline::Pipeline`].

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

#[cfg(feature = "configs")]
pub mod configs;
#[cfg(feature = "loggers")]
pub mod loggers;
#[cfg(feature = "retrieve")]
pub mod retrieve;
#[cfg(feature = "roads")]
pub mod roads;
#[cfg(feature = "snapshots")]
pub mod snapshots;
#[cfg(feature = "utils")]
pub mod utils;

#[cfg(feature = "snapshots")]
pub mod pipeline;

#[cfg(feature = "snapshots")]
pub use pipeline::{Pipeline, PipelineError, PipelineReport, RecordSource};
#[cfg(feature = "roads")]
pub use roads::{DisruptionRecord, SeverityCatalog};
