//! # Road Disruption Domain Module
//!
//! Types and clients for the road disruption feed.
//!
//! ## Contained Modules:
//!
//! - **`model`**: [`DisruptionRecord`] and the validated [`Coordinates`] view of
//!   its `point` field.
//! - **`severity`**: the static [`SeverityCatalog`] lookup table.
//! - **`tfl`**: the retrying [`DisruptionFetcher`](tfl::DisruptionFetcher).
//! - **`summary`**: read-only aggregations handed to downstream presentation.
//!
//! The fetch/persist pipeline never interprets severity; it is carried as an
//! opaque field and only the `summary` helpers look at it.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Disruption record data model.
pub mod model;
/// Severity level → description catalog.
pub mod severity;
/// Counts, severe filters and coordinate extraction for downstream consumers.
pub mod summary;
/// Client for the TfL disruption listing endpoint.
pub mod tfl;

pub use model::{Coordinates, DisruptionRecord, PointError, KNOWN_FIELDS};
pub use severity::{CatalogError, SeverityCatalog, SeverityEntry};
pub use summary::SeverePolicy;
