//! # Snapshot Persistence Module
//!
//! Everything that touches the working directory.
//!
//! ## Purpose:
//! A run that resolved a non-empty record collection overwrites the three
//! "latest" snapshot files, then the archive manager copies whatever latest
//! files exist into `data/<YYYY-MM-DD>/` and updates `data/index.json`. When
//! the remote fetch yields nothing, the same files are read back, in priority
//! order, as the fallback dataset.
//!
//! ## Contained Modules:
//!
//! - **`layout`**: fixed file names and paths.
//! - **`formats`**: JSON, CSV and XLSX encoders/decoders.
//! - **`writer`**: [`SnapshotWriter`], one atomic write per format.
//! - **`fallback`**: [`CacheFallbackResolver`], JSON → CSV → XLSX.
//! - **`archive`**: [`ArchiveManager`] and the date manifest.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Dated archive directories and the manifest.
pub mod archive;
/// Tiered read-back of the latest snapshot files.
pub mod fallback;
/// Codecs for each interchange format.
pub mod formats;
/// File names and paths relative to the working directory.
pub mod layout;
/// Latest-snapshot writer.
pub mod writer;

pub use archive::{ArchiveError, ArchiveManager, ArchiveManifest, ArchiveReport};
pub use fallback::{CacheFallbackResolver, CacheTierError, Resolution};
pub use formats::CodecError;
pub use layout::{SnapshotFormat, SnapshotLayout};
pub use writer::{PersistenceError, SnapshotReport, SnapshotWriter};
