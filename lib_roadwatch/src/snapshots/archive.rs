//! # Dated Archive
//!
//! `data/<YYYY-MM-DD>/` receives copies of the latest snapshot files (and any
//! configured extra artifacts), and `data/index.json` lists every archived
//! date, newest first. Re-running on the same day overwrites that day's copies
//! and leaves the manifest untouched.

use std::io;
use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::layout::{SnapshotFormat, SnapshotLayout};
use crate::utils::{copy_atomic, write_atomic, AtomicWriteError};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to create archive directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read manifest {path}: {source}")]
    ReadManifest {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("manifest {path} is not a JSON array of YYYY-MM-DD dates: {source}")]
    CorruptManifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode manifest: {0}")]
    EncodeManifest(#[source] serde_json::Error),

    #[error(transparent)]
    WriteManifest(#[from] AtomicWriteError),
}

/// Archived dates, strictly descending, no duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveManifest(Vec<NaiveDate>);

impl ArchiveManifest {
    /// Builds a normalized manifest from dates in any order.
    pub fn from_dates(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        let mut manifest = Self(dates.into_iter().collect());
        manifest.normalize();
        manifest
    }

    fn normalize(&mut self) {
        self.0.sort_unstable_by(|a, b| b.cmp(a));
        self.0.dedup();
    }

    /// Returns `true` when `date` was not already listed.
    pub fn insert(&mut self, date: NaiveDate) -> bool {
        match self.0.binary_search_by(|probe| date.cmp(probe)) {
            Ok(_) => false,
            Err(position) => {
                self.0.insert(position, date);
                true
            }
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.0
    }

    pub fn latest(&self) -> Option<NaiveDate> {
        self.0.first().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut out = serde_json::to_vec_pretty(&self.0)?;
        out.push(b'\n');
        Ok(out)
    }
}

/// What one archive pass did.
#[derive(Debug)]
pub struct ArchiveReport {
    pub date: NaiveDate,
    pub directory: PathBuf,
    pub copied: Vec<PathBuf>,
    /// Sources that did not exist.
    pub skipped: Vec<PathBuf>,
    /// Sources that existed but could not be copied.
    pub failed: Vec<AtomicWriteError>,
    pub manifest_changed: bool,
}

/// Copies the latest snapshots into a dated directory and keeps the manifest.
#[derive(Debug, Clone)]
pub struct ArchiveManager {
    layout: SnapshotLayout,
    artifacts: Vec<String>,
}

impl ArchiveManager {
    /// `artifacts` are extra file names, relative to the working directory,
    /// archived alongside the snapshots (rendered maps, reports, ...).
    pub fn new(layout: SnapshotLayout, artifacts: Vec<String>) -> Self {
        Self { layout, artifacts }
    }

    fn sources(&self) -> Vec<PathBuf> {
        SnapshotFormat::ALL
            .iter()
            .map(|&format| self.layout.latest(format))
            .chain(self.artifacts.iter().map(|name| self.layout.work_dir().join(name)))
            .collect()
    }

    pub fn archive(&self, today: NaiveDate) -> Result<ArchiveReport, ArchiveError> {
        let directory = self.layout.dated_dir(today);
        std::fs::create_dir_all(&directory).map_err(|source| ArchiveError::CreateDir {
            path: directory.clone(),
            source,
        })?;

        let mut report = ArchiveReport {
            date: today,
            directory: directory.clone(),
            copied: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            manifest_changed: false,
        };

        for source in self.sources() {
            let Some(name) = source.file_name() else {
                warn!(file = %source.display(), "Archive source has no file name; skipping");
                report.skipped.push(source);
                continue;
            };
            let dest = directory.join(name);

            if !source.is_file() {
                warn!(file = %source.display(), "Archive source missing; skipping");
                report.skipped.push(source);
                continue;
            }

            match copy_atomic(&source, &dest) {
                Ok(bytes) => {
                    debug!(from = %source.display(), to = %dest.display(), bytes, "Archived file");
                    report.copied.push(dest);
                }
                Err(e) => {
                    error!(file = %source.display(), "Archive copy failed: {}", e);
                    report.failed.push(e);
                }
            }
        }

        report.manifest_changed = self.update_manifest(today)?;

        info!(
            date = %today,
            directory = %directory.display(),
            copied = report.copied.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            manifest_changed = report.manifest_changed,
            "Archive pass complete"
        );
        Ok(report)
    }

    /// Reads `data/index.json`. Absent means empty; anything unparsable is an
    /// error so the history is never silently discarded.
    pub fn load_manifest(&self) -> Result<Option<Vec<NaiveDate>>, ArchiveError> {
        let path = self.layout.manifest();
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ArchiveError::ReadManifest { path, source }),
        };
        serde_json::from_slice::<Vec<NaiveDate>>(&bytes)
            .map(Some)
            .map_err(|source| ArchiveError::CorruptManifest { path, source })
    }

    fn update_manifest(&self, today: NaiveDate) -> Result<bool, ArchiveError> {
        let stored = self.load_manifest()?;

        let mut manifest = ArchiveManifest::from_dates(stored.iter().flatten().copied());
        manifest.insert(today);

        if stored.as_deref() == Some(manifest.dates()) {
            debug!(date = %today, "Manifest already up to date");
            return Ok(false);
        }

        let bytes = manifest.to_json().map_err(ArchiveError::EncodeManifest)?;
        write_atomic(&self.layout.manifest(), &bytes)?;
        info!(entries = manifest.len(), latest = ?manifest.latest(), "Manifest updated");
        Ok(true)
    }
}
