use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

/// Directory under the working directory that holds the dated archive.
pub const ARCHIVE_DIR: &str = "data";
/// Manifest file name inside [`ARCHIVE_DIR`].
pub const MANIFEST_FILE: &str = "index.json";

/// The supported interchange formats, in fallback priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotFormat {
    /// JSON array; preserves nested fields exactly.
    Json,
    /// CSV with a header row.
    Csv,
    /// Single-sheet XLSX workbook.
    Xlsx,
}

impl SnapshotFormat {
    /// Fallback priority: least lossy first.
    pub const ALL: [SnapshotFormat; 3] = [SnapshotFormat::Json, SnapshotFormat::Csv, SnapshotFormat::Xlsx];

    pub fn file_name(self) -> &'static str {
        match self {
            SnapshotFormat::Json => "disruptions.json",
            SnapshotFormat::Csv => "disruptions.csv",
            SnapshotFormat::Xlsx => "disruptions.xlsx",
        }
    }

    /// Tier name used in log lines.
    pub fn tier(self) -> &'static str {
        match self {
            SnapshotFormat::Json => "structured",
            SnapshotFormat::Csv => "tabular",
            SnapshotFormat::Xlsx => "spreadsheet",
        }
    }
}

impl fmt::Display for SnapshotFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Paths of every persisted artifact, relative to one working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotLayout {
    work_dir: PathBuf,
}

impl SnapshotLayout {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn latest(&self, format: SnapshotFormat) -> PathBuf {
        self.work_dir.join(format.file_name())
    }

    pub fn archive_root(&self) -> PathBuf {
        self.work_dir.join(ARCHIVE_DIR)
    }

    pub fn manifest(&self) -> PathBuf {
        self.archive_root().join(MANIFEST_FILE)
    }

    pub fn dated_dir(&self, date: NaiveDate) -> PathBuf {
        self.archive_root().join(date.format("%Y-%m-%d").to_string())
    }
}
