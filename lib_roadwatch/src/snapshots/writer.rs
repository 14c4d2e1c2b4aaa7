use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, info, warn};

use super::formats::{self, CodecError};
use super::layout::{SnapshotFormat, SnapshotLayout};
use crate::roads::model::DisruptionRecord;
use crate::utils::{write_atomic, AtomicWriteError};

/// A single format that could not be refreshed. The other formats are
/// unaffected and the previous file for this one is left in place.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to encode {format}: {source}")]
    Encode {
        format: SnapshotFormat,
        #[source]
        source: CodecError,
    },

    #[error("failed to write {format}: {source}")]
    Write {
        format: SnapshotFormat,
        #[source]
        source: AtomicWriteError,
    },
}

/// Outcome of one [`SnapshotWriter::write`] call.
#[derive(Debug, Default)]
pub struct SnapshotReport {
    pub written: Vec<(SnapshotFormat, PathBuf)>,
    pub failed: Vec<PersistenceError>,
}

impl SnapshotReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Overwrites the "latest" snapshot files.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    layout: SnapshotLayout,
}

impl SnapshotWriter {
    pub fn new(layout: SnapshotLayout) -> Self {
        Self { layout }
    }

    /// Writes every format independently. An empty collection is refused so a
    /// failed run can never blank out the last good snapshot.
    pub fn write(&self, records: &[DisruptionRecord]) -> SnapshotReport {
        let mut report = SnapshotReport::default();

        if records.is_empty() {
            warn!("Refusing to overwrite snapshots with an empty collection");
            return report;
        }

        for format in SnapshotFormat::ALL {
            let path = self.layout.latest(format);
            match self.write_one(format, records) {
                Ok(()) => {
                    info!(
                        tier = format.tier(),
                        file = %path.display(),
                        records = records.len(),
                        "Snapshot written"
                    );
                    report.written.push((format, path));
                }
                Err(e) => {
                    error!(tier = format.tier(), file = %path.display(), "{}", e);
                    report.failed.push(e);
                }
            }
        }

        report
    }

    fn write_one(&self, format: SnapshotFormat, records: &[DisruptionRecord]) -> Result<(), PersistenceError> {
        let bytes = formats::encode(format, records)
            .map_err(|source| PersistenceError::Encode { format, source })?;
        write_atomic(&self.layout.latest(format), &bytes)
            .map_err(|source| PersistenceError::Write { format, source })
    }
}
