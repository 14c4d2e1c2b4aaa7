use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use super::formats::{self, CodecError};
use super::layout::{SnapshotFormat, SnapshotLayout};
use crate::roads::model::DisruptionRecord;

/// Why one tier could not supply records.
#[derive(Debug, Error)]
pub enum CacheTierError {
    #[error("{path} does not exist")]
    Missing { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("{path} holds no records")]
    Empty { path: PathBuf },
}

/// Records recovered from the local cache and the tier that supplied them.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Resolution {
    pub records: Vec<DisruptionRecord>,
    /// `None` when every tier was unavailable.
    pub tier: Option<SnapshotFormat>,
}

/// Reads the latest snapshot files back, most faithful format first.
#[derive(Debug, Clone)]
pub struct CacheFallbackResolver {
    layout: SnapshotLayout,
}

impl CacheFallbackResolver {
    pub fn new(layout: SnapshotLayout) -> Self {
        Self { layout }
    }

    /// Tries JSON, then CSV, then XLSX. Never fails: when no tier yields a
    /// non-empty collection the resolution is empty.
    pub fn resolve(&self) -> Resolution {
        for format in SnapshotFormat::ALL {
            match self.read_tier(format) {
                Ok(records) => {
                    info!(
                        tier = format.tier(),
                        file = %self.layout.latest(format).display(),
                        records = records.len(),
                        "Loaded disruptions from cache"
                    );
                    return Resolution {
                        records,
                        tier: Some(format),
                    };
                }
                Err(e) => warn!(tier = format.tier(), "Cache tier unavailable: {}", e),
            }
        }

        warn!("No cache tier produced any disruptions");
        Resolution::default()
    }

    /// Reads a single tier. An empty collection counts as unavailable.
    pub fn read_tier(&self, format: SnapshotFormat) -> Result<Vec<DisruptionRecord>, CacheTierError> {
        let path = self.layout.latest(format);

        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CacheTierError::Missing { path });
            }
            Err(source) => return Err(CacheTierError::Io { path, source }),
        };

        let records = match formats::decode(format, &bytes) {
            Ok(records) => records,
            Err(source) => return Err(CacheTierError::Decode { path, source }),
        };

        if records.is_empty() {
            return Err(CacheTierError::Empty { path });
        }
        Ok(records)
    }
}
