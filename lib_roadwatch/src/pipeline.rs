//! # Pipeline
//!
//! One run: fetch → (cache fallback when the fetch yields nothing) → snapshot
//! write (only with a non-empty collection) → archive. Stages run
//! sequentially and are never retried as a whole.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, warn};

use crate::configs::PipelineConfig;
use crate::retrieve::ky_http::{ApiClient, HttpTransport};
use crate::roads::model::DisruptionRecord;
use crate::roads::tfl::{DisruptionFetcher, FetchError};
use crate::snapshots::{
    ArchiveError, ArchiveManager, ArchiveReport, CacheFallbackResolver, SnapshotFormat, SnapshotLayout,
    SnapshotReport, SnapshotWriter,
};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Where the run's records came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSource {
    Fresh,
    Cache(SnapshotFormat),
    /// Neither the API nor any cache tier had records.
    None,
}

#[derive(Debug)]
pub struct PipelineReport {
    pub records: Vec<DisruptionRecord>,
    pub source: RecordSource,
    /// `None` when there was nothing to persist.
    pub snapshot: Option<SnapshotReport>,
    pub archive: ArchiveReport,
}

impl PipelineReport {
    /// The resolved collection, for downstream consumers.
    pub fn records(&self) -> &[DisruptionRecord] {
        &self.records
    }
}

pub struct Pipeline<T = ApiClient> {
    fetcher: DisruptionFetcher<T>,
    resolver: CacheFallbackResolver,
    writer: SnapshotWriter,
    archive: ArchiveManager,
}

impl Pipeline<ApiClient> {
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let fetcher = DisruptionFetcher::from_config(config)?;
        Ok(Self::with_fetcher(fetcher, config))
    }
}

impl<T: HttpTransport> Pipeline<T> {
    pub fn with_transport(transport: T, config: &PipelineConfig) -> Self {
        Self::with_fetcher(DisruptionFetcher::with_transport(transport, config), config)
    }

    fn with_fetcher(fetcher: DisruptionFetcher<T>, config: &PipelineConfig) -> Self {
        let layout = SnapshotLayout::new(config.work_dir());
        Self {
            fetcher,
            resolver: CacheFallbackResolver::new(layout.clone()),
            writer: SnapshotWriter::new(layout.clone()),
            archive: ArchiveManager::new(layout, config.archive_artifacts.clone()),
        }
    }

    pub async fn run(&self, today: NaiveDate) -> Result<PipelineReport, PipelineError> {
        // 1. Fetch (configuration errors abort here, before any request)
        let fetched = self.fetcher.fetch().await?;

        // 2. Fallback
        let (records, source) = if !fetched.is_empty() {
            (fetched, RecordSource::Fresh)
        } else {
            warn!("No fresh disruptions; falling back to cached snapshots");
            let resolution = self.resolver.resolve();
            match resolution.tier {
                Some(tier) => (resolution.records, RecordSource::Cache(tier)),
                None => (Vec::new(), RecordSource::None),
            }
        };

        // 3. Persist
        let snapshot = if records.is_empty() {
            warn!("Nothing to persist; keeping existing snapshot files");
            None
        } else {
            Some(self.writer.write(&records))
        };

        // 4. Archive
        let archive = self.archive.archive(today)?;

        info!(
            source = ?source,
            records = records.len(),
            archived = archive.copied.len(),
            "Pipeline run finished"
        );

        Ok(PipelineReport {
            records,
            source,
            snapshot,
            archive,
        })
    }
}
