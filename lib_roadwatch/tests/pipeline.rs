//! End-to-end runs of the pipeline state machine.

mod common;

use chrono::NaiveDate;
use common::{config, ok, status, ScriptedTransport, TWO_RECORDS};
use lib_roadwatch::configs::Credentials;
use lib_roadwatch::snapshots::{ArchiveError, SnapshotFormat, SnapshotLayout};
use lib_roadwatch::{DisruptionRecord, Pipeline, PipelineError, RecordSource};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

#[tokio::test]
async fn fresh_records_are_persisted_and_archived() {
    let dir = tempfile::tempdir().unwrap();
    let layout = SnapshotLayout::new(dir.path());
    let pipeline = Pipeline::with_transport(ScriptedTransport::new([ok(TWO_RECORDS)]), &config(dir.path()));

    let report = pipeline.run(today()).await.unwrap();

    assert_eq!(report.source, RecordSource::Fresh);
    assert_eq!(report.records().len(), 2);
    assert_eq!(report.snapshot.as_ref().map(|s| s.written.len()), Some(3));
    assert_eq!(report.archive.copied.len(), 3);
    for format in SnapshotFormat::ALL {
        assert!(layout.dated_dir(today()).join(format.file_name()).is_file());
    }
}

#[tokio::test]
async fn empty_fetch_falls_back_to_cached_json() {
    let dir = tempfile::tempdir().unwrap();
    let layout = SnapshotLayout::new(dir.path());
    std::fs::write(layout.latest(SnapshotFormat::Json), TWO_RECORDS).unwrap();
    let cached: Vec<DisruptionRecord> = serde_json::from_str(TWO_RECORDS).unwrap();

    let pipeline = Pipeline::with_transport(ScriptedTransport::new([ok("[]")]), &config(dir.path()));
    let report = pipeline.run(today()).await.unwrap();

    assert_eq!(report.source, RecordSource::Cache(SnapshotFormat::Json));
    assert_eq!(report.records(), cached.as_slice());
    // Snapshots were rewritten from the cached collection.
    assert!(layout.latest(SnapshotFormat::Csv).is_file());
    assert!(layout.latest(SnapshotFormat::Xlsx).is_file());
    assert!(layout.dated_dir(today()).join("disruptions.json").is_file());
    assert_eq!(report.archive.copied.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn failed_fetch_without_cache_skips_persistence() {
    let dir = tempfile::tempdir().unwrap();
    let layout = SnapshotLayout::new(dir.path());
    let transport = ScriptedTransport::new([status(500), status(502), status(503)]);

    let report = Pipeline::with_transport(transport.clone(), &config(dir.path()))
        .run(today())
        .await
        .unwrap();

    assert_eq!(transport.calls(), 3);
    assert_eq!(report.source, RecordSource::None);
    assert!(report.records().is_empty());
    assert!(report.snapshot.is_none());
    for format in SnapshotFormat::ALL {
        assert!(!layout.latest(format).exists());
    }
    assert_eq!(report.archive.skipped.len(), 3);
    assert!(layout.dated_dir(today()).is_dir());
}

#[tokio::test]
async fn missing_key_aborts_before_any_stage() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.credentials = Credentials {
        app_id: None,
        app_key: "  ".to_string(),
    };
    let transport = ScriptedTransport::new([ok(TWO_RECORDS)]);

    let err = Pipeline::with_transport(transport.clone(), &config)
        .run(today())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Fetch(_)));
    assert_eq!(transport.calls(), 0);
    assert!(!SnapshotLayout::new(dir.path()).archive_root().exists());
}

#[tokio::test]
async fn corrupt_manifest_fails_after_snapshots_are_written() {
    let dir = tempfile::tempdir().unwrap();
    let layout = SnapshotLayout::new(dir.path());
    std::fs::create_dir_all(layout.archive_root()).unwrap();
    std::fs::write(layout.manifest(), b"{oops").unwrap();

    let err = Pipeline::with_transport(ScriptedTransport::new([ok(TWO_RECORDS)]), &config(dir.path()))
        .run(today())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Archive(ArchiveError::CorruptManifest { .. })));
    assert!(layout.latest(SnapshotFormat::Json).is_file());
}

#[tokio::test]
async fn production_pipeline_builds_from_config() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Pipeline::from_config(&config(dir.path())).is_ok());
}
