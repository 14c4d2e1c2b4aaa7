//! # Disruption Summaries
//!
//! Read-only views over a resolved record collection, for dashboards, charts
//! and maps. Nothing here mutates the records.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use tracing::debug;

use super::model::{Coordinates, DisruptionRecord};
use super::severity::SeverityCatalog;

/// Which records count as "severe".
///
/// The feed offers two plausible signals: the `severity` label and the numeric
/// `severityLevel`. The catalog does not guarantee that levels are monotonic
/// with real-world impact, so callers pick explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeverePolicy {
    /// `severity` equals the label exactly.
    Label(String),
    /// `severityLevel` is present and `<=` the cutoff.
    MaxLevel(i64),
}

impl Default for SeverePolicy {
    fn default() -> Self {
        SeverePolicy::Label("Serious".to_string())
    }
}

impl SeverePolicy {
    pub fn is_severe(&self, record: &DisruptionRecord) -> bool {
        match self {
            SeverePolicy::Label(label) => record.severity.as_deref() == Some(label.as_str()),
            SeverePolicy::MaxLevel(cutoff) => record.severity_level.is_some_and(|lvl| lvl <= *cutoff),
        }
    }
}

/// One row of a per-level breakdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelCount {
    pub severity_level: i64,
    /// `None` when the catalog has no entry for this level.
    pub description: Option<String>,
    pub count: usize,
}

/// Counts records by a string field, skipping records where it is absent.
/// Sorted by descending count, then label.
pub fn count_by<F>(records: &[DisruptionRecord], key: F) -> Vec<(String, usize)>
where
    F: Fn(&DisruptionRecord) -> Option<&str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        if let Some(k) = key(record) {
            *counts.entry(k).or_default() += 1;
        }
    }

    let mut out: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(k, n)| (k.to_string(), n))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

pub fn severity_counts(records: &[DisruptionRecord]) -> Vec<(String, usize)> {
    count_by(records, |r| r.severity.as_deref())
}

pub fn category_counts(records: &[DisruptionRecord]) -> Vec<(String, usize)> {
    count_by(records, |r| r.category.as_deref())
}

pub fn sub_category_counts(records: &[DisruptionRecord]) -> Vec<(String, usize)> {
    count_by(records, |r| r.sub_category.as_deref())
}

/// Counts per `severityLevel`, ascending by level, labelled from the catalog.
pub fn severity_level_counts(records: &[DisruptionRecord], catalog: &SeverityCatalog) -> Vec<LevelCount> {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for level in records.iter().filter_map(|r| r.severity_level) {
        *counts.entry(level).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(severity_level, count)| LevelCount {
            severity_level,
            description: catalog.describe(severity_level).map(str::to_string),
            count,
        })
        .collect()
}

pub fn severe<'a>(records: &'a [DisruptionRecord], policy: &SeverePolicy) -> Vec<&'a DisruptionRecord> {
    records.iter().filter(|r| policy.is_severe(r)).collect()
}

/// Records with a valid `point`. Malformed points are skipped (and logged);
/// the records themselves are untouched.
pub fn located(records: &[DisruptionRecord]) -> Vec<(&DisruptionRecord, Coordinates)> {
    records
        .iter()
        .filter_map(|record| match record.coordinates() {
            Ok(Some(coords)) => Some((record, coords)),
            Ok(None) => None,
            Err(e) => {
                debug!(id = %record.label(), error = %e, "Skipping malformed point");
                None
            }
        })
        .collect()
}

/// Number of disruptions starting on each calendar day (in the record's own
/// offset). Records without a parsable `startDateTime` are left out.
pub fn starts_per_day(records: &[DisruptionRecord]) -> Vec<(NaiveDate, usize)> {
    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for start in records.iter().filter_map(DisruptionRecord::start_time) {
        *counts.entry(start.date_naive()).or_default() += 1;
    }
    counts.into_iter().collect()
}
