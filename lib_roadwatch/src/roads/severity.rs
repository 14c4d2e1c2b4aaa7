//! # Severity Catalog
//!
//! A static `severityLevel -> description` table loaded once at startup from a
//! YAML file (`road_severity_levels.yaml`) or its JSON equivalent. Both hold a
//! list of `{severityLevel, description}` entries.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read severity catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML severity catalog: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("Invalid JSON severity catalog: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityEntry {
    pub severity_level: i64,
    pub description: String,
}

/// Immutable lookup table. Construct it once and share it by reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeverityCatalog {
    entries: BTreeMap<i64, String>,
}

impl SeverityCatalog {
    /// Later entries win when a level appears twice.
    pub fn from_entries(entries: impl IntoIterator<Item = SeverityEntry>) -> Self {
        let mut map = BTreeMap::new();
        for entry in entries {
            if let Some(previous) = map.insert(entry.severity_level, entry.description.clone()) {
                warn!(
                    severity_level = entry.severity_level,
                    previous = %previous,
                    replacement = %entry.description,
                    "Duplicate severity level in catalog; keeping the later entry"
                );
            }
        }
        Self { entries: map }
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, CatalogError> {
        let entries: Vec<SeverityEntry> = serde_yml::from_str(text)?;
        Ok(Self::from_entries(entries))
    }

    pub fn from_json_str(text: &str) -> Result<Self, CatalogError> {
        let entries: Vec<SeverityEntry> = serde_json::from_str(text)?;
        Ok(Self::from_entries(entries))
    }

    /// Loads a catalog file; `.json` is parsed as JSON, anything else as YAML.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        }
    }

    pub fn describe(&self, severity_level: i64) -> Option<&str> {
        self.entries.get(&severity_level).map(String::as_str)
    }

    /// Entries in ascending level order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &str)> + '_ {
        self.entries.iter().map(|(level, desc)| (*level, desc.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
