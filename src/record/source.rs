//! Raw record sources

use super::RawBattery;
use crate::{Error, Result};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Batteries whose recordings are known to be corrupted. Never extracted.
pub const EXCLUDED_BATTERIES: [&str; 4] = ["B0049", "B0050", "B0051", "B0052"];

/// Provider of per-battery raw records.
///
/// Implementations decode whatever on-disk format they own; the pipeline
/// only sees [`RawBattery`] values.
pub trait RecordSource {
    /// Battery identifiers in processing order, exclusions already removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorpusSourceMissing`] when the corpus is unreachable.
    fn battery_ids(&self) -> Result<Vec<String>>;

    /// Load one battery's record.
    ///
    /// # Errors
    ///
    /// Returns error if the record cannot be read or decoded.
    fn load(&self, battery_id: &str) -> Result<RawBattery>;
}

/// Whether `battery_id` is on the exclusion list
#[must_use]
pub fn is_excluded(battery_id: &str) -> bool {
    EXCLUDED_BATTERIES.contains(&battery_id)
}

/// Directory of `<battery_id>.json` documents.
#[derive(Debug, Clone)]
pub struct JsonDirSource {
    root: PathBuf,
}

impl JsonDirSource {
    /// Extension of the raw documents
    pub const EXTENSION: &'static str = "json";

    /// Source over `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Corpus directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, battery_id: &str) -> PathBuf {
        self.root.join(format!("{battery_id}.{}", Self::EXTENSION))
    }
}

impl RecordSource for JsonDirSource {
    fn battery_ids(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Err(Error::CorpusSourceMissing(self.root.clone()));
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(Self::EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if is_excluded(stem) {
                tracing::info!(battery_id = stem, "skipping excluded battery");
                continue;
            }
            ids.push(stem.to_string());
        }
        ids.sort();
        Ok(ids)
    }

    fn load(&self, battery_id: &str) -> Result<RawBattery> {
        let file = File::open(self.path_for(battery_id))?;
        let raw = serde_json::from_reader(BufReader::new(file))?;
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_missing_root_is_corpus_error() {
        let source = JsonDirSource::new("/nonexistent/battery/corpus");
        let err = source.battery_ids().unwrap_err();
        assert!(matches!(err, Error::CorpusSourceMissing(_)));
    }

    #[test]
    fn test_ids_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "B0007.json", "{}");
        touch(dir.path(), "B0005.json", "{}");
        touch(dir.path(), "B0050.json", "{}");
        touch(dir.path(), "README.txt", "notes");

        let ids = JsonDirSource::new(dir.path()).battery_ids().unwrap();
        assert_eq!(ids, vec!["B0005", "B0007"]);
    }

    #[test]
    fn test_exclusion_list() {
        for id in EXCLUDED_BATTERIES {
            assert!(is_excluded(id));
        }
        assert!(!is_excluded("B0005"));
    }

    #[test]
    fn test_load_document() {
        let dir = tempfile::tempdir().unwrap();
        touch(
            dir.path(),
            "B0005.json",
            r#"{"cycles": [{"type": "charge", "data": {"Time": [0, 1]}}]}"#,
        );
        let raw = JsonDirSource::new(dir.path()).load("B0005").unwrap();
        assert_eq!(raw.cycles.len(), 1);
        assert_eq!(raw.cycles[0].kind.as_str(), Some("charge"));
    }

    #[test]
    fn test_load_malformed_document() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "B0006.json", "{not json");
        let err = JsonDirSource::new(dir.path()).load("B0006").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
