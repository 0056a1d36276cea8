//! Corpus-wide metadata index
//!
//! One row per serialized cycle, appended across batteries and across runs.
//! The header is written only when the index file is created.

use crate::record::{CycleKind, CycleRecord};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Columns of the metadata index, in order
pub const METADATA_COLUMNS: [&str; 10] = [
    "type",
    "start_time",
    "ambient_temperature",
    "battery_id",
    "test_id",
    "uid",
    "filename",
    "Capacity",
    "Re",
    "Rct",
];

/// Summary of one serialized cycle.
///
/// Field order matches [`METADATA_COLUMNS`]; optional scalars serialize as
/// empty cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRow {
    /// Cycle kind
    #[serde(rename = "type")]
    pub kind: CycleKind,
    /// Formatted start time
    pub start_time: String,
    /// Ambient temperature in °C
    pub ambient_temperature: Option<f64>,
    /// Battery identifier
    pub battery_id: String,
    /// 0-based position among the battery's serialized cycles
    pub test_id: u32,
    /// Corpus-wide identifier
    pub uid: u32,
    /// Per-cycle table name
    pub filename: String,
    /// Measured capacity (discharge only)
    #[serde(rename = "Capacity")]
    pub capacity: Option<f64>,
    /// Electrolyte resistance (impedance only)
    #[serde(rename = "Re")]
    pub re: Option<f64>,
    /// Charge transfer resistance (impedance only)
    #[serde(rename = "Rct")]
    pub rct: Option<f64>,
}

impl MetadataRow {
    /// Row for a serialized cycle.
    #[must_use]
    pub fn from_cycle(
        record: &CycleRecord,
        battery_id: &str,
        test_id: u32,
        uid: u32,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            kind: record.kind,
            start_time: record.start_time.clone(),
            ambient_temperature: record.ambient_temperature,
            battery_id: battery_id.to_string(),
            test_id,
            uid,
            filename: filename.into(),
            capacity: record.capacity,
            re: record.re,
            rct: record.rct,
        }
    }
}

/// Append-only metadata index on disk.
#[derive(Debug, Clone)]
pub struct MetadataIndex {
    path: PathBuf,
}

impl MetadataIndex {
    /// Index stored at `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Index location
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the index file exists
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Append rows, writing the header only if the file is new.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened or written.
    pub fn append(&self, rows: &[MetadataRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let write_header = !self.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        tracing::info!(path = %self.path.display(), rows = rows.len(), "metadata appended");
        Ok(())
    }

    /// Read every row in file order. A missing index reads as empty.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be parsed.
    pub fn read_all(&self) -> Result<Vec<MetadataRow>> {
        if !self.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_reader(File::open(&self.path)?);
        let mut rows = Vec::new();
        for row in reader.deserialize() {
            rows.push(row?);
        }
        Ok(rows)
    }

    /// Highest `uid` recorded, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be parsed.
    pub fn max_uid(&self) -> Result<Option<u32>> {
        Ok(self.read_all()?.iter().map(|row| row.uid).max())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(kind: CycleKind, battery_id: &str, test_id: u32, uid: u32) -> MetadataRow {
        MetadataRow {
            kind,
            start_time: "[2008. 4. 2. 0. 0. 0.000]".to_string(),
            ambient_temperature: Some(24.0),
            battery_id: battery_id.to_string(),
            test_id,
            uid,
            filename: crate::table::table_filename(uid),
            capacity: (kind == CycleKind::Discharge).then_some(1.85),
            re: (kind == CycleKind::Impedance).then_some(0.05),
            rct: (kind == CycleKind::Impedance).then_some(0.08),
        }
    }

    #[test]
    fn test_header_matches_columns() {
        let dir = tempfile::tempdir().unwrap();
        let index = MetadataIndex::new(dir.path().join("metadata.csv"));
        index.append(&[row(CycleKind::Charge, "B0005", 0, 1)]).unwrap();

        let text = std::fs::read_to_string(index.path()).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(header, METADATA_COLUMNS.join(","));
    }

    #[test]
    fn test_optional_scalars_are_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        let index = MetadataIndex::new(dir.path().join("metadata.csv"));
        index.append(&[row(CycleKind::Charge, "B0005", 0, 1)]).unwrap();

        let text = std::fs::read_to_string(index.path()).unwrap();
        let line = text.lines().nth(1).unwrap();
        assert!(line.ends_with("00001.csv,,,"), "got {line}");
    }

    #[test]
    fn test_append_skips_header_on_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let index = MetadataIndex::new(dir.path().join("metadata.csv"));
        index.append(&[row(CycleKind::Discharge, "B0005", 0, 1)]).unwrap();
        index.append(&[row(CycleKind::Impedance, "B0006", 0, 2)]).unwrap();

        let text = std::fs::read_to_string(index.path()).unwrap();
        assert_eq!(text.matches("battery_id").count(), 1);

        let rows = index.read_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].capacity, Some(1.85));
        assert_eq!(rows[1].re, Some(0.05));
        assert_eq!(rows[1].capacity, None);
    }

    #[test]
    fn test_empty_append_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let index = MetadataIndex::new(dir.path().join("metadata.csv"));
        index.append(&[]).unwrap();
        assert!(!index.exists());
    }

    #[test]
    fn test_max_uid() {
        let dir = tempfile::tempdir().unwrap();
        let index = MetadataIndex::new(dir.path().join("metadata.csv"));
        assert_eq!(index.max_uid().unwrap(), None);
        index
            .append(&[
                row(CycleKind::Charge, "B0005", 0, 4),
                row(CycleKind::Discharge, "B0005", 1, 9),
            ])
            .unwrap();
        assert_eq!(index.max_uid().unwrap(), Some(9));
    }
}
