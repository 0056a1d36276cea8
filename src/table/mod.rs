//! Per-cycle tables
//!
//! A [`CycleTable`] is the rectangular projection of a [`CycleRecord`]:
//! one column per declared field, every column padded to the longest one.
//! Padding cells are `None` and render as an empty string, never as `0`.
//!
//! ```rust
//! use battery_soh::record::{CycleKind, CycleRecord, FieldSeries};
//! use battery_soh::table::CycleTable;
//!
//! let record = CycleRecord {
//!     kind: CycleKind::Impedance,
//!     start_time: "[]".into(),
//!     ambient_temperature: Some(24.0),
//!     fields: CycleKind::Impedance
//!         .fields()
//!         .iter()
//!         .map(|&name| FieldSeries { name, values: vec![1.0; name.len() % 3] })
//!         .collect(),
//!     capacity: None,
//!     re: None,
//!     rct: None,
//! };
//! let table = CycleTable::from_record(&record);
//! assert!(table.columns().iter().all(|c| c.cells.len() == table.num_rows()));
//! ```

use crate::metadata::MetadataIndex;
use crate::record::CycleRecord;
use crate::{Error, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Largest identifier that fits the fixed-width table names
pub const MAX_CYCLE_ID: u32 = 99_999;

/// Extension of per-cycle table artifacts
pub const TABLE_EXTENSION: &str = "csv";

/// One padded column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Field name
    pub name: &'static str,
    /// Samples, `None` for padding
    pub cells: Vec<Option<f64>>,
}

/// Rectangular table of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleTable {
    columns: Vec<Column>,
    num_rows: usize,
}

impl CycleTable {
    /// Pad every declared field of `record` to the longest field.
    #[must_use]
    pub fn from_record(record: &CycleRecord) -> Self {
        let num_rows = record.max_len();
        let columns = record
            .fields
            .iter()
            .map(|field| {
                let mut cells: Vec<Option<f64>> = field.values.iter().copied().map(Some).collect();
                cells.resize(num_rows, None);
                Column {
                    name: field.name,
                    cells,
                }
            })
            .collect();
        Self { columns, num_rows }
    }

    /// Columns in declared order
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in declared order
    #[must_use]
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Row count (longest field length)
    #[must_use]
    pub const fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Write the table as CSV, header first.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or written.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path.as_ref())?;
        writer.write_record(self.columns.iter().map(|c| c.name))?;
        for row in 0..self.num_rows {
            writer.write_record(self.columns.iter().map(|c| render_cell(c.cells[row])))?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn render_cell(cell: Option<f64>) -> String {
    cell.map(|v| v.to_string()).unwrap_or_default()
}

/// Artifact name of cycle `uid`, e.g. `00042.csv`
#[must_use]
pub fn table_filename(uid: u32) -> String {
    format!("{uid:05}.{TABLE_EXTENSION}")
}

/// Corpus-wide cycle identifier.
///
/// Threaded by `&mut` through extraction; never reset. A run over an existing
/// output directory resumes after the highest identifier already indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleIdCounter {
    next: u32,
}

impl Default for CycleIdCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleIdCounter {
    /// Counter starting at 1
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Counter starting at `next`
    #[must_use]
    pub const fn starting_at(next: u32) -> Self {
        Self { next }
    }

    /// Resume after the highest `uid` in the metadata index at `path`.
    ///
    /// # Errors
    ///
    /// Returns error if an existing index cannot be read.
    pub fn resume<P: AsRef<Path>>(path: P) -> Result<Self> {
        let last = MetadataIndex::new(path.as_ref()).max_uid()?;
        Ok(Self::starting_at(last.map_or(1, |uid| uid + 1)))
    }

    /// Identifier the next serialized cycle will receive
    #[must_use]
    pub const fn peek(&self) -> u32 {
        self.next
    }

    /// Take the next identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IdentifierExhausted`] past [`MAX_CYCLE_ID`].
    pub fn allocate(&mut self) -> Result<u32> {
        let uid = self.next;
        if uid > MAX_CYCLE_ID {
            return Err(Error::IdentifierExhausted(uid));
        }
        self.next += 1;
        Ok(uid)
    }
}

/// Writes per-cycle tables under a data directory.
#[derive(Debug, Clone)]
pub struct CycleSerializer {
    data_dir: PathBuf,
}

/// Where a serialized cycle landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedCycle {
    /// Global identifier
    pub uid: u32,
    /// Artifact name relative to the data directory
    pub filename: String,
    /// Table row count
    pub num_rows: usize,
}

impl CycleSerializer {
    /// Serializer writing into `data_dir`
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Data directory
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Rectangularize `record`, give it the next identifier and write it.
    ///
    /// # Errors
    ///
    /// Returns error if identifiers are exhausted or the table cannot be
    /// written.
    pub fn serialize(
        &self,
        record: &CycleRecord,
        counter: &mut CycleIdCounter,
    ) -> Result<SerializedCycle> {
        fs::create_dir_all(&self.data_dir)?;
        let table = CycleTable::from_record(record);
        let uid = counter.allocate()?;
        let filename = table_filename(uid);
        table.write_csv(self.data_dir.join(&filename))?;
        tracing::debug!(uid, file = %filename, kind = %record.kind, rows = table.num_rows(), "saved cycle table");
        Ok(SerializedCycle {
            uid,
            filename,
            num_rows: table.num_rows(),
        })
    }
}

/// Read a table's header, for checks and diagnostics.
///
/// # Errors
///
/// Returns error if the file cannot be opened or parsed.
pub fn read_header<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_reader(File::open(path.as_ref())?);
    Ok(reader.headers()?.iter().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{CycleKind, FieldSeries};

    #[allow(clippy::cast_precision_loss)]
    fn record(kind: CycleKind, lens: &[usize]) -> CycleRecord {
        let fields = kind
            .fields()
            .iter()
            .zip(lens)
            .map(|(&name, &len)| FieldSeries {
                name,
                values: (0..len).map(|i| i as f64 + 0.5).collect(),
            })
            .collect();
        CycleRecord {
            kind,
            start_time: "[]".to_string(),
            ambient_temperature: Some(24.0),
            fields,
            capacity: None,
            re: None,
            rct: None,
        }
    }

    #[test]
    fn test_padding_to_longest_column() {
        let table = CycleTable::from_record(&record(CycleKind::Charge, &[3, 1, 0, 3, 2, 3]));
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.column_names(), CycleKind::Charge.fields());
        for column in table.columns() {
            assert_eq!(column.cells.len(), 3);
        }
        assert_eq!(table.columns()[1].cells, vec![Some(0.5), None, None]);
        assert_eq!(table.columns()[2].cells, vec![None, None, None]);
    }

    #[test]
    fn test_empty_record_has_header_only() {
        let table = CycleTable::from_record(&record(CycleKind::Impedance, &[0, 0, 0, 0, 0]));
        assert_eq!(table.num_rows(), 0);
        assert_eq!(table.columns().len(), 5);
    }

    #[test]
    fn test_csv_padding_is_empty_string() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("00001.csv");
        CycleTable::from_record(&record(CycleKind::Impedance, &[2, 1, 0, 2, 2]))
            .write_csv(&path)
            .unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Sense_current,Battery_current,Current_ratio,Battery_impedance,Rectified_Impedance"
        );
        assert_eq!(lines[1], "0.5,0.5,,0.5,0.5");
        assert_eq!(lines[2], "1.5,,,1.5,1.5");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_table_filename_fixed_width() {
        assert_eq!(table_filename(1), "00001.csv");
        assert_eq!(table_filename(42), "00042.csv");
        assert_eq!(table_filename(99_999), "99999.csv");
    }

    #[test]
    fn test_counter_monotonic_and_bounded() {
        let mut counter = CycleIdCounter::new();
        assert_eq!(counter.allocate().unwrap(), 1);
        assert_eq!(counter.allocate().unwrap(), 2);
        assert_eq!(counter.peek(), 3);

        let mut last = CycleIdCounter::starting_at(MAX_CYCLE_ID);
        assert_eq!(last.allocate().unwrap(), MAX_CYCLE_ID);
        assert!(matches!(
            last.allocate().unwrap_err(),
            Error::IdentifierExhausted(100_000)
        ));
    }

    #[test]
    fn test_counter_resume_without_index() {
        let dir = tempfile::tempdir().unwrap();
        let counter = CycleIdCounter::resume(dir.path().join("metadata.csv")).unwrap();
        assert_eq!(counter.peek(), 1);
    }

    #[test]
    fn test_serializer_writes_and_advances() {
        let dir = tempfile::tempdir().unwrap();
        let serializer = CycleSerializer::new(dir.path().join("data"));
        let mut counter = CycleIdCounter::starting_at(7);

        let out = serializer
            .serialize(&record(CycleKind::Discharge, &[4, 4, 4, 4, 4, 4]), &mut counter)
            .unwrap();
        assert_eq!(out.uid, 7);
        assert_eq!(out.filename, "00007.csv");
        assert_eq!(out.num_rows, 4);
        assert_eq!(counter.peek(), 8);

        let header = read_header(serializer.data_dir().join("00007.csv")).unwrap();
        assert_eq!(header, CycleKind::Discharge.fields());
    }
}
