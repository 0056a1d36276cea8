//! Health feature dataset
//!
//! Accepted cycles contribute exactly `num_bins` [`HealthSample`] rows each.
//! The dataset is written as CSV, or as Parquet when the target path ends in
//! `.parquet`.

use crate::storage::StorageEngine;
use crate::Result;
use arrow::array::{ArrayRef, Float64Array, StringArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Columns of the health dataset, in order
pub const HEALTH_COLUMNS: [&str; 7] = [
    "Voltage_measured",
    "Current_measured",
    "Temperature_measured",
    "SoC",
    "cycle_number",
    "battery_id",
    "SoH",
];

/// One averaged bin of a discharge cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSample {
    /// Mean voltage (V)
    #[serde(rename = "Voltage_measured")]
    pub voltage_mean: f64,
    /// Mean current (A)
    #[serde(rename = "Current_measured")]
    pub current_mean: f64,
    /// Mean temperature (°C)
    #[serde(rename = "Temperature_measured")]
    pub temperature_mean: f64,
    /// Mean state of charge (%)
    #[serde(rename = "SoC")]
    pub soc_mean: f64,
    /// 1-based discharge count within the battery
    pub cycle_number: u32,
    /// Battery identifier
    pub battery_id: String,
    /// State of health of the cycle (%)
    #[serde(rename = "SoH")]
    pub soh: f64,
}

/// What the health stage left on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthArtifact {
    /// Dataset written
    Written {
        /// Artifact path
        path: PathBuf,
        /// Row count
        rows: usize,
    },
    /// No cycle was accepted; nothing was written
    NotProduced,
}

/// Concatenated samples of all accepted cycles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthDataset {
    samples: Vec<HealthSample>,
    cycles: usize,
}

impl HealthDataset {
    /// Empty dataset
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one accepted cycle's group.
    pub fn push_cycle(&mut self, samples: Vec<HealthSample>) {
        self.samples.extend(samples);
        self.cycles += 1;
    }

    /// All samples, in acceptance order
    #[must_use]
    pub fn samples(&self) -> &[HealthSample] {
        &self.samples
    }

    /// Number of accepted cycles
    #[must_use]
    pub const fn cycle_count(&self) -> usize {
        self.cycles
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no cycle was accepted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Arrow schema of the dataset
    #[must_use]
    pub fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new(HEALTH_COLUMNS[0], DataType::Float64, true),
            Field::new(HEALTH_COLUMNS[1], DataType::Float64, true),
            Field::new(HEALTH_COLUMNS[2], DataType::Float64, true),
            Field::new(HEALTH_COLUMNS[3], DataType::Float64, true),
            Field::new(HEALTH_COLUMNS[4], DataType::UInt32, false),
            Field::new(HEALTH_COLUMNS[5], DataType::Utf8, false),
            Field::new(HEALTH_COLUMNS[6], DataType::Float64, false),
        ]))
    }

    /// Columnar view of the samples.
    ///
    /// # Errors
    ///
    /// Returns error if Arrow rejects the batch.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let column = |f: fn(&HealthSample) -> f64| -> ArrayRef {
            Arc::new(Float64Array::from_iter_values(self.samples.iter().map(f)))
        };
        let cycle_numbers: ArrayRef = Arc::new(UInt32Array::from_iter_values(
            self.samples.iter().map(|s| s.cycle_number),
        ));
        let battery_ids: ArrayRef = Arc::new(StringArray::from_iter_values(
            self.samples.iter().map(|s| s.battery_id.as_str()),
        ));
        let batch = RecordBatch::try_new(
            Self::schema(),
            vec![
                column(|s| s.voltage_mean),
                column(|s| s.current_mean),
                column(|s| s.temperature_mean),
                column(|s| s.soc_mean),
                cycle_numbers,
                battery_ids,
                column(|s| s.soh),
            ],
        )?;
        Ok(batch)
    }

    /// Write the samples as CSV with a header row.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path.as_ref())?;
        for sample in &self.samples {
            writer.serialize(sample)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the samples as a single Parquet file.
    ///
    /// # Errors
    ///
    /// Returns error if the batch cannot be built or written.
    pub fn write_parquet<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut storage = StorageEngine::new(vec![]);
        storage.append_batch(self.to_record_batch()?)?;
        storage.write_parquet(path)
    }

    /// Write to `path`, picking the format from its extension.
    ///
    /// An empty dataset writes nothing and reports
    /// [`HealthArtifact::NotProduced`]; a dataset left at `path` by an
    /// earlier run is removed so the file never outlives the report.
    ///
    /// # Errors
    ///
    /// Returns error if the artifact cannot be written or a stale one cannot
    /// be removed.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<HealthArtifact> {
        let path = path.as_ref();
        if self.is_empty() {
            if path.is_file() {
                std::fs::remove_file(path)?;
                tracing::info!(path = %path.display(), "removed stale health dataset");
            }
            return Ok(HealthArtifact::NotProduced);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if path.extension().and_then(|e| e.to_str()) == Some("parquet") {
            self.write_parquet(path)?;
        } else {
            self.write_csv(path)?;
        }
        tracing::info!(path = %path.display(), rows = self.len(), cycles = self.cycles, "saved health dataset");
        Ok(HealthArtifact::Written {
            path: path.to_path_buf(),
            rows: self.len(),
        })
    }
}
