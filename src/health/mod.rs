//! State-of-health estimation
//!
//! For every discharge cycle in the metadata index:
//!
//! ```text
//! table ──> cut at first V < cutoff ──> ΔQ = I·Δt[h] ──> capacity = |ΣΔQ|
//!       ──> reject if capacity <= min_capacity
//!       ──> SoC = (1 + cumΔQ / capacity)·100,  SoH = capacity / nominal·100
//!       ──> num_bins row-count bins ──> one averaged HealthSample per bin
//! ```
//!
//! Padding cells read back as NaN. Sums and means skip NaN; a time delta that
//! touches NaN counts as zero hours.

pub mod dataset;

pub use dataset::{HealthArtifact, HealthDataset, HealthSample, HEALTH_COLUMNS};

use crate::config::HealthConfig;
use crate::{Error, Result};
use std::fs::File;
use std::ops::Range;
use std::path::Path;

/// Seconds per hour, for Δt in hours
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Columns the estimator reads from a discharge table
pub const REQUIRED_COLUMNS: [&str; 4] = [
    "Voltage_measured",
    "Current_measured",
    "Temperature_measured",
    "Time",
];

/// Measured series of one discharge cycle.
///
/// All four columns always hold the same number of samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DischargeSeries {
    voltage: Vec<f64>,
    current: Vec<f64>,
    temperature: Vec<f64>,
    time: Vec<f64>,
}

impl DischargeSeries {
    /// Series from voltage (V), current (A, negative while discharging),
    /// cell temperature (°C) and elapsed time (s).
    ///
    /// # Errors
    ///
    /// Returns [`Error::SeriesLengthMismatch`] unless every column is as long
    /// as `voltage`.
    pub fn new(
        voltage: Vec<f64>,
        current: Vec<f64>,
        temperature: Vec<f64>,
        time: Vec<f64>,
    ) -> Result<Self> {
        let expected = voltage.len();
        for (column, found) in [
            (REQUIRED_COLUMNS[1], current.len()),
            (REQUIRED_COLUMNS[2], temperature.len()),
            (REQUIRED_COLUMNS[3], time.len()),
        ] {
            if found != expected {
                return Err(Error::SeriesLengthMismatch {
                    column: column.to_string(),
                    expected,
                    found,
                });
            }
        }
        Ok(Self {
            voltage,
            current,
            temperature,
            time,
        })
    }

    /// Terminal voltage (V)
    #[must_use]
    pub fn voltage(&self) -> &[f64] {
        &self.voltage
    }

    /// Current (A)
    #[must_use]
    pub fn current(&self) -> &[f64] {
        &self.current
    }

    /// Cell temperature (°C)
    #[must_use]
    pub fn temperature(&self) -> &[f64] {
        &self.temperature
    }

    /// Elapsed time (s)
    #[must_use]
    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// Read the required columns of a per-cycle table. Empty cells become NaN.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingColumn`] for an absent column,
    /// [`Error::InvalidCell`] for non-numeric text, or an IO/CSV error.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_reader(File::open(path)?);
        let headers = reader.headers()?.clone();

        let mut positions = [0usize; REQUIRED_COLUMNS.len()];
        for (slot, column) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = headers
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| Error::MissingColumn {
                    column: column.to_string(),
                    file: path.to_path_buf(),
                })?;
        }

        let mut series = Self::default();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let mut values = [f64::NAN; REQUIRED_COLUMNS.len()];
            for ((value, &pos), column) in values.iter_mut().zip(&positions).zip(REQUIRED_COLUMNS) {
                *value = parse_cell(record.get(pos).unwrap_or(""), column, row)?;
            }
            let [voltage, current, temperature, time] = values;
            series.voltage.push(voltage);
            series.current.push(current);
            series.temperature.push(temperature);
            series.time.push(time);
        }
        Ok(series)
    }

    /// Number of samples
    #[must_use]
    pub fn len(&self) -> usize {
        self.voltage.len()
    }

    /// Whether the series has no samples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.voltage.is_empty()
    }

    /// Keep only the first `len` samples.
    pub fn truncate(&mut self, len: usize) {
        self.voltage.truncate(len);
        self.current.truncate(len);
        self.temperature.truncate(len);
        self.time.truncate(len);
    }
}

fn parse_cell(text: &str, column: &str, row: usize) -> Result<f64> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(f64::NAN);
    }
    text.parse().map_err(|_| Error::InvalidCell {
        column: column.to_string(),
        row,
        value: text.to_string(),
    })
}

/// Index of the first sample strictly below `cutoff`. NaN never qualifies.
#[must_use]
pub fn cutoff_index(voltage: &[f64], cutoff: f64) -> Option<usize> {
    voltage.iter().position(|&v| v < cutoff)
}

/// Per-sample elapsed hours; the first sample and any NaN delta are 0.
#[must_use]
pub fn elapsed_hours(time: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(time.len());
    let mut previous: Option<f64> = None;
    for &t in time {
        let delta = previous.map_or(0.0, |p| (t - p) / SECONDS_PER_HOUR);
        out.push(if delta.is_nan() { 0.0 } else { delta });
        previous = Some(t);
    }
    out
}

/// Incremental charge transfer `I·Δt` (Ah), sign preserved.
#[must_use]
pub fn charge_increments(current: &[f64], hours: &[f64]) -> Vec<f64> {
    current.iter().zip(hours).map(|(i, dt)| i * dt).collect()
}

/// Integrated capacity `|ΣΔQ|` (Ah), NaN increments skipped.
#[must_use]
pub fn integrated_capacity(increments: &[f64]) -> f64 {
    nan_sum(increments).abs()
}

/// SoC (%) per sample: `(1 + cumulative ΔQ / capacity)·100`.
///
/// The running total skips NaN increments; their own SoC stays NaN.
#[must_use]
pub fn state_of_charge(increments: &[f64], capacity: f64) -> Vec<f64> {
    let mut cumulative = 0.0;
    increments
        .iter()
        .map(|&dq| {
            if dq.is_nan() {
                return f64::NAN;
            }
            cumulative += dq;
            (1.0 + cumulative / capacity) * 100.0
        })
        .collect()
}

/// Split `len` rows into `num_bins` contiguous ranges whose sizes differ by
/// at most one; the first `len % num_bins` ranges take the extra row.
/// Ranges are empty when `len < num_bins`.
#[must_use]
pub fn bin_ranges(len: usize, num_bins: usize) -> Vec<Range<usize>> {
    if num_bins == 0 {
        return Vec::new();
    }
    let base = len / num_bins;
    let extra = len % num_bins;
    let mut start = 0;
    (0..num_bins)
        .map(|bin| {
            let size = base + usize::from(bin < extra);
            let range = start..start + size;
            start += size;
            range
        })
        .collect()
}

/// Sum ignoring NaN
#[must_use]
pub fn nan_sum(values: &[f64]) -> f64 {
    values.iter().filter(|v| !v.is_nan()).sum()
}

/// Mean ignoring NaN; NaN when every value is NaN
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn nan_mean(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), &v| (s + v, n + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Result of estimating one discharge cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleEstimate {
    /// Exactly `num_bins` samples
    Accepted {
        /// Integrated capacity (Ah)
        capacity: f64,
        /// State of health (%)
        soh: f64,
        /// One sample per bin
        samples: Vec<HealthSample>,
    },
    /// Capacity at or below the configured minimum
    LowCapacity {
        /// Integrated capacity (Ah)
        capacity: f64,
    },
    /// Fewer non-empty bins than `num_bins`
    IncompleteBinning {
        /// Integrated capacity (Ah)
        capacity: f64,
        /// Non-empty bins produced
        bins: usize,
    },
}

/// Derives capacity, SoC and SoH features from discharge cycles.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthEstimator {
    config: HealthConfig,
}

impl HealthEstimator {
    /// Estimator with the given parameters
    #[must_use]
    pub const fn new(config: HealthConfig) -> Self {
        Self { config }
    }

    /// Parameters in use
    #[must_use]
    pub const fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Estimate one cycle, consuming its series.
    #[must_use]
    pub fn estimate(
        &self,
        mut series: DischargeSeries,
        cycle_number: u32,
        battery_id: &str,
    ) -> CycleEstimate {
        if let Some(cut) = cutoff_index(&series.voltage, self.config.cutoff_voltage) {
            series.truncate(cut);
        }

        let hours = elapsed_hours(&series.time);
        let increments = charge_increments(&series.current, &hours);
        let capacity = integrated_capacity(&increments);
        if capacity <= self.config.min_capacity {
            return CycleEstimate::LowCapacity { capacity };
        }

        let soc = state_of_charge(&increments, capacity);
        let soh = capacity / self.config.nominal_capacity * 100.0;

        let samples: Vec<HealthSample> = bin_ranges(series.len(), self.config.num_bins)
            .into_iter()
            .filter(|range| !range.is_empty())
            .map(|range| HealthSample {
                voltage_mean: nan_mean(&series.voltage[range.clone()]),
                current_mean: nan_mean(&series.current[range.clone()]),
                temperature_mean: nan_mean(&series.temperature[range.clone()]),
                soc_mean: nan_mean(&soc[range]),
                cycle_number,
                battery_id: battery_id.to_string(),
                soh,
            })
            .collect();

        if samples.len() == self.config.num_bins {
            CycleEstimate::Accepted {
                capacity,
                soh,
                samples,
            }
        } else {
            CycleEstimate::IncompleteBinning {
                capacity,
                bins: samples.len(),
            }
        }
    }

    /// Read a per-cycle table and estimate it.
    ///
    /// # Errors
    ///
    /// Returns error if the table cannot be read; see
    /// [`DischargeSeries::read_csv`].
    pub fn estimate_file<P: AsRef<Path>>(
        &self,
        path: P,
        cycle_number: u32,
        battery_id: &str,
    ) -> Result<CycleEstimate> {
        let series = DischargeSeries::read_csv(path)?;
        Ok(self.estimate(series, cycle_number, battery_id))
    }
}
