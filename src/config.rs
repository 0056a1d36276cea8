//! Pipeline configuration
//!
//! A single [`PipelineConfig`] drives both stages. It round-trips through JSON
//! so a run can be reproduced from the file it was started with.
//!
//! ```rust
//! use battery_soh::config::{HealthConfig, PipelineConfig};
//!
//! let config = PipelineConfig::default();
//! assert_eq!(config.health, HealthConfig::default());
//! assert_eq!(config.health.num_bins, 20);
//! config.validate()?;
//! # Ok::<(), battery_soh::Error>(())
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the metadata index inside the output directory
pub const METADATA_FILE: &str = "metadata.csv";

/// Name of the per-cycle table directory inside the output directory
pub const DATA_DIR: &str = "data";

/// Default health dataset name inside the output directory
pub const HEALTH_FILE: &str = "battery_health_dataset.csv";

/// Parameters of the state-of-health derivation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Number of averaged rows emitted per accepted cycle
    pub num_bins: usize,
    /// Rated capacity in Ah, the SoH denominator
    pub nominal_capacity: f64,
    /// Cycles integrating to this capacity (Ah) or less are dropped
    pub min_capacity: f64,
    /// Discharge series are cut at the first sample below this voltage
    pub cutoff_voltage: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            num_bins: 20,
            nominal_capacity: 2.0,
            min_capacity: 1.4,
            cutoff_voltage: 2.7,
        }
    }
}

impl HealthConfig {
    /// Check the parameters are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for zero bins, a non-positive nominal
    /// capacity, a negative minimum capacity or any non-finite value.
    pub fn validate(&self) -> Result<()> {
        if self.num_bins == 0 {
            return Err(Error::InvalidConfig("num_bins must be at least 1".into()));
        }
        if !self.nominal_capacity.is_finite() || self.nominal_capacity <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "nominal_capacity must be positive, got {}",
                self.nominal_capacity
            )));
        }
        if !self.min_capacity.is_finite() || self.min_capacity < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "min_capacity must be non-negative, got {}",
                self.min_capacity
            )));
        }
        if !self.cutoff_voltage.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "cutoff_voltage must be finite, got {}",
                self.cutoff_voltage
            )));
        }
        Ok(())
    }
}

/// Unified configuration for extraction and health estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding one raw record per battery
    pub raw_dir: PathBuf,
    /// Directory receiving per-cycle tables, the metadata index and the dataset
    pub output_dir: PathBuf,
    /// Health stage parameters
    pub health: HealthConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("dataset/raw"),
            output_dir: PathBuf::from("dataset/processed"),
            health: HealthConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Save the configuration as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), text)?;
        Ok(())
    }

    /// Validate the health parameters.
    ///
    /// # Errors
    ///
    /// See [`HealthConfig::validate`].
    pub fn validate(&self) -> Result<()> {
        self.health.validate()
    }

    /// Artifact locations under `output_dir`.
    #[must_use]
    pub fn layout(&self) -> OutputLayout {
        OutputLayout::new(&self.output_dir)
    }
}

/// Where the extraction and health artifacts live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    /// Layout rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Output root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Per-cycle table directory
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    /// Metadata index artifact
    #[must_use]
    pub fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    /// Default health dataset artifact
    #[must_use]
    pub fn health_path(&self) -> PathBuf {
        self.root.join(HEALTH_FILE)
    }
}
