//! Batch reports
//!
//! Every unit of work ends in an explicit outcome. Stages collect outcomes
//! into a report; the driver decides what to log and whether to continue.

use crate::health::HealthArtifact;
use crate::record::CycleKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of one raw cycle during extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Table written and indexed
    Serialized {
        /// Battery identifier
        battery_id: String,
        /// Position on the raw cycle axis
        index: usize,
        /// Global identifier
        uid: u32,
        /// Per-battery test id
        test_id: u32,
        /// Cycle kind
        kind: CycleKind,
    },
    /// Skipped; no identifier consumed
    Skipped {
        /// Battery identifier
        battery_id: String,
        /// Position on the raw cycle axis
        index: usize,
        /// Why it was skipped
        reason: String,
    },
}

/// Outcome of one battery during extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatteryOutcome {
    /// Record loaded and its cycles processed
    Processed {
        /// Battery identifier
        battery_id: String,
        /// Cycles serialized
        serialized: usize,
        /// Cycles skipped
        skipped: usize,
    },
    /// Record could not be loaded; nothing written for it
    Failed {
        /// Battery identifier
        battery_id: String,
        /// Load error
        error: String,
    },
}

/// Report of one extraction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractReport {
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    batteries: Vec<BatteryOutcome>,
    cycles: Vec<CycleOutcome>,
}

impl Default for ExtractReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractReport {
    /// Start a report now
    #[must_use]
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            batteries: Vec::new(),
            cycles: Vec::new(),
        }
    }

    /// Record a cycle outcome
    pub fn push_cycle(&mut self, outcome: CycleOutcome) {
        self.cycles.push(outcome);
    }

    /// Record a battery outcome
    pub fn push_battery(&mut self, outcome: BatteryOutcome) {
        self.batteries.push(outcome);
    }

    /// Stamp the finish time
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Start time
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Finish time, once finished
    #[must_use]
    pub const fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Per-battery outcomes in processing order
    #[must_use]
    pub fn batteries(&self) -> &[BatteryOutcome] {
        &self.batteries
    }

    /// Per-cycle outcomes in processing order
    #[must_use]
    pub fn cycles(&self) -> &[CycleOutcome] {
        &self.cycles
    }

    /// Number of serialized cycles
    #[must_use]
    pub fn serialized_count(&self) -> usize {
        self.cycles
            .iter()
            .filter(|c| matches!(c, CycleOutcome::Serialized { .. }))
            .count()
    }

    /// Number of skipped cycles
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.cycles.len() - self.serialized_count()
    }
}

/// Verdict on one discharge cycle during health estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum CycleVerdict {
    /// Contributed `num_bins` rows
    Accepted {
        /// Per-cycle table name
        filename: String,
        /// Battery identifier
        battery_id: String,
        /// Discharge count within the battery
        cycle_number: u32,
        /// Integrated capacity (Ah)
        capacity: f64,
        /// State of health (%)
        soh: f64,
    },
    /// Capacity at or below the minimum
    LowCapacity {
        /// Per-cycle table name
        filename: String,
        /// Integrated capacity (Ah)
        capacity: f64,
    },
    /// Too few rows to fill every bin
    IncompleteBinning {
        /// Per-cycle table name
        filename: String,
        /// Non-empty bins
        bins: usize,
    },
    /// Loading or processing failed
    Failed {
        /// Per-cycle table name
        filename: String,
        /// Error text
        error: String,
    },
}

impl CycleVerdict {
    /// Table name the verdict refers to
    #[must_use]
    pub fn filename(&self) -> &str {
        match self {
            Self::Accepted { filename, .. }
            | Self::LowCapacity { filename, .. }
            | Self::IncompleteBinning { filename, .. }
            | Self::Failed { filename, .. } => filename,
        }
    }
}

/// Report of one health estimation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    verdicts: Vec<CycleVerdict>,
    artifact: Option<PathBuf>,
    rows: usize,
}

impl Default for HealthReport {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthReport {
    /// Start a report now
    #[must_use]
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            verdicts: Vec::new(),
            artifact: None,
            rows: 0,
        }
    }

    /// Record a verdict
    pub fn push(&mut self, verdict: CycleVerdict) {
        self.verdicts.push(verdict);
    }

    /// Stamp the finish time and the artifact outcome
    pub fn finish(&mut self, artifact: &HealthArtifact) {
        self.finished_at = Some(Utc::now());
        if let HealthArtifact::Written { path, rows } = artifact {
            self.artifact = Some(path.clone());
            self.rows = *rows;
        }
    }

    /// Verdicts in discharge-metadata order
    #[must_use]
    pub fn verdicts(&self) -> &[CycleVerdict] {
        &self.verdicts
    }

    /// Start time
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Finish time, once finished
    #[must_use]
    pub const fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Path of the written dataset, if one was produced
    #[must_use]
    pub fn artifact(&self) -> Option<&PathBuf> {
        self.artifact.as_ref()
    }

    /// Rows written
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of accepted cycles
    #[must_use]
    pub fn accepted_count(&self) -> usize {
        self.count(|v| matches!(v, CycleVerdict::Accepted { .. }))
    }

    /// Number of cycles dropped by capacity or binning policy
    #[must_use]
    pub fn rejected_count(&self) -> usize {
        self.count(|v| {
            matches!(
                v,
                CycleVerdict::LowCapacity { .. } | CycleVerdict::IncompleteBinning { .. }
            )
        })
    }

    /// Number of cycles that failed to process
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count(|v| matches!(v, CycleVerdict::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&CycleVerdict) -> bool) -> usize {
        self.verdicts.iter().filter(|v| pred(v)).count()
    }
}
