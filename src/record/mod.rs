//! Raw battery records and the cycles extracted from them
//!
//! ## Model Overview
//!
//! ```text
//! RawBattery (1) ──< RawCycle (N)      [as decoded from the source]
//!                        │
//!                        └── extract ──> CycleRecord   [typed, declared fields]
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use battery_soh::record::{extract_cycles, CycleKind, RawBattery};
//!
//! let raw: RawBattery = serde_json::from_str(r#"{"cycles": [
//!     {"type": "discharge", "time": [2008, 4, 2, 0, 0, 0],
//!      "ambient_temperature": 24,
//!      "data": {"Voltage_measured": [4.1, 4.0], "Capacity": 1.85}}
//! ]}"#)?;
//!
//! let cycles = extract_cycles(&raw);
//! let record = cycles[0].as_ref().unwrap();
//! assert_eq!(record.kind, CycleKind::Discharge);
//! assert_eq!(record.start_time, "[2008. 4. 2. 0. 0. 0.000]");
//! assert_eq!(record.capacity, Some(1.85));
//! # Ok::<(), serde_json::Error>(())
//! ```

mod extract;
mod source;

pub use extract::{extract_cycle, extract_cycles, format_date_vector, format_start_time};
pub use source::{is_excluded, JsonDirSource, RecordSource, EXCLUDED_BATTERIES};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared columns of a charge cycle table
pub const CHARGE_FIELDS: [&str; 6] = [
    "Voltage_measured",
    "Current_measured",
    "Temperature_measured",
    "Current_charge",
    "Voltage_charge",
    "Time",
];

/// Declared columns of a discharge cycle table
pub const DISCHARGE_FIELDS: [&str; 6] = [
    "Voltage_measured",
    "Current_measured",
    "Temperature_measured",
    "Current_load",
    "Voltage_load",
    "Time",
];

/// Declared columns of an impedance cycle table
pub const IMPEDANCE_FIELDS: [&str; 5] = [
    "Sense_current",
    "Battery_current",
    "Current_ratio",
    "Battery_impedance",
    "Rectified_Impedance",
];

/// Kind of test episode. Each kind owns a fixed, disjoint field list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleKind {
    /// Charge cycle
    Charge,
    /// Discharge cycle
    Discharge,
    /// Impedance measurement
    Impedance,
}

impl CycleKind {
    /// Resolve the raw type label (`"charge"`, `"discharge"`, `"impedance"`).
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "charge" => Some(Self::Charge),
            "discharge" => Some(Self::Discharge),
            "impedance" => Some(Self::Impedance),
            _ => None,
        }
    }

    /// Label used in the metadata index
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Charge => "charge",
            Self::Discharge => "discharge",
            Self::Impedance => "impedance",
        }
    }

    /// Declared table columns, in order
    #[must_use]
    pub const fn fields(self) -> &'static [&'static str] {
        match self {
            Self::Charge => &CHARGE_FIELDS,
            Self::Discharge => &DISCHARGE_FIELDS,
            Self::Impedance => &IMPEDANCE_FIELDS,
        }
    }
}

impl std::fmt::Display for CycleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One battery's recording as decoded from the raw source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawBattery {
    /// Cycles in native recording order
    #[serde(default)]
    pub cycles: Vec<RawCycle>,
}

/// One undecoded cycle.
///
/// Fields stay untyped JSON so a malformed cycle never fails the whole
/// battery; [`extract_cycle`] decides what is fatal for the cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCycle {
    /// Type label, expected to be a string
    #[serde(rename = "type", default)]
    pub kind: Value,
    /// Date vector `[year, month, day, hour, minute, second]`
    #[serde(default)]
    pub time: Value,
    /// Ambient temperature in °C, a number or a (nested) numeric array
    #[serde(default)]
    pub ambient_temperature: Value,
    /// Measurement container: an object of field name to number or (nested)
    /// numeric array
    #[serde(default)]
    pub data: Value,
}

/// A single named numeric column of a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSeries {
    /// Declared field name
    pub name: &'static str,
    /// Samples; empty when the raw cycle lacked the field
    pub values: Vec<f64>,
}

/// A typed cycle ready for serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleRecord {
    /// Cycle kind
    pub kind: CycleKind,
    /// Formatted start time, `[]` when the date vector was malformed
    pub start_time: String,
    /// Ambient temperature in °C
    pub ambient_temperature: Option<f64>,
    /// Declared fields of `kind`, in declared order; always all present
    pub fields: Vec<FieldSeries>,
    /// First `Capacity` value (discharge only)
    pub capacity: Option<f64>,
    /// First `Re` value (impedance only)
    pub re: Option<f64>,
    /// First `Rct` value (impedance only)
    pub rct: Option<f64>,
}

impl CycleRecord {
    /// Samples of a declared field
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&[f64]> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.values.as_slice())
    }

    /// Longest field length (the table row count)
    #[must_use]
    pub fn max_len(&self) -> usize {
        self.fields.iter().map(|f| f.values.len()).max().unwrap_or(0)
    }
}
