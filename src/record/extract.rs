//! Record extraction: raw cycles into typed [`CycleRecord`]s

use super::{CycleKind, CycleRecord, FieldSeries, RawBattery, RawCycle};
use crate::{Error, Result};
use serde_json::{Map, Value};

/// Name of the measurement container every cycle must carry
const DATA_FIELD: &str = "data";

/// Text written when a start time is not a 6-component numeric vector
const EMPTY_TIME: &str = "[]";

/// Extract every cycle of a battery, in native order.
///
/// Each entry is the outcome for the cycle at that position, so callers can
/// report skipped cycles without losing their index.
#[must_use]
pub fn extract_cycles(raw: &RawBattery) -> Vec<Result<CycleRecord>> {
    raw.cycles.iter().map(extract_cycle).collect()
}

/// Extract one raw cycle.
///
/// # Errors
///
/// - [`Error::MissingMandatoryField`] when the `data` container is absent or
///   not an object
/// - [`Error::UnknownCycleType`] when the type label is missing, not a string
///   or unknown
pub fn extract_cycle(cycle: &RawCycle) -> Result<CycleRecord> {
    let Value::Object(data) = &cycle.data else {
        return Err(Error::MissingMandatoryField(DATA_FIELD.to_string()));
    };

    let kind = match &cycle.kind {
        Value::String(label) => {
            CycleKind::parse(label).ok_or_else(|| Error::UnknownCycleType(label.clone()))?
        }
        Value::Null => return Err(Error::UnknownCycleType(String::new())),
        other => return Err(Error::UnknownCycleType(other.to_string())),
    };

    let fields = kind
        .fields()
        .iter()
        .map(|&name| FieldSeries {
            name,
            values: numeric_field(data, name).unwrap_or_default(),
        })
        .collect();

    let first = |name: &str| numeric_field(data, name).and_then(|v| v.first().copied());

    Ok(CycleRecord {
        kind,
        start_time: format_start_time(&cycle.time),
        ambient_temperature: first_number(&cycle.ambient_temperature),
        fields,
        capacity: if kind == CycleKind::Discharge { first("Capacity") } else { None },
        re: if kind == CycleKind::Impedance { first("Re") } else { None },
        rct: if kind == CycleKind::Impedance { first("Rct") } else { None },
    })
}

/// First number of a scalar or (nested) numeric array; `None` otherwise.
fn first_number(value: &Value) -> Option<f64> {
    let mut out = Vec::new();
    if flatten_numbers(value, &mut out) {
        out.first().copied()
    } else {
        None
    }
}

/// Samples of `name`, flattened. `None` when absent or not numeric.
fn numeric_field(data: &Map<String, Value>, name: &str) -> Option<Vec<f64>> {
    let value = data.get(name)?;
    let mut out = Vec::new();
    if flatten_numbers(value, &mut out) {
        Some(out)
    } else {
        tracing::warn!(field = name, "non-numeric field treated as absent");
        None
    }
}

fn flatten_numbers(value: &Value, out: &mut Vec<f64>) -> bool {
    match value {
        Value::Number(n) => n.as_f64().map(|x| out.push(x)).is_some(),
        Value::Array(items) => items.iter().all(|item| flatten_numbers(item, out)),
        _ => false,
    }
}

/// Format a raw date vector as `[Y. M. D. h. m. s.sss]`.
///
/// Anything other than a flat array of exactly six numbers yields `[]`.
///
/// ```rust
/// use battery_soh::record::format_start_time;
/// use serde_json::json;
///
/// assert_eq!(format_start_time(&json!([2008, 4, 2, 0, 0, 0])), "[2008. 4. 2. 0. 0. 0.000]");
/// assert_eq!(format_start_time(&json!([2008, 4])), "[]");
/// assert_eq!(format_start_time(&json!("2008-04-02")), "[]");
/// ```
#[must_use]
pub fn format_start_time(time: &Value) -> String {
    let Value::Array(items) = time else {
        return EMPTY_TIME.to_string();
    };
    let parts: Option<Vec<f64>> = items.iter().map(Value::as_f64).collect();
    parts.map_or_else(|| EMPTY_TIME.to_string(), |p| format_date_vector(&p))
}

/// Format numeric date components; see [`format_start_time`].
#[must_use]
pub fn format_date_vector(parts: &[f64]) -> String {
    match parts {
        [year, month, day, hour, minute, second] => {
            format!("[{year:.0}. {month:.0}. {day:.0}. {hour:.0}. {minute:.0}. {second:.3}]")
        }
        _ => EMPTY_TIME.to_string(),
    }
}
