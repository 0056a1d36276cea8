//! Stage drivers
//!
//! ```text
//! RecordSource ──> extract_corpus ──> data/NNNNN.csv + metadata.csv
//!                                           │
//!                         build_health_dataset ──> health dataset
//! ```
//!
//! Both drivers are single-threaded and process units strictly in order:
//! batteries sorted by identifier, cycles in native order, health rows in
//! metadata order.

use crate::config::{HealthConfig, OutputLayout};
use crate::health::{CycleEstimate, HealthArtifact, HealthDataset, HealthEstimator};
use crate::metadata::{MetadataIndex, MetadataRow};
use crate::record::{extract_cycles, CycleKind, RecordSource};
use crate::report::{BatteryOutcome, CycleOutcome, CycleVerdict, ExtractReport, HealthReport};
use crate::table::{CycleIdCounter, CycleSerializer};
use crate::Result;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Extract every battery of `source` into per-cycle tables and the index.
///
/// `counter` is advanced once per serialized cycle and never rolled back.
/// Skipped cycles and unloadable batteries are reported, not raised.
///
/// # Errors
///
/// Returns error when the corpus is missing, identifiers run out, or a table
/// or the index cannot be written.
pub fn extract_corpus<S: RecordSource + ?Sized>(
    source: &S,
    layout: &OutputLayout,
    counter: &mut CycleIdCounter,
) -> Result<ExtractReport> {
    let battery_ids = source.battery_ids()?;
    let serializer = CycleSerializer::new(layout.data_dir());
    let index = MetadataIndex::new(layout.metadata_path());
    let mut report = ExtractReport::new();

    for battery_id in &battery_ids {
        info!(battery_id = %battery_id, "processing battery");
        let raw = match source.load(battery_id) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(battery_id = %battery_id, error = %e, "skipping battery, record not loadable");
                report.push_battery(BatteryOutcome::Failed {
                    battery_id: battery_id.clone(),
                    error: e.to_string(),
                });
                continue;
            }
        };

        let mut rows = Vec::new();
        let mut skipped = 0;
        let mut test_id = 0u32;
        for (position, outcome) in extract_cycles(&raw).into_iter().enumerate() {
            let record = match outcome {
                Ok(record) => record,
                Err(e) => {
                    warn!(battery_id = %battery_id, cycle = position, reason = %e, "skipping cycle");
                    skipped += 1;
                    report.push_cycle(CycleOutcome::Skipped {
                        battery_id: battery_id.clone(),
                        index: position,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let saved = serializer.serialize(&record, counter)?;
            rows.push(MetadataRow::from_cycle(
                &record,
                battery_id,
                test_id,
                saved.uid,
                saved.filename,
            ));
            report.push_cycle(CycleOutcome::Serialized {
                battery_id: battery_id.clone(),
                index: position,
                uid: saved.uid,
                test_id,
                kind: record.kind,
            });
            test_id += 1;
        }

        index.append(&rows)?;
        report.push_battery(BatteryOutcome::Processed {
            battery_id: battery_id.clone(),
            serialized: rows.len(),
            skipped,
        });
    }

    report.finish();
    info!(
        batteries = battery_ids.len(),
        serialized = report.serialized_count(),
        skipped = report.skipped_count(),
        "extraction complete"
    );
    Ok(report)
}

/// Discharge rows of `rows` paired with their 1-based per-battery count.
#[must_use]
pub fn number_discharge_cycles(rows: &[MetadataRow]) -> Vec<(&MetadataRow, u32)> {
    let mut seen: HashMap<&str, u32> = HashMap::new();
    rows.iter()
        .filter(|row| row.kind == CycleKind::Discharge)
        .map(|row| {
            let count = seen.entry(row.battery_id.as_str()).or_insert(0);
            *count += 1;
            (row, *count)
        })
        .collect()
}

/// Build the health dataset from the index at `layout` and write it to
/// `output`.
///
/// A cycle that fails to load or process is logged with its filename and
/// skipped. When no cycle is accepted nothing is written and the report's
/// artifact stays empty.
///
/// # Errors
///
/// Returns error if the metadata index cannot be read or the dataset cannot
/// be written.
pub fn build_health_dataset(
    layout: &OutputLayout,
    config: &HealthConfig,
    output: &Path,
) -> Result<(HealthReport, HealthArtifact)> {
    let rows = MetadataIndex::new(layout.metadata_path()).read_all()?;
    let data_dir = layout.data_dir();
    let estimator = HealthEstimator::new(*config);
    let mut dataset = HealthDataset::new();
    let mut report = HealthReport::new();

    let discharges = number_discharge_cycles(&rows);
    info!(discharge_cycles = discharges.len(), "estimating state of health");

    for (row, cycle_number) in discharges {
        let filename = row.filename.clone();
        let verdict = match estimator.estimate_file(data_dir.join(&filename), cycle_number, &row.battery_id) {
            Ok(CycleEstimate::Accepted {
                capacity,
                soh,
                samples,
            }) => {
                dataset.push_cycle(samples);
                CycleVerdict::Accepted {
                    filename,
                    battery_id: row.battery_id.clone(),
                    cycle_number,
                    capacity,
                    soh,
                }
            }
            Ok(CycleEstimate::LowCapacity { capacity }) => {
                CycleVerdict::LowCapacity { filename, capacity }
            }
            Ok(CycleEstimate::IncompleteBinning { bins, .. }) => {
                CycleVerdict::IncompleteBinning { filename, bins }
            }
            Err(e) => {
                warn!(file = %filename, error = %e, "error processing cycle");
                CycleVerdict::Failed {
                    filename,
                    error: e.to_string(),
                }
            }
        };
        debug!(?verdict, "cycle estimated");
        report.push(verdict);
    }

    let artifact = dataset.write(output)?;
    report.finish(&artifact);
    Ok((report, artifact))
}
