//! Property-based tests for battery-soh
//!
//! - Test mathematical invariants of the health estimator
//! - Test table shape invariants of extraction
//! - Run with ProptestConfig::with_cases(100)

use battery_soh::config::HealthConfig;
use battery_soh::health::{
    bin_ranges, charge_increments, elapsed_hours, integrated_capacity, nan_mean, state_of_charge,
    CycleEstimate, DischargeSeries, HealthEstimator,
};
use battery_soh::record::{CycleKind, CycleRecord, FieldSeries};
use battery_soh::table::{table_filename, CycleIdCounter, CycleTable};
use proptest::prelude::*;

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

/// Constant-current discharge above the cut-off voltage
fn arb_discharge() -> impl Strategy<Value = DischargeSeries> {
    (30usize..400, 1.0f64..30.0, 0.5f64..4.0).prop_map(|(n, step, amps)| {
        #[allow(clippy::cast_precision_loss)]
        let series = DischargeSeries::new(
            (0..n).map(|i| 4.2 - 1.0 * (i as f64 / n as f64)).collect(),
            vec![-amps; n],
            vec![25.0; n],
            (0..n).map(|i| step * i as f64).collect(),
        )
        .unwrap();
        series
    })
}

/// Field lengths for one record of `kind`
fn arb_record(kind: CycleKind) -> impl Strategy<Value = CycleRecord> {
    proptest::collection::vec(0usize..50, kind.fields().len()).prop_map(move |lens| {
        let fields = kind
            .fields()
            .iter()
            .zip(lens)
            .map(|(&name, len)| FieldSeries {
                name,
                values: vec![1.0; len],
            })
            .collect();
        CycleRecord {
            kind,
            start_time: "[]".to_string(),
            ambient_temperature: None,
            fields,
            capacity: None,
            re: None,
            rct: None,
        }
    })
}

// ============================================================================
// Binning
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Bins cover 0..len contiguously with sizes differing by at most one
    #[test]
    fn prop_bin_ranges_partition(len in 0usize..5000, num_bins in 1usize..100) {
        let ranges = bin_ranges(len, num_bins);
        prop_assert_eq!(ranges.len(), num_bins);

        let mut next = 0;
        for range in &ranges {
            prop_assert_eq!(range.start, next);
            next = range.end;
        }
        prop_assert_eq!(next, len);

        let sizes: Vec<_> = ranges.iter().map(ExactSizeIterator::len).collect();
        let max = *sizes.iter().max().unwrap();
        let min = *sizes.iter().min().unwrap();
        prop_assert!(max - min <= 1);
        // Larger bins come first
        prop_assert!(sizes.windows(2).all(|w| w[0] >= w[1]));
    }

    /// Non-empty bins equal min(len, num_bins)
    #[test]
    fn prop_non_empty_bins(len in 0usize..200, num_bins in 1usize..50) {
        let non_empty = bin_ranges(len, num_bins).iter().filter(|r| !r.is_empty()).count();
        prop_assert_eq!(non_empty, len.min(num_bins));
    }
}

// ============================================================================
// Capacity, SoC, SoH
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Capacity is |Σ I·Δt| with Δt in hours
    #[test]
    fn prop_capacity_matches_closed_form(series in arb_discharge()) {
        let hours = elapsed_hours(series.time());
        let capacity = integrated_capacity(&charge_increments(series.current(), &hours));

        #[allow(clippy::cast_precision_loss)]
        let span_hours = (series.len() - 1) as f64 * (series.time()[1] - series.time()[0]) / 3600.0;
        let expected = series.current()[0].abs() * span_hours;
        prop_assert!((capacity - expected).abs() < 1e-9 * expected.max(1.0));
    }

    /// Same-sign current drains SoC from 100 % to 0 % monotonically
    #[test]
    fn prop_soc_monotonic_to_empty(series in arb_discharge()) {
        let hours = elapsed_hours(series.time());
        let increments = charge_increments(series.current(), &hours);
        let capacity = integrated_capacity(&increments);
        let soc = state_of_charge(&increments, capacity);

        prop_assert!((soc[0] - 100.0).abs() < 1e-9);
        prop_assert!(soc.last().unwrap().abs() < 1e-6);
        prop_assert!(soc.windows(2).all(|w| w[1] <= w[0] + 1e-9));
    }

    /// Accepted cycles yield exactly num_bins samples sharing one SoH
    #[test]
    fn prop_accepted_cycle_shape(series in arb_discharge(), num_bins in 1usize..30) {
        let config = HealthConfig { num_bins, min_capacity: 0.0, ..HealthConfig::default() };
        let len = series.len();
        let estimate = HealthEstimator::new(config).estimate(series, 7, "B0005");

        match estimate {
            CycleEstimate::Accepted { soh, samples, .. } => {
                prop_assert_eq!(samples.len(), num_bins);
                prop_assert!(samples.iter().all(|s| s.soh == soh && s.cycle_number == 7));
            }
            CycleEstimate::IncompleteBinning { bins, .. } => {
                prop_assert!(len < num_bins);
                prop_assert_eq!(bins, len);
            }
            CycleEstimate::LowCapacity { .. } => prop_assert!(false, "min_capacity is zero"),
        }
    }

    /// Columns of unequal length are refused up front
    #[test]
    fn prop_mismatched_series_refused(v in 1usize..50, t in 1usize..50) {
        let series = DischargeSeries::new(vec![3.5; v], vec![-1.0; v], vec![25.0; v], vec![0.0; t]);
        prop_assert_eq!(series.is_ok(), v == t);
    }

    /// NaN-skipping mean stays within the finite values' bounds
    #[test]
    fn prop_nan_mean_bounded(values in proptest::collection::vec(
        prop_oneof![Just(f64::NAN), -100.0f64..100.0], 1..100)
    ) {
        let finite: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        let mean = nan_mean(&values);
        if finite.is_empty() {
            prop_assert!(mean.is_nan());
        } else {
            let lo = finite.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(mean >= lo - 1e-9 && mean <= hi + 1e-9);
        }
    }
}

// ============================================================================
// Extraction tables and identifiers
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Tables have the declared columns, all as long as the longest field
    #[test]
    fn prop_table_is_rectangular(record in prop_oneof![
        arb_record(CycleKind::Charge),
        arb_record(CycleKind::Discharge),
        arb_record(CycleKind::Impedance),
    ]) {
        let table = CycleTable::from_record(&record);
        prop_assert_eq!(table.column_names(), record.kind.fields().to_vec());
        prop_assert_eq!(table.num_rows(), record.max_len());
        prop_assert!(table.columns().iter().all(|c| c.cells.len() == table.num_rows()));
    }

    /// Identifiers are consecutive and their table names sort numerically
    #[test]
    fn prop_identifiers_consecutive(start in 1u32..99_000, count in 1usize..500) {
        let mut counter = CycleIdCounter::starting_at(start);
        let uids: Vec<u32> = (0..count).map(|_| counter.allocate().unwrap()).collect();
        prop_assert!(uids.windows(2).all(|w| w[1] == w[0] + 1));

        let names: Vec<String> = uids.iter().map(|&u| table_filename(u)).collect();
        let mut sorted = names.clone();
        sorted.sort();
        prop_assert_eq!(names, sorted);
    }
}
