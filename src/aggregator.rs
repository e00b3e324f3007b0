// 📊 Aggregator - per-region totals and cumulative time series
//
// RegionSummary: group by region code, sum total_value (None = 0), count
// every row.
// TimeSeriesPoint: group by (region, ship date), then a running sum per
// region in date order. Undated rows can't be ordered and are skipped.

use crate::cleaner::TransferRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tolerance for comparing float sums (one cent)
pub const SUM_TOLERANCE: f64 = 0.01;

// ============================================================================
// OUTPUT TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub region_code: String,
    /// Filled by the reference join; None until then or when unknown
    pub region_name: Option<String>,
    pub sum_value: f64,
    pub num_records: usize,
    /// Filled by the reference join
    pub population: Option<u64>,
}

impl RegionSummary {
    /// sum_value ÷ population, None when population is missing or zero
    pub fn value_per_capita(&self) -> Option<f64> {
        match self.population {
            Some(pop) if pop > 0 => Some(self.sum_value / pop as f64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub region_code: String,
    pub date: NaiveDate,
    pub daily_sum_value: f64,
    pub cumulative_daily_sum_value: f64,
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// One summary row per region code, ordered by code
pub fn summarize_regions(records: &[TransferRecord]) -> Vec<RegionSummary> {
    let mut groups: BTreeMap<&str, (f64, usize)> = BTreeMap::new();

    for record in records {
        let entry = groups.entry(record.region_code.as_str()).or_insert((0.0, 0));
        entry.0 += record.total_value.unwrap_or(0.0);
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(code, (sum_value, num_records))| RegionSummary {
            region_code: code.to_string(),
            region_name: None,
            sum_value,
            num_records,
            population: None,
        })
        .collect()
}

/// Daily sums and running totals, ordered by region then date
pub fn build_time_series(records: &[TransferRecord]) -> Vec<TimeSeriesPoint> {
    // BTreeMap keys keep (region, date) sorted; same-day rows collapse here
    let mut daily: BTreeMap<(&str, NaiveDate), f64> = BTreeMap::new();

    for record in records {
        if let Some(date) = record.ship_date {
            *daily
                .entry((record.region_code.as_str(), date))
                .or_insert(0.0) += record.total_value.unwrap_or(0.0);
        }
    }

    let mut points = Vec::with_capacity(daily.len());
    let mut current_region: Option<&str> = None;
    let mut running = 0.0;

    for ((region, date), daily_sum_value) in daily {
        if current_region != Some(region) {
            current_region = Some(region);
            running = 0.0;
        }
        running += daily_sum_value;
        points.push(TimeSeriesPoint {
            region_code: region.to_string(),
            date,
            daily_sum_value,
            cumulative_daily_sum_value: running,
        });
    }

    points
}

/// Points for one region, in date order
pub fn series_for<'a>(points: &'a [TimeSeriesPoint], region_code: &str) -> Vec<&'a TimeSeriesPoint> {
    points
        .iter()
        .filter(|p| p.region_code == region_code)
        .collect()
}

// ============================================================================
// RECONCILIATION
// ============================================================================

/// A region whose series doesn't add up to its dated records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesDiscrepancy {
    pub region_code: String,
    pub expected: f64,
    pub final_cumulative: f64,
    pub difference: f64,
}

/// Check every region's final cumulative value against its dated records
///
/// Formula: last cumulative value = Σ total_value where ship_date is set.
/// Any discrepancy points at an aggregation bug, so it is logged loudly.
pub fn reconcile(records: &[TransferRecord], points: &[TimeSeriesPoint]) -> Vec<SeriesDiscrepancy> {
    let mut expected: BTreeMap<&str, f64> = BTreeMap::new();
    for record in records.iter().filter(|r| r.ship_date.is_some()) {
        *expected.entry(record.region_code.as_str()).or_insert(0.0) +=
            record.total_value.unwrap_or(0.0);
    }

    let mut finals: BTreeMap<&str, f64> = BTreeMap::new();
    for point in points {
        finals.insert(point.region_code.as_str(), point.cumulative_daily_sum_value);
    }

    let mut discrepancies = Vec::new();
    for (region, expected_sum) in expected {
        let final_cumulative = finals.get(region).copied().unwrap_or(0.0);
        let difference = (final_cumulative - expected_sum).abs();
        if difference >= SUM_TOLERANCE {
            tracing::error!(
                region = region,
                expected = expected_sum,
                actual = final_cumulative,
                "cumulative series does not reconcile"
            );
            discrepancies.push(SeriesDiscrepancy {
                region_code: region.to_string(),
                expected: expected_sum,
                final_cumulative,
                difference,
            });
        }
    }

    discrepancies
}

// ============================================================================
// TESTS
// ============================================================================
