// 🗄️ Summary export - CSV files + optional SQLite (WAL)
//
// Every pipeline run gets a UUID. The SQLite export keeps runs side by side:
// each run row records when it ran, which workbook it read and that
// workbook's SHA-256, so old outputs can be traced back to their input.

use crate::aggregator::{RegionSummary, TimeSeriesPoint};
use crate::error::{PipelineError, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub const SUMMARY_CSV: &str = "region_summary.csv";
pub const TIME_SERIES_CSV: &str = "time_series.csv";

// ============================================================================
// RUN METADATA
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub source_file: String,
    pub source_sha256: String,
    pub record_count: usize,
}

impl RunRecord {
    pub fn new(source_file: &Path, source_sha256: String, record_count: usize) -> Self {
        RunRecord {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            source_file: source_file.display().to_string(),
            source_sha256,
            record_count,
        }
    }
}

/// SHA-256 of a file's bytes, hex encoded
pub fn fingerprint_file(path: &Path) -> Result<String> {
    let file = File::open(path)
        .map_err(|e| PipelineError::Export(format!("cannot fingerprint {}: {}", path.display(), e)))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    std::io::copy(&mut reader, &mut hasher)
        .map_err(|e| PipelineError::Export(format!("cannot fingerprint {}: {}", path.display(), e)))?;
    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// CSV
// ============================================================================

/// Flat CSV row; per-capita is derived at write time
#[derive(Debug, Serialize)]
struct SummaryCsvRow<'a> {
    region_code: &'a str,
    region_name: Option<&'a str>,
    sum_value: f64,
    num_records: usize,
    population: Option<u64>,
    value_per_capita: Option<f64>,
}

pub fn write_summary_csv(path: &Path, summaries: &[RegionSummary]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for summary in summaries {
        writer.serialize(SummaryCsvRow {
            region_code: &summary.region_code,
            region_name: summary.region_name.as_deref(),
            sum_value: summary.sum_value,
            num_records: summary.num_records,
            population: summary.population,
            value_per_capita: summary.value_per_capita(),
        })?;
    }
    writer
        .flush()
        .map_err(|e| PipelineError::Export(e.to_string()))?;
    Ok(())
}

pub fn write_time_series_csv(path: &Path, points: &[TimeSeriesPoint]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for point in points {
        writer.serialize(point)?;
    }
    writer
        .flush()
        .map_err(|e| PipelineError::Export(e.to_string()))?;
    Ok(())
}

// ============================================================================
// SQLITE
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS runs (
            run_id TEXT PRIMARY KEY,
            started_at TEXT NOT NULL,
            source_file TEXT NOT NULL,
            source_sha256 TEXT NOT NULL,
            record_count INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS region_summaries (
            run_id TEXT NOT NULL REFERENCES runs(run_id),
            region_code TEXT NOT NULL,
            region_name TEXT,
            sum_value REAL NOT NULL,
            num_records INTEGER NOT NULL,
            population INTEGER,
            PRIMARY KEY (run_id, region_code)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS time_series (
            run_id TEXT NOT NULL REFERENCES runs(run_id),
            region_code TEXT NOT NULL,
            date TEXT NOT NULL,
            daily_sum_value REAL NOT NULL,
            cumulative_daily_sum_value REAL NOT NULL,
            PRIMARY KEY (run_id, region_code, date)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_runs_sha ON runs(source_sha256)",
        [],
    )?;

    Ok(())
}

/// Write one run and all its rows in a single transaction
pub fn export_run(
    conn: &mut Connection,
    run: &RunRecord,
    summaries: &[RegionSummary],
    points: &[TimeSeriesPoint],
) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO runs (run_id, started_at, source_file, source_sha256, record_count)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            run.run_id,
            run.started_at.to_rfc3339(),
            run.source_file,
            run.source_sha256,
            run.record_count as i64,
        ],
    )?;

    {
        let mut stmt = tx.prepare(
            "INSERT INTO region_summaries
                (run_id, region_code, region_name, sum_value, num_records, population)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for summary in summaries {
            stmt.execute(params![
                run.run_id,
                summary.region_code,
                summary.region_name,
                summary.sum_value,
                summary.num_records as i64,
                summary.population.map(|p| p as i64),
            ])?;
        }

        let mut stmt = tx.prepare(
            "INSERT INTO time_series
                (run_id, region_code, date, daily_sum_value, cumulative_daily_sum_value)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for point in points {
            stmt.execute(params![
                run.run_id,
                point.region_code,
                point.date.format("%Y-%m-%d").to_string(),
                point.daily_sum_value,
                point.cumulative_daily_sum_value,
            ])?;
        }
    }

    tx.commit()?;
    tracing::info!(
        run_id = %run.run_id,
        regions = summaries.len(),
        points = points.len(),
        "run exported"
    );
    Ok(())
}

// Readback helpers: the pipeline only writes; tests read the archive back.

#[cfg(test)]
pub(crate) fn get_runs(conn: &Connection) -> Result<Vec<RunRecord>> {
    let mut stmt = conn.prepare(
        "SELECT run_id, started_at, source_file, source_sha256, record_count
         FROM runs
         ORDER BY started_at DESC",
    )?;

    let runs = stmt
        .query_map([], |row| {
            let started_at: String = row.get(1)?;
            let record_count: i64 = row.get(4)?;
            Ok(RunRecord {
                run_id: row.get(0)?,
                started_at: DateTime::parse_from_rfc3339(&started_at)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?
                    .with_timezone(&Utc),
                source_file: row.get(2)?,
                source_sha256: row.get(3)?,
                record_count: record_count as usize,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(runs)
}

#[cfg(test)]
pub(crate) fn get_region_summaries(conn: &Connection, run_id: &str) -> Result<Vec<RegionSummary>> {
    let mut stmt = conn.prepare(
        "SELECT region_code, region_name, sum_value, num_records, population
         FROM region_summaries
         WHERE run_id = ?1
         ORDER BY region_code",
    )?;

    let summaries = stmt
        .query_map([run_id], |row| {
            let num_records: i64 = row.get(3)?;
            let population: Option<i64> = row.get(4)?;
            Ok(RegionSummary {
                region_code: row.get(0)?,
                region_name: row.get(1)?,
                sum_value: row.get(2)?,
                num_records: num_records as usize,
                population: population.map(|p| p as u64),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(summaries)
}

#[cfg(test)]
pub(crate) fn get_time_series(conn: &Connection, run_id: &str) -> Result<Vec<TimeSeriesPoint>> {
    let mut stmt = conn.prepare(
        "SELECT region_code, date, daily_sum_value, cumulative_daily_sum_value
         FROM time_series
         WHERE run_id = ?1
         ORDER BY region_code, date",
    )?;

    let points = stmt
        .query_map([run_id], |row| {
            let date: String = row.get(1)?;
            Ok(TimeSeriesPoint {
                region_code: row.get(0)?,
                date: chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                    .map_err(|_| rusqlite::Error::InvalidQuery)?,
                daily_sum_value: row.get(2)?,
                cumulative_daily_sum_value: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(points)
}
