// 🚚 Pipeline - load → clean → aggregate → join → render → export
//
// Strictly sequential. Each stage finishes before the next starts, and the
// first fatal error aborts the run (PipelineError::stage names where).

use crate::aggregator::{self, RegionSummary, SeriesDiscrepancy, TimeSeriesPoint};
use crate::cleaner::{self, CleanReport};
use crate::config::Config;
use crate::db::{self, RunRecord};
use crate::error::Result;
use crate::geometry;
use crate::loader::{self, RawTable};
use crate::reference::{self, PopulationSource};
use crate::render::{self, RenderedCharts};
use rusqlite::Connection;

/// Everything derived from the workbook before rendering
#[derive(Debug, Clone)]
pub struct Processed {
    pub clean_report: CleanReport,
    pub record_count: usize,
    pub summaries: Vec<RegionSummary>,
    pub points: Vec<TimeSeriesPoint>,
    pub discrepancies: Vec<SeriesDiscrepancy>,
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub run: RunRecord,
    pub processed: Processed,
    pub charts: RenderedCharts,
}

/// Clean, aggregate and join a loaded table
pub fn process<P: PopulationSource>(table: RawTable, population: &P) -> Result<Processed> {
    let (records, clean_report) = cleaner::clean(table);

    let summaries = aggregator::summarize_regions(&records);
    let points = aggregator::build_time_series(&records);
    let discrepancies = aggregator::reconcile(&records, &points);
    tracing::info!(
        regions = summaries.len(),
        points = points.len(),
        "aggregated"
    );

    let summaries = reference::join_reference(summaries, population)?;

    Ok(Processed {
        clean_report,
        record_count: records.len(),
        summaries,
        points,
        discrepancies,
    })
}

/// Full run with an explicit population source
pub fn run_with<P: PopulationSource>(config: &Config, population: &P) -> Result<RunOutput> {
    println!("\n📂 Loading workbook {}...", config.workbook_path.display());
    let table = loader::load_workbook(&config.workbook_path)?;
    println!("✓ Loaded {} rows", table.len());

    run_loaded(config, table, population)
}

/// Everything after the workbook read: process, render, export
pub fn run_loaded<P: PopulationSource>(
    config: &Config,
    table: RawTable,
    population: &P,
) -> Result<RunOutput> {
    println!("\n🧹 Cleaning, aggregating, joining reference data...");
    let processed = process(table, population)?;
    println!("✓ {}", processed.clean_report.summary());
    println!(
        "✓ {} regions, {} time series points",
        processed.summaries.len(),
        processed.points.len()
    );

    println!("\n🎨 Rendering charts...");
    let geometries = geometry::load_geometries(&config.hexgrid_path, &config.hexgrid_name_field)?;
    let charts = render::render_all(
        &processed.summaries,
        &processed.points,
        &geometries,
        &config.output_dir,
    )?;
    println!(
        "✓ 4 charts written to {} ({} regions dropped from maps)",
        config.output_dir.display(),
        charts.dropped_regions
    );

    println!("\n💾 Exporting summary tables...");
    let run = RunRecord::new(
        &config.workbook_path,
        db::fingerprint_file(&config.workbook_path)?,
        processed.record_count,
    );
    db::write_summary_csv(&config.output_dir.join(db::SUMMARY_CSV), &processed.summaries)?;
    db::write_time_series_csv(&config.output_dir.join(db::TIME_SERIES_CSV), &processed.points)?;

    if let Some(db_path) = &config.summary_db {
        let mut conn = Connection::open(db_path)?;
        db::setup_database(&conn)?;
        db::export_run(&mut conn, &run, &processed.summaries, &processed.points)?;
        println!("✓ Run {} stored in {}", run.run_id, db_path.display());
    }
    println!("✓ Summary CSVs written");

    Ok(RunOutput {
        run,
        processed,
        charts,
    })
}
