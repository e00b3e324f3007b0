// LESO Transfers - Core Library
// Equipment transfer workbook → cleaned records → regional summaries → charts

pub mod aggregator;
pub mod categories;
pub mod cleaner;
pub mod config;
pub mod db;
pub mod error;
pub mod geometry;
pub mod loader;
pub mod pipeline;
pub mod reference;
pub mod render;

// Re-export commonly used types
pub use aggregator::{
    build_time_series, reconcile, summarize_regions, RegionSummary, SeriesDiscrepancy,
    TimeSeriesPoint,
};
pub use categories::{DemilCode, DemilIc, StationType, UnitOfIssue};
pub use cleaner::{clean, compute_total, rename_columns, CleanReport, TransferRecord};
pub use config::{CensusConfig, Config};
pub use db::{
    export_run, fingerprint_file, setup_database, write_summary_csv, write_time_series_csv,
    RunRecord,
};
pub use error::{PipelineError, Result};
pub use geometry::{join_geometry, load_geometries, GeometryJoin, RegionGeometry};
pub use loader::{load_from_source, load_workbook, Cell, RawRow, RawTable, WorkbookSource};
pub use pipeline::{process, run_loaded, run_with, Processed, RunOutput};
pub use reference::{
    join_reference, CensusClient, PopulationSource, PopulationTable, StaticPopulation,
};
pub use render::{render_all, ChoroplethMetric, LogColorScale, RenderedCharts};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
