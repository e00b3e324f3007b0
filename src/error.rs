// ⚠️ Pipeline errors - one variant per failure kind
//
// Field-level parse problems never show up here: the Cleaner turns them
// into nulls and counts them in its CleanReport. Geometry join mismatches
// are counted by the Renderer. Everything below aborts the run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input workbook missing, unreadable, or laid out wrong
    #[error("failed to load workbook {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    /// Population service unreachable or answered with garbage
    #[error("population data unavailable: {0}")]
    DataUnavailable(String),

    /// Geometry reference missing or not valid GeoJSON
    #[error("failed to read geometry {path}: {reason}")]
    Geometry { path: PathBuf, reason: String },

    #[error("failed to render {chart}: {reason}")]
    Render { chart: String, reason: String },

    #[error("failed to export summary: {0}")]
    Export(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PipelineError::Load {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn geometry(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PipelineError::Geometry {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn render(chart: &str, reason: impl ToString) -> Self {
        PipelineError::Render {
            chart: chart.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Which stage of the run produced this error
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Load { .. } => "load",
            PipelineError::DataUnavailable(_) => "reference join",
            PipelineError::Geometry { .. } | PipelineError::Render { .. } => "render",
            PipelineError::Export(_) => "export",
            PipelineError::Config(_) => "config",
        }
    }
}

impl From<rusqlite::Error> for PipelineError {
    fn from(err: rusqlite::Error) -> Self {
        PipelineError::Export(err.to_string())
    }
}

impl From<csv::Error> for PipelineError {
    fn from(err: csv::Error) -> Self {
        PipelineError::Export(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
