// ⚙️ Run configuration - read from the environment
//
// main() loads .env first (dotenvy), then calls Config::from_env().
// The census API key travels inside Config; nothing is cached globally.

use crate::error::{PipelineError, Result};
use std::path::PathBuf;

pub const DEFAULT_WORKBOOK: &str = "data/DISP_AllStatesAndTerritories.xlsx";
pub const DEFAULT_HEXGRID: &str = "data/us_states_hexgrid.geojson";
pub const DEFAULT_HEXGRID_NAME_FIELD: &str = "google_name";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_CENSUS_YEAR: u16 = 2019;
pub const DEFAULT_CENSUS_BASE_URL: &str = "https://api.census.gov/data";

#[derive(Debug, Clone)]
pub struct Config {
    pub workbook_path: PathBuf,
    pub hexgrid_path: PathBuf,
    /// GeoJSON property holding the region name
    pub hexgrid_name_field: String,
    pub output_dir: PathBuf,
    /// Optional SQLite export target
    pub summary_db: Option<PathBuf>,
    pub census: CensusConfig,
}

#[derive(Debug, Clone)]
pub struct CensusConfig {
    pub api_key: String,
    pub year: u16,
    pub base_url: String,
}

impl Config {
    /// Build from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (tests pass a HashMap here)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("CENSUS_API_KEY")
            .ok_or_else(|| PipelineError::Config("CENSUS_API_KEY is not set".to_string()))?;

        let year = match get("CENSUS_YEAR") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                PipelineError::Config(format!("CENSUS_YEAR is not a year: {}", raw))
            })?,
            None => DEFAULT_CENSUS_YEAR,
        };

        Ok(Config {
            workbook_path: get("LESO_WORKBOOK")
                .unwrap_or_else(|| DEFAULT_WORKBOOK.to_string())
                .into(),
            hexgrid_path: get("LESO_HEXGRID")
                .unwrap_or_else(|| DEFAULT_HEXGRID.to_string())
                .into(),
            hexgrid_name_field: get("LESO_HEXGRID_NAME_FIELD")
                .unwrap_or_else(|| DEFAULT_HEXGRID_NAME_FIELD.to_string()),
            output_dir: get("LESO_OUTPUT_DIR")
                .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string())
                .into(),
            summary_db: get("LESO_SUMMARY_DB").map(PathBuf::from),
            census: CensusConfig {
                api_key,
                year,
                base_url: get("CENSUS_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_CENSUS_BASE_URL.to_string()),
            },
        })
    }
}
