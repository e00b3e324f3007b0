// 👥 Population by region - census API + territory supplements
//
// The ACS state endpoint covers the 50 states, DC and Puerto Rico. Guam,
// the U.S. Virgin Islands and the Northern Mariana Islands are not in it,
// so their 2020 Census counts are filled in by hand.

use crate::config::CensusConfig;
use crate::error::{PipelineError, Result};
use std::collections::HashMap;
use std::time::Duration;

/// ACS total population variable
pub const POPULATION_VARIABLE: &str = "B01003_001E";

/// 2020 Census counts for territories the ACS endpoint does not return
pub const TERRITORY_POPULATIONS: &[(&str, u64)] = &[
    ("Guam", 153_836),
    ("U.S. Virgin Islands", 87_146),
    ("Northern Mariana Islands", 47_329),
];

// ============================================================================
// POPULATION TABLE
// ============================================================================

/// Population keyed by full region name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopulationTable {
    by_name: HashMap<String, u64>,
}

impl PopulationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, population: u64) {
        self.by_name.insert(name.trim().to_string(), population);
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.by_name.get(name.trim()).copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Add the hand-entered territory counts without overriding fetched ones
    pub fn with_territory_supplements(mut self) -> Self {
        for (name, population) in TERRITORY_POPULATIONS {
            self.by_name
                .entry(name.to_string())
                .or_insert(*population);
        }
        self
    }
}

// ============================================================================
// POPULATION SOURCE
// ============================================================================

pub trait PopulationSource {
    /// Fetch region populations; DataUnavailable when the source can't answer
    fn fetch(&self) -> Result<PopulationTable>;
}

/// US Census Bureau data API (ACS 5-year)
pub struct CensusClient {
    config: CensusConfig,
    client: reqwest::blocking::Client,
}

impl CensusClient {
    pub fn new(config: CensusConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PipelineError::DataUnavailable(e.to_string()))?;

        Ok(CensusClient { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}/acs/acs5",
            self.config.base_url.trim_end_matches('/'),
            self.config.year
        )
    }
}

impl PopulationSource for CensusClient {
    fn fetch(&self) -> Result<PopulationTable> {
        let url = self.endpoint();
        tracing::info!(url = %url, year = self.config.year, "fetching population");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("get", format!("NAME,{}", POPULATION_VARIABLE).as_str()),
                ("for", "state:*"),
                ("key", self.config.api_key.as_str()),
            ])
            .send()
            .map_err(|e| PipelineError::DataUnavailable(format!("census request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::DataUnavailable(format!(
                "census API answered {}",
                status
            )));
        }

        let body = response
            .text()
            .map_err(|e| PipelineError::DataUnavailable(format!("census body unreadable: {}", e)))?;

        let table = parse_census_response(&body)?;
        tracing::info!(regions = table.len(), "population fetched");
        Ok(table)
    }
}

/// Parse the census array-of-arrays payload
///
/// First row is the header; the name and population columns are located by
/// header text so column order changes don't break us.
pub fn parse_census_response(body: &str) -> Result<PopulationTable> {
    let rows: Vec<Vec<serde_json::Value>> = serde_json::from_str(body).map_err(|e| {
        PipelineError::DataUnavailable(format!("census payload is not a JSON table: {}", e))
    })?;

    let mut rows = rows.into_iter();
    let header = rows
        .next()
        .ok_or_else(|| PipelineError::DataUnavailable("census payload is empty".to_string()))?;

    let column = |wanted: &str| {
        header
            .iter()
            .position(|h| h.as_str() == Some(wanted))
            .ok_or_else(|| {
                PipelineError::DataUnavailable(format!("census payload has no {} column", wanted))
            })
    };
    let name_idx = column("NAME")?;
    let pop_idx = column(POPULATION_VARIABLE)?;

    let mut table = PopulationTable::new();
    for row in rows {
        let name = row.get(name_idx).and_then(|v| v.as_str());
        let population = row.get(pop_idx).and_then(|v| match v {
            serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
            serde_json::Value::Number(n) => n.as_u64(),
            _ => None,
        });

        match (name, population) {
            (Some(name), Some(population)) => table.insert(name, population),
            _ => tracing::warn!(row = ?row, "skipping census row without name or population"),
        }
    }

    if table.is_empty() {
        return Err(PipelineError::DataUnavailable(
            "census payload has no usable rows".to_string(),
        ));
    }

    Ok(table)
}

/// Fixed table, for tests and offline runs
pub struct StaticPopulation(pub PopulationTable);

impl PopulationSource for StaticPopulation {
    fn fetch(&self) -> Result<PopulationTable> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[["NAME","B01003_001E","state"],
        ["Texas","28260856","48"],
        ["California","39283497","06"],
        ["Puerto Rico","3193694","72"],
        ["Nowhere",null,"99"]]"#;

    #[test]
    fn test_parse_census_response() {
        let table = parse_census_response(SAMPLE).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.get("Texas"), Some(28_260_856));
        assert_eq!(table.get("California"), Some(39_283_497));
        assert_eq!(table.get("Nowhere"), None);
    }

    #[test]
    fn test_parse_finds_columns_by_header() {
        let body = r#"[["state","B01003_001E","NAME"],["02","731158","Alaska"]]"#;
        let table = parse_census_response(body).unwrap();
        assert_eq!(table.get("Alaska"), Some(731_158));
    }

    #[test]
    fn test_unusable_payloads_are_data_unavailable() {
        for body in [
            "<html>Invalid Key</html>",
            "[]",
            r#"[["NAME","state"],["Texas","48"]]"#,
            r#"[["NAME","B01003_001E"]]"#,
        ] {
            let err = parse_census_response(body).unwrap_err();
            assert!(
                matches!(err, PipelineError::DataUnavailable(_)),
                "body {:?} gave {:?}",
                body,
                err
            );
        }
    }

    #[test]
    fn test_territory_supplements() {
        let mut table = PopulationTable::new();
        table.insert("Guam", 1);
        let table = table.with_territory_supplements();

        // fetched value wins
        assert_eq!(table.get("Guam"), Some(1));
        assert_eq!(table.get("U.S. Virgin Islands"), Some(87_146));
        assert_eq!(table.get("Northern Mariana Islands"), Some(47_329));
    }

    #[test]
    fn test_unreachable_service_is_data_unavailable() {
        let client = CensusClient::new(CensusConfig {
            api_key: "test".to_string(),
            year: 2019,
            // Port 9 (discard) on localhost: connection refused
            base_url: "http://127.0.0.1:9".to_string(),
        })
        .unwrap();

        let err = client.fetch().unwrap_err();
        assert!(matches!(err, PipelineError::DataUnavailable(_)));
    }
}
