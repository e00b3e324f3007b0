// 🔗 Reference Joiner - region names + population
//
// code → name via the crosswalk, then name → population.
// Unmatched regions stay in the table with null name/population; only the
// Renderer drops rows, and only per chart.

pub mod crosswalk;
pub mod population;

pub use population::{
    parse_census_response, CensusClient, PopulationSource, PopulationTable, StaticPopulation,
    TERRITORY_POPULATIONS,
};

use crate::aggregator::RegionSummary;
use crate::error::Result;

/// Fetch population from `source` and enrich every summary row
///
/// Fails with DataUnavailable when the source does; never proceeds with an
/// all-null population column.
pub fn join_reference<P: PopulationSource>(
    summaries: Vec<RegionSummary>,
    source: &P,
) -> Result<Vec<RegionSummary>> {
    let populations = source.fetch()?.with_territory_supplements();
    Ok(join_with_table(summaries, &populations))
}

/// Enrich summaries from an already fetched population table
pub fn join_with_table(
    summaries: Vec<RegionSummary>,
    populations: &PopulationTable,
) -> Vec<RegionSummary> {
    let mut unnamed = 0;
    let mut no_population = 0;

    let joined: Vec<RegionSummary> = summaries
        .into_iter()
        .map(|mut summary| {
            summary.region_name = crosswalk::name_for(&summary.region_code).map(str::to_string);
            summary.population = summary
                .region_name
                .as_deref()
                .and_then(|name| populations.get(name));

            if summary.region_name.is_none() {
                unnamed += 1;
            }
            if summary.population.is_none() {
                no_population += 1;
            }
            summary
        })
        .collect();

    if unnamed > 0 {
        tracing::warn!(regions = unnamed, "region codes missing from crosswalk");
    }
    if no_population > 0 {
        tracing::warn!(regions = no_population, "regions without population");
    }

    joined
}
