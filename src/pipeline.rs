//! End-to-end processing of the two exports into one GeoJSON document.

use anyhow::Result;
use tracing::info;

use crate::fuel::FuelTable;
use crate::geojson::{FeatureCollection, emit};
use crate::merge::merge_outcome;
use crate::parser::{CsvLayout, parse_prices, parse_stations};
use crate::stats::RunStats;

/// Parses both exports, merges them and emits the document.
///
/// # Errors
///
/// Only whole-file problems (unreadable header) fail the run; bad rows are
/// dropped and counted in the returned [`RunStats`].
#[tracing::instrument(skip_all, fields(prices_bytes = prices.len(), stations_bytes = stations.len()))]
pub fn process(
    table: &FuelTable,
    prices: &[u8],
    stations: &[u8],
    layout: CsvLayout,
) -> Result<(FeatureCollection, RunStats)> {
    let prices = parse_prices(prices, layout)?;
    let stations = parse_stations(stations, layout)?;

    let outcome = merge_outcome(table, &prices.records, &stations.records);
    let doc = emit(&outcome.stations);
    let stats = RunStats::from_run(&prices, &stations, &outcome);

    info!(
        features = doc.len(),
        coverage_pct = stats.coverage_pct(),
        "Pipeline finished"
    );

    Ok((doc, stats))
}
