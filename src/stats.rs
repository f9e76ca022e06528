use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::merge::MergeOutcome;
use crate::parser::Parsed;
use crate::records::{PriceRecord, StationRecord};

/// Counts describing one pipeline run. Appended as a CSV row per run.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct RunStats {
    pub timestamp: DateTime<Utc>,
    pub prices_extracted_on: Option<NaiveDate>,
    pub stations_extracted_on: Option<NaiveDate>,

    // prices
    pub price_rows: usize,
    pub price_rows_rejected: usize,

    // stations
    pub station_rows: usize,
    pub station_rows_rejected: usize,
    pub stations_without_prices: usize,
    pub stations_invalid_coordinates: usize,

    pub features: usize,
}

impl RunStats {
    pub fn from_run(
        prices: &Parsed<PriceRecord>,
        stations: &Parsed<StationRecord>,
        outcome: &MergeOutcome,
    ) -> Self {
        RunStats {
            timestamp: Utc::now(),
            prices_extracted_on: prices.extracted_on,
            stations_extracted_on: stations.extracted_on,
            price_rows: prices.total_rows(),
            price_rows_rejected: prices.rejected,
            station_rows: stations.total_rows(),
            station_rows_rejected: stations.rejected,
            stations_without_prices: outcome.without_prices,
            stations_invalid_coordinates: outcome.invalid_coordinates,
            features: outcome.stations.len(),
        }
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    /// Share of registry rows that made it into the output.
    pub fn coverage_pct(&self) -> f64 {
        Self::pct(self.features, self.station_rows)
    }
}
