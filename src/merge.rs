//! Joins price listings to stations and cleans the result.
//!
//! Prices are folded into one [`PriceMap`] per station (cheapest price per
//! fuel category), attached to the matching station, and stations without
//! prices or with implausible coordinates are dropped.

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::fuel::{FuelTable, default_table};
use crate::records::{PriceRecord, StationId, StationRecord};

/// Inclusive latitude range accepted as a sanity filter for Italian stations.
pub const LATITUDE_RANGE: (f64, f64) = (35.0, 48.0);
/// Inclusive longitude range accepted as a sanity filter for Italian stations.
pub const LONGITUDE_RANGE: (f64, f64) = (6.0, 19.0);

/// Cheapest observed price for one category, with the date of that listing.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceEntry {
    pub price: f64,
    pub last_updated: String,
}

/// Category name to cheapest price. Sorted so output is deterministic.
pub type PriceMap = BTreeMap<String, PriceEntry>;

/// A station that survived the join and the coordinate filter.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedStation {
    pub station: StationRecord,
    pub prices: PriceMap,
}

/// Result of [`merge_outcome`]: the surviving stations plus what was dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    pub stations: Vec<EnrichedStation>,
    pub without_prices: usize,
    pub invalid_coordinates: usize,
}

/// Builds the per-station price maps in a single pass.
///
/// On equal prices the first-seen listing (and its date) is kept.
pub fn build_price_maps(
    table: &FuelTable,
    prices: &[PriceRecord],
) -> HashMap<StationId, PriceMap> {
    let mut maps: HashMap<StationId, PriceMap> = HashMap::new();

    for record in prices {
        let category = table.categorize(&record.fuel_type);
        let map = maps.entry(record.station_id).or_default();

        match map.get_mut(category) {
            Some(entry) => {
                if record.price < entry.price {
                    entry.price = record.price;
                    entry.last_updated.clone_from(&record.last_updated);
                }
            }
            None => {
                map.insert(
                    category.to_string(),
                    PriceEntry {
                        price: record.price,
                        last_updated: record.last_updated.clone(),
                    },
                );
            }
        }
    }

    maps
}

/// Returns `true` if the coordinates are finite, non-zero and inside the
/// accepted bounding box (bounds inclusive).
pub fn has_valid_coordinates(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && latitude != 0.0
        && longitude != 0.0
        && (LATITUDE_RANGE.0..=LATITUDE_RANGE.1).contains(&latitude)
        && (LONGITUDE_RANGE.0..=LONGITUDE_RANGE.1).contains(&longitude)
}

/// Merges prices into stations using `table`, reporting dropped counts.
///
/// Input order of `stations` is preserved in the output.
#[tracing::instrument(skip_all, fields(prices = prices.len(), stations = stations.len()))]
pub fn merge_outcome(
    table: &FuelTable,
    prices: &[PriceRecord],
    stations: &[StationRecord],
) -> MergeOutcome {
    let price_maps = build_price_maps(table, prices);
    debug!(stations_with_prices = price_maps.len(), "Grouped prices by station");

    let mut outcome = MergeOutcome::default();

    for station in stations {
        // Duplicate registry ids each get their own copy of the map.
        let Some(prices) = price_maps.get(&station.station_id) else {
            outcome.without_prices += 1;
            continue;
        };

        if !has_valid_coordinates(station.latitude, station.longitude) {
            debug!(
                station_id = station.station_id,
                latitude = station.latitude,
                longitude = station.longitude,
                "Dropping station with invalid coordinates"
            );
            outcome.invalid_coordinates += 1;
            continue;
        }

        outcome.stations.push(EnrichedStation {
            station: station.clone(),
            prices: prices.clone(),
        });
    }

    info!(
        kept = outcome.stations.len(),
        without_prices = outcome.without_prices,
        invalid_coordinates = outcome.invalid_coordinates,
        "Merged prices into stations"
    );

    outcome
}

/// Merges prices into stations using a caller-supplied fuel table.
pub fn merge_with(
    table: &FuelTable,
    prices: &[PriceRecord],
    stations: &[StationRecord],
) -> Vec<EnrichedStation> {
    merge_outcome(table, prices, stations).stations
}

/// Merges prices into stations using the built-in fuel table.
pub fn merge(prices: &[PriceRecord], stations: &[StationRecord]) -> Vec<EnrichedStation> {
    merge_with(default_table(), prices, stations)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(station_id: StationId, fuel: &str, price: f64, date: &str) -> PriceRecord {
        PriceRecord {
            station_id,
            fuel_type: fuel.to_string(),
            price,
            last_updated: date.to_string(),
        }
    }

    fn station(station_id: StationId, latitude: f64, longitude: f64) -> StationRecord {
        StationRecord {
            station_id,
            latitude,
            longitude,
            name: format!("Station {station_id}"),
            ..Default::default()
        }
    }

    #[test]
    fn test_keeps_cheapest_price_and_its_date() {
        let prices = vec![
            price(1, "Gasolio", 1.899, "01/01/2025"),
            price(1, "Blue Diesel", 1.750, "02/01/2025"),
        ];
        let merged = merge(&prices, &[station(1, 41.9, 12.5)]);

        assert_eq!(merged.len(), 1);
        let entry = &merged[0].prices["Gasolio"];
        assert_eq!(entry.price, 1.750);
        assert_eq!(entry.last_updated, "02/01/2025");
    }

    #[test]
    fn test_higher_price_does_not_replace() {
        let prices = vec![
            price(1, "Benzina", 1.750, "first"),
            price(1, "V-Power", 1.999, "second"),
        ];
        let maps = build_price_maps(&FuelTable::default(), &prices);
        let entry = &maps[&1]["Benzina"];
        assert_eq!(entry.price, 1.750);
        assert_eq!(entry.last_updated, "first");
    }

    #[test]
    fn test_equal_price_keeps_first_seen_date() {
        let prices = vec![
            price(1, "GPL", 0.799, "first"),
            price(1, "GPL", 0.799, "second"),
        ];
        let maps = build_price_maps(&FuelTable::default(), &prices);
        assert_eq!(maps[&1]["GPL"].last_updated, "first");
    }

    #[test]
    fn test_unknown_fuel_becomes_own_category() {
        let prices = vec![price(1, "Idrogeno", 15.9, "d")];
        let maps = build_price_maps(&FuelTable::default(), &prices);
        assert_eq!(maps[&1]["Idrogeno"].price, 15.9);
    }

    #[test]
    fn test_categories_are_tracked_per_station() {
        let prices = vec![
            price(1, "Benzina", 1.8, "a"),
            price(2, "Benzina", 1.7, "b"),
            price(1, "Metano", 1.4, "c"),
        ];
        let maps = build_price_maps(&FuelTable::default(), &prices);
        assert_eq!(maps[&1].len(), 2);
        assert_eq!(maps[&2].len(), 1);
        assert_eq!(maps[&1]["Benzina"].price, 1.8);
    }

    #[test]
    fn test_station_without_prices_is_dropped() {
        let prices = vec![price(1, "Benzina", 1.8, "a")];
        let outcome = merge_outcome(
            &FuelTable::default(),
            &prices,
            &[station(1, 41.9, 12.5), station(2, 45.4, 9.2)],
        );
        assert_eq!(outcome.stations.len(), 1);
        assert_eq!(outcome.stations[0].station.station_id, 1);
        assert_eq!(outcome.without_prices, 1);
    }

    #[test]
    fn test_zero_latitude_is_dropped() {
        let prices = vec![price(1, "Benzina", 1.8, "a"), price(2, "Benzina", 1.8, "a")];
        let outcome = merge_outcome(
            &FuelTable::default(),
            &prices,
            &[station(1, 0.0, 12.5), station(2, 41.9, 12.5)],
        );
        assert_eq!(outcome.stations.len(), 1);
        assert_eq!(outcome.stations[0].station.station_id, 2);
        assert_eq!(outcome.invalid_coordinates, 1);
    }

    #[test]
    fn test_coordinate_bounds_are_inclusive() {
        assert!(has_valid_coordinates(35.0, 6.0));
        assert!(has_valid_coordinates(48.0, 19.0));
        assert!(!has_valid_coordinates(34.99, 12.0));
        assert!(!has_valid_coordinates(48.01, 12.0));
        assert!(!has_valid_coordinates(41.9, 5.99));
        assert!(!has_valid_coordinates(41.9, 19.01));
        assert!(!has_valid_coordinates(41.9, 0.0));
        assert!(!has_valid_coordinates(f64::NAN, 12.5));
    }

    #[test]
    fn test_swapped_coordinates_are_dropped() {
        let prices = vec![price(1, "Benzina", 1.8, "a")];
        assert!(merge(&prices, &[station(1, 12.5, 41.9)]).is_empty());
    }

    #[test]
    fn test_output_preserves_station_order() {
        let prices = vec![
            price(3, "Benzina", 1.8, "a"),
            price(1, "Benzina", 1.8, "a"),
            price(2, "Benzina", 1.8, "a"),
        ];
        let stations = vec![
            station(2, 45.0, 9.0),
            station(3, 40.0, 16.0),
            station(1, 41.9, 12.5),
        ];
        let ids: Vec<StationId> = merge(&prices, &stations)
            .iter()
            .map(|s| s.station.station_id)
            .collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_merge_with_custom_table() {
        let mut extra = HashMap::new();
        extra.insert("Idrogeno".to_string(), vec!["H2".to_string()]);
        let table = FuelTable::default().with_aliases(extra);

        let prices = vec![price(1, "H2", 15.9, "a")];
        let merged = merge_with(&table, &prices, &[station(1, 41.9, 12.5)]);
        assert!(merged[0].prices.contains_key("Idrogeno"));
    }

    #[test]
    fn test_duplicate_registry_id_gets_same_prices() {
        let prices = vec![
            price(1, "Benzina", 1.8, "a"),
            price(1, "Gasolio", 1.7, "b"),
        ];
        let mut relocated = station(1, 45.4, 9.2);
        relocated.name = "Station 1 bis".to_string();

        let merged = merge(&prices, &[station(1, 41.9, 12.5), relocated]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].station.name, "Station 1");
        assert_eq!(merged[1].station.name, "Station 1 bis");
        assert_eq!(merged[0].prices, merged[1].prices);
        assert_eq!(merged[1].prices["Gasolio"].price, 1.7);
    }
}
