//! GeoJSON document built from merged stations.
//!
//! Property names follow the MIMIT column names the map front-end reads
//! (`idImpianto`, `Gestore`, ...). Field order in the structs is the order
//! they are serialized in.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::merge::EnrichedStation;
use crate::records::StationId;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub struct Feature {
    pub geometry: Geometry,
    pub properties: StationProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Geometry {
    /// `[longitude, latitude]`, GeoJSON axis order.
    Point { coordinates: [f64; 2] },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationProperties {
    #[serde(rename = "idImpianto")]
    pub station_id: StationId,
    #[serde(rename = "Gestore")]
    pub operator_name: String,
    #[serde(rename = "Bandiera")]
    pub brand: String,
    #[serde(rename = "TipoImpianto")]
    pub kind: String,
    #[serde(rename = "NomeImpianto")]
    pub name: String,
    #[serde(rename = "Indirizzo")]
    pub address: String,
    #[serde(rename = "Comune")]
    pub municipality: String,
    #[serde(rename = "Provincia")]
    pub province: String,
    pub prices: BTreeMap<String, f64>,
    #[serde(rename = "priceDates")]
    pub price_dates: BTreeMap<String, String>,
}

impl From<&EnrichedStation> for Feature {
    fn from(enriched: &EnrichedStation) -> Self {
        let station = &enriched.station;

        let mut prices = BTreeMap::new();
        let mut price_dates = BTreeMap::new();
        for (category, entry) in &enriched.prices {
            prices.insert(category.clone(), entry.price);
            price_dates.insert(category.clone(), entry.last_updated.clone());
        }

        Feature {
            geometry: Geometry::Point {
                coordinates: [station.longitude, station.latitude],
            },
            properties: StationProperties {
                station_id: station.station_id,
                operator_name: station.operator_name.clone(),
                brand: station.brand.clone(),
                kind: station.kind.clone(),
                name: station.name.clone(),
                address: station.address.clone(),
                municipality: station.municipality.clone(),
                province: station.province.clone(),
                prices,
                price_dates,
            },
        }
    }
}

impl FeatureCollection {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Projects merged stations into a `FeatureCollection`, one feature per
/// station, in input order.
pub fn emit(stations: &[EnrichedStation]) -> FeatureCollection {
    FeatureCollection {
        features: stations.iter().map(Feature::from).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::{PriceEntry, PriceMap};
    use crate::records::StationRecord;
    use serde_json::json;

    fn enriched() -> EnrichedStation {
        let mut prices = PriceMap::new();
        prices.insert(
            "Gasolio".to_string(),
            PriceEntry {
                price: 1.75,
                last_updated: "02/01/2025".to_string(),
            },
        );
        prices.insert(
            "Benzina".to_string(),
            PriceEntry {
                price: 1.85,
                last_updated: "01/01/2025".to_string(),
            },
        );

        EnrichedStation {
            station: StationRecord {
                station_id: 1001,
                latitude: 41.9,
                longitude: 12.5,
                operator_name: "Rossi Srl".to_string(),
                brand: "Agip Eni".to_string(),
                kind: "Stradale".to_string(),
                name: "Eni Roma".to_string(),
                address: "Via Appia 1".to_string(),
                municipality: "ROMA".to_string(),
                province: "RM".to_string(),
            },
            prices,
        }
    }

    #[test]
    fn test_emit_document_shape() {
        let doc = emit(&[enriched()]);
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(
            value,
            json!({
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [12.5, 41.9]},
                    "properties": {
                        "idImpianto": 1001,
                        "Gestore": "Rossi Srl",
                        "Bandiera": "Agip Eni",
                        "TipoImpianto": "Stradale",
                        "NomeImpianto": "Eni Roma",
                        "Indirizzo": "Via Appia 1",
                        "Comune": "ROMA",
                        "Provincia": "RM",
                        "prices": {"Benzina": 1.85, "Gasolio": 1.75},
                        "priceDates": {"Benzina": "01/01/2025", "Gasolio": "02/01/2025"}
                    }
                }]
            })
        );
    }

    #[test]
    fn test_property_order() {
        let doc = emit(&[enriched()]);
        let text = serde_json::to_string(&doc).unwrap();

        let keys = [
            "\"idImpianto\"",
            "\"Gestore\"",
            "\"Bandiera\"",
            "\"TipoImpianto\"",
            "\"NomeImpianto\"",
            "\"Indirizzo\"",
            "\"Comune\"",
            "\"Provincia\"",
            "\"prices\"",
            "\"priceDates\"",
        ];
        let positions: Vec<usize> = keys.iter().map(|k| text.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(text.starts_with("{\"type\":\"FeatureCollection\""));
    }

    #[test]
    fn test_missing_strings_serialize_as_empty() {
        let mut station = enriched();
        station.station.brand = String::new();
        let value = serde_json::to_value(emit(&[station])).unwrap();
        assert_eq!(value["features"][0]["properties"]["Bandiera"], json!(""));
    }

    #[test]
    fn test_emit_empty() {
        let doc = emit(&[]);
        assert!(doc.is_empty());
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({"type": "FeatureCollection", "features": []})
        );
    }

    #[test]
    fn test_emit_is_deterministic() {
        let stations = vec![enriched(), enriched()];
        let first = serde_json::to_string(&emit(&stations)).unwrap();
        let second = serde_json::to_string(&emit(&stations)).unwrap();
        assert_eq!(first, second);
        assert_eq!(emit(&stations).len(), 2);
    }
}
