//! Row types for the two MIMIT datasets.
//!
//! [`PriceRow`] and [`StationRow`] mirror the CSV columns as text. They are
//! converted once into the typed [`PriceRecord`] and [`StationRecord`]; a row
//! whose numeric fields don't coerce is rejected with a [`RecordError`].

use serde::Deserialize;
use thiserror::Error;

/// Numeric station identifier (`idImpianto`).
pub type StationId = u64;

/// Why a single row could not become a typed record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("invalid station id '{0}'")]
    InvalidStationId(String),

    #[error("invalid price '{value}' for station {station_id}")]
    InvalidPrice { station_id: StationId, value: String },

    #[error("invalid {field} '{value}' for station {station_id}")]
    InvalidCoordinate {
        station_id: StationId,
        field: &'static str,
        value: String,
    },
}

/// One row of `prezzo_alle_8.csv`.
///
/// The `isSelf` column is not read: self-service and attended listings are
/// pooled, so a station's price for a category is the cheaper of the two.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriceRow {
    #[serde(rename = "idImpianto", default)]
    pub station_id: String,
    #[serde(rename = "descCarburante", default)]
    pub fuel_type: String,
    #[serde(rename = "prezzo", default)]
    pub price: String,
    #[serde(rename = "dtComu", default)]
    pub last_updated: Option<String>,
}

/// One row of `anagrafica_impianti_attivi.csv`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StationRow {
    #[serde(rename = "idImpianto", default)]
    pub station_id: String,
    #[serde(rename = "Gestore", default)]
    pub operator_name: Option<String>,
    #[serde(rename = "Bandiera", default)]
    pub brand: Option<String>,
    #[serde(rename = "Tipo Impianto", default)]
    pub kind: Option<String>,
    #[serde(rename = "Nome Impianto", default)]
    pub name: Option<String>,
    #[serde(rename = "Indirizzo", default)]
    pub address: Option<String>,
    #[serde(rename = "Comune", default)]
    pub municipality: Option<String>,
    #[serde(rename = "Provincia", default)]
    pub province: Option<String>,
    #[serde(rename = "Latitudine", default)]
    pub latitude: String,
    #[serde(rename = "Longitudine", default)]
    pub longitude: String,
}

/// A single price listing for one fuel at one station.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
    pub station_id: StationId,
    pub fuel_type: String,
    pub price: f64,
    /// Opaque, passed through untouched.
    pub last_updated: String,
}

/// A registered fuel station.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StationRecord {
    pub station_id: StationId,
    pub latitude: f64,
    pub longitude: f64,
    pub operator_name: String,
    pub brand: String,
    pub kind: String,
    pub name: String,
    pub address: String,
    pub municipality: String,
    pub province: String,
}

fn parse_station_id(raw: &str) -> Result<StationId, RecordError> {
    raw.trim()
        .parse()
        .map_err(|_| RecordError::InvalidStationId(raw.to_string()))
}

/// Parses a decimal field, rejecting NaN and infinities.
fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

impl TryFrom<PriceRow> for PriceRecord {
    type Error = RecordError;

    fn try_from(row: PriceRow) -> Result<Self, Self::Error> {
        let station_id = parse_station_id(&row.station_id)?;
        let price = parse_decimal(&row.price).ok_or_else(|| RecordError::InvalidPrice {
            station_id,
            value: row.price.clone(),
        })?;

        Ok(PriceRecord {
            station_id,
            fuel_type: row.fuel_type,
            price,
            last_updated: row.last_updated.unwrap_or_default(),
        })
    }
}

impl TryFrom<StationRow> for StationRecord {
    type Error = RecordError;

    fn try_from(row: StationRow) -> Result<Self, Self::Error> {
        let station_id = parse_station_id(&row.station_id)?;

        let coordinate = |field: &'static str, value: &str| {
            parse_decimal(value).ok_or_else(|| RecordError::InvalidCoordinate {
                station_id,
                field,
                value: value.to_string(),
            })
        };
        let latitude = coordinate("latitude", &row.latitude)?;
        let longitude = coordinate("longitude", &row.longitude)?;

        Ok(StationRecord {
            station_id,
            latitude,
            longitude,
            operator_name: row.operator_name.unwrap_or_default(),
            brand: row.brand.unwrap_or_default(),
            kind: row.kind.unwrap_or_default(),
            name: row.name.unwrap_or_default(),
            address: row.address.unwrap_or_default(),
            municipality: row.municipality.unwrap_or_default(),
            province: row.province.unwrap_or_default(),
        })
    }
}
