//! CSV parser for the MIMIT price and station exports.
//!
//! Both files start with a one-line preamble (`Estrazione del 2025-01-15`)
//! before the `;`-separated header row.

use anyhow::{Result, bail};
use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::records::{PriceRecord, PriceRow, RecordError, StationRecord, StationRow};

const STATION_ID_COLUMN: &str = "idImpianto";

/// Physical layout of an export file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvLayout {
    pub delimiter: u8,
    /// Lines to skip before the header row.
    pub preamble_lines: usize,
}

impl Default for CsvLayout {
    fn default() -> Self {
        Self {
            delimiter: b';',
            preamble_lines: 1,
        }
    }
}

/// Records that survived coercion, plus how many rows did not.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub records: Vec<T>,
    pub rejected: usize,
    /// Extraction date announced in the preamble, if any.
    pub extracted_on: Option<NaiveDate>,
}

impl<T> Parsed<T> {
    pub fn total_rows(&self) -> usize {
        self.records.len() + self.rejected
    }
}

/// Parses `prezzo_alle_8.csv`.
///
/// # Errors
///
/// Returns an error if the header row is unreadable or lacks `idImpianto`.
/// Individual bad rows are counted in [`Parsed::rejected`] instead.
pub fn parse_prices(bytes: &[u8], layout: CsvLayout) -> Result<Parsed<PriceRecord>> {
    parse_rows::<PriceRow, PriceRecord>(bytes, layout, "prices")
}

/// Parses `anagrafica_impianti_attivi.csv`.
///
/// # Errors
///
/// Same conditions as [`parse_prices`].
pub fn parse_stations(bytes: &[u8], layout: CsvLayout) -> Result<Parsed<StationRecord>> {
    parse_rows::<StationRow, StationRecord>(bytes, layout, "stations")
}

/// Finds the first `YYYY-MM-DD` or `DD/MM/YYYY` token in a preamble line.
pub fn parse_extraction_date(preamble: &str) -> Option<NaiveDate> {
    preamble.split_whitespace().find_map(|token| {
        NaiveDate::parse_from_str(token, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(token, "%d/%m/%Y"))
            .ok()
    })
}

/// Splits off the first `lines` lines, returning `(preamble, rest)`.
fn split_preamble(bytes: &[u8], lines: usize) -> (&[u8], &[u8]) {
    let mut offset = 0;
    for _ in 0..lines {
        match bytes[offset..].iter().position(|&b| b == b'\n') {
            Some(pos) => offset += pos + 1,
            None => return (bytes, &[]),
        }
    }
    bytes.split_at(offset)
}

fn parse_rows<R, T>(bytes: &[u8], layout: CsvLayout, dataset: &str) -> Result<Parsed<T>>
where
    R: DeserializeOwned,
    T: TryFrom<R, Error = RecordError>,
{
    let (preamble, body) = split_preamble(bytes, layout.preamble_lines);
    let extracted_on = parse_extraction_date(&String::from_utf8_lossy(preamble));

    let mut rdr = ReaderBuilder::new()
        .delimiter(layout.delimiter)
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(body);

    let headers = rdr.headers()?.clone();
    if !headers.iter().any(|h| h == STATION_ID_COLUMN) {
        bail!("{dataset} export has no '{STATION_ID_COLUMN}' column (headers: {headers:?})");
    }

    let mut records = Vec::new();
    let mut rejected = 0;

    for (line, result) in rdr.deserialize::<R>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                debug!(dataset, line, error = %e, "Skipping unreadable row");
                rejected += 1;
                continue;
            }
        };

        match T::try_from(row) {
            Ok(record) => records.push(record),
            Err(e) => {
                debug!(dataset, line, error = %e, "Rejected row");
                rejected += 1;
            }
        }
    }

    if rejected > 0 {
        warn!(dataset, rejected, "Some rows were rejected");
    }
    info!(
        dataset,
        records = records.len(),
        extracted_on = ?extracted_on,
        "Parsed export"
    );

    Ok(Parsed {
        records,
        rejected,
        extracted_on,
    })
}
