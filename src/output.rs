//! Persistence for the GeoJSON document and run statistics.
//!
//! Supports writing the document to disk (optionally gzipped), uploading
//! JSON to S3, and appending run statistics to a CSV.

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::geojson::FeatureCollection;
use crate::stats::RunStats;
use csv::WriterBuilder;

/// Serializes the document as pretty-printed UTF-8 JSON.
///
/// Non-ASCII text (accented street names) is written verbatim, not escaped.
pub fn to_pretty_json(doc: &FeatureCollection) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(doc)?)
}

/// Writes the document to `path`, or to `path.gz` gzip-compressed when `gzip`
/// is set. Returns the path actually written.
pub fn write_geojson(path: &str, doc: &FeatureCollection, gzip: bool) -> Result<String> {
    let json = to_pretty_json(doc)?;

    let (body, target) = if gzip {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json)?;
        (encoder.finish()?, format!("{path}.gz"))
    } else {
        (json, path.to_string())
    };

    if let Some(parent) = Path::new(&target).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(&target, &body).with_context(|| format!("failed to write {target}"))?;

    info!(path = %target, features = doc.len(), bytes = body.len(), "GeoJSON written");
    Ok(target)
}

/// Serializes a value to JSON and uploads it to an S3 bucket with `application/json` content type.
pub async fn write_json_to_s3(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    value: &impl Serialize,
) -> Result<()> {
    let body = serde_json::to_vec(value)?;

    client
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(body.into())
        .content_type("application/json")
        .send()
        .await
        .with_context(|| format!("S3 upload to s3://{bucket}/{key} failed"))?;

    info!(bucket, key, "Uploaded to S3");
    Ok(())
}

/// Logs run statistics as pretty-printed JSON.
pub fn print_json(stats: &RunStats) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(stats)?);
    Ok(())
}

/// Appends a [`RunStats`] record as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &str, stats: &RunStats) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(stats)?;
    writer.flush()?;

    Ok(())
}
