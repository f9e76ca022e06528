//! Acquisition of the raw export files, from disk or over HTTP.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result};
use bytes::Bytes;
use tracing::{debug, info};

/// Downloads `url` and returns the body.
///
/// # Errors
///
/// Fails on transport errors and on non-success HTTP statuses.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Bytes> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client
        .execute(req)
        .await
        .with_context(|| format!("request to {url} failed"))?;
    let status = resp.status();
    if !status.is_success() {
        anyhow::bail!("{url} returned status {status}");
    }

    let body = resp.bytes().await?;
    debug!(bytes = body.len(), "Response body received");
    Ok(body)
}

/// Loads an export from a local path or fetches it when `source` is an
/// `http`/`https` URL.
#[tracing::instrument(skip(client))]
pub async fn load_source<C: HttpClient>(client: &C, source: &str) -> Result<Bytes> {
    let bytes = if is_url(source) {
        fetch_bytes(client, source).await?
    } else {
        let data = std::fs::read(source).with_context(|| format!("failed to read {source}"))?;
        Bytes::from(data)
    };
    info!(bytes = bytes.len(), "Loaded source");
    Ok(bytes)
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}
