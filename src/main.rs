//! CLI entry point for the Fuel Finder data pipeline.
//!
//! Downloads the MIMIT price and station exports, merges them and writes a
//! GeoJSON document for the map, optionally uploading it to S3.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use fuel_finder::{
    fetch::{BasicClient, load_source},
    fuel::FuelTable,
    output::{append_record, print_json, write_geojson, write_json_to_s3},
    parser::CsvLayout,
    pipeline::process,
};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const PRICE_URL: &str = "https://www.mimit.gov.it/images/exportCSV/prezzo_alle_8.csv";
const STATIONS_URL: &str =
    "https://www.mimit.gov.it/images/exportCSV/anagrafica_impianti_attivi.csv";

#[derive(Parser)]
#[command(name = "fuel_finder")]
#[command(about = "Builds a GeoJSON map of Italian fuel prices", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch both exports, merge them and write the GeoJSON document
    Process {
        /// Price export: path or URL
        #[arg(long, default_value = PRICE_URL)]
        prices: String,

        /// Station registry export: path or URL
        #[arg(long, default_value = STATIONS_URL)]
        stations: String,

        /// GeoJSON file to write
        #[arg(short, long, default_value = "fuel_data.geojson")]
        output: String,

        /// Gzip the output (appends `.gz` to the file name)
        #[arg(long, default_value_t = false)]
        gzip: bool,

        /// JSON file with extra fuel aliases, e.g. {"Benzina": ["Benzina Super"]}
        #[arg(long)]
        fuel_aliases: Option<String>,

        /// Field delimiter of both exports
        #[arg(long, default_value_t = ';')]
        delimiter: char,

        /// Optional: CSV file to append run statistics to
        #[arg(long)]
        stats_csv: Option<String>,

        /// Optional: S3 bucket to upload the document to (e.g., "my-bucket")
        #[arg(long)]
        s3_bucket: Option<String>,

        /// Object key used with --s3-bucket
        #[arg(long, default_value = "fuel_data.geojson")]
        s3_key: String,
    },
    /// Show the category each raw fuel name maps to
    Categorize {
        /// Raw fuel names as they appear in `descCarburante`
        #[arg(value_name = "NAME", required = true)]
        names: Vec<String>,

        /// JSON file with extra fuel aliases
        #[arg(long)]
        fuel_aliases: Option<String>,
    },
    /// List the fuel categories and their accepted spellings
    Categories {
        /// JSON file with extra fuel aliases
        #[arg(long)]
        fuel_aliases: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _guard = init_tracing()?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            prices,
            stations,
            output,
            gzip,
            fuel_aliases,
            delimiter,
            stats_csv,
            s3_bucket,
            s3_key,
        } => {
            let table = load_table(fuel_aliases.as_deref())?;
            if !delimiter.is_ascii() {
                bail!("delimiter must be a single ASCII character, got {delimiter:?}");
            }
            let layout = CsvLayout {
                delimiter: delimiter as u8,
                ..CsvLayout::default()
            };

            let client = BasicClient::new()?;
            let price_bytes = load_source(&client, &prices).await?;
            let station_bytes = load_source(&client, &stations).await?;

            let (doc, stats) = process(&table, &price_bytes, &station_bytes, layout)?;

            if doc.is_empty() {
                warn!("No stations survived cleaning, writing an empty document");
            }

            write_geojson(&output, &doc, gzip)?;
            print_json(&stats)?;

            if let Some(path) = stats_csv {
                append_record(&path, &stats)?;
            }

            match s3_bucket {
                Some(bucket) if !bucket.is_empty() => {
                    info!(bucket = %bucket, key = %s3_key, "S3 upload enabled");
                    let config = aws_config::load_from_env().await;
                    let s3 = aws_sdk_s3::Client::new(&config);
                    write_json_to_s3(&s3, &bucket, &s3_key, &doc).await?;
                }
                _ => info!("S3 bucket not specified, skipping upload"),
            }
        }
        Commands::Categorize {
            names,
            fuel_aliases,
        } => {
            let table = load_table(fuel_aliases.as_deref())?;
            for name in &names {
                info!(
                    raw = %name,
                    category = table.categorize(name),
                    known = table.is_known(name),
                    "Fuel"
                );
            }
        }
        Commands::Categories { fuel_aliases } => {
            let table = load_table(fuel_aliases.as_deref())?;
            for (category, aliases) in table.iter() {
                info!(category, aliases = ?aliases, "Category");
            }
        }
    }

    Ok(())
}

fn load_table(fuel_aliases: Option<&str>) -> Result<FuelTable> {
    match fuel_aliases {
        Some(path) => {
            info!(path, "Loading fuel aliases");
            FuelTable::load(path)
        }
        None => Ok(FuelTable::default()),
    }
}

/// Logging setup: colored stderr + JSON rolling log file.
///
/// The returned guard flushes the file writer on drop and must be kept alive.
fn init_tracing() -> Result<WorkerGuard> {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/fuel_finder.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("fuel_finder.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}
