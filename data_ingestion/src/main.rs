use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use log::{info, warn};

use data_ingestion::config::{DEFAULT_CONFIG_FILE, IngestionConfig};
use data_ingestion::csv_source::write_series;
use data_ingestion::logger::init_logger;
use data_ingestion::{PriceRequest, PriceSource, YahooFetcher};

/// Download daily price history into a CSV snapshot.
#[derive(Parser, Debug)]
#[command(name = "data_ingestion", version)]
struct Args {
    /// Ticker symbol, e.g. AAPL
    #[arg(long)]
    ticker: String,

    /// First date to include (YYYY-MM-DD)
    #[arg(long)]
    start: NaiveDate,

    /// First date to exclude (YYYY-MM-DD)
    #[arg(long)]
    end: NaiveDate,

    /// Output file; defaults to <csv_dir>/<TICKER>.csv from the config
    #[arg(long)]
    out: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logger();

    let args = Args::parse();
    let cfg = IngestionConfig::from_env(&args.config).context("Failed to load configuration")?;

    let request = PriceRequest::new(&args.ticker, args.start, args.end)?;
    let fetcher = YahooFetcher::new(&cfg.source)?;

    info!("Downloading {} from {} to {}", request.ticker, request.start, request.end);
    let series = fetcher
        .fetch(&request)
        .await
        .with_context(|| format!("Failed to download {}", request.ticker))?;

    if series.is_empty() {
        warn!("No data found for {} between {} and {}", request.ticker, request.start, request.end);
        return Ok(());
    }

    let out = args
        .out
        .unwrap_or_else(|| cfg.source.csv_dir.join(format!("{}.csv", request.ticker)));
    write_series(&out, &series)?;

    info!("Wrote {} rows to {}", series.len(), out.display());
    Ok(())
}
