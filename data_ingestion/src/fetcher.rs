use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime};
use log::{debug, info, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::config::{SourceConfig, SourceKind};
use crate::csv_source::CsvSource;
use crate::error::DataIngestionError;
use crate::series::{PriceBar, PriceRequest, PriceSeries, validate_bar};

/// Supplies the daily price history for a ticker and date range.
///
/// An unknown ticker or an empty range yields an empty series rather than an error;
/// errors are reserved for transport and upstream failures. Implementations do not retry.
pub trait PriceSource: Send + Sync {
    fn fetch(
        &self,
        request: &PriceRequest,
    ) -> impl Future<Output = Result<PriceSeries, DataIngestionError>> + Send;
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<u64>>>,
}

/// Yahoo uses hyphens instead of dots for share classes (BRK-B, not BRK.B).
fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase().replace('.', "-")
}

fn unix_midnight(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::default()).and_utc().timestamp()
}

/// Daily bars from the Yahoo v8 chart endpoint.
pub struct YahooFetcher {
    client: Client,
    base_url: String,
}

impl YahooFetcher {
    pub fn new(config: &SourceConfig) -> Result<Self, DataIngestionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()?;

        Ok(Self {
            client,
            base_url: config.yahoo_base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl PriceSource for YahooFetcher {
    async fn fetch(&self, request: &PriceRequest) -> Result<PriceSeries, DataIngestionError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, normalize_symbol(&request.ticker));
        debug!("Fetching {} [{}, {}) from {}", request.ticker, request.start, request.end, url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", unix_midnight(request.start).to_string()),
                ("period2", unix_midnight(request.end).to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            info!("No chart data for {}", request.ticker);
            return Ok(PriceSeries::empty());
        }
        if !status.is_success() {
            return Err(DataIngestionError::HttpStatus(status));
        }

        let body: ChartResponse = response.json().await?;
        let bars = extract_ohlc(body)?
            .into_iter()
            .filter(|bar| request.contains(bar.date))
            .collect();

        PriceSeries::new(bars)
    }
}

fn value_at(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten()
}

// Rows with a missing OHLC field are skipped; a repeated date keeps the later row.
fn extract_ohlc(response: ChartResponse) -> Result<Vec<PriceBar>, DataIngestionError> {
    if let Some(error) = response.chart.error {
        if error.code == "Not Found" {
            return Ok(Vec::new());
        }
        return Err(DataIngestionError::ApiError {
            code: error.code,
            description: error.description,
        });
    }

    let Some(result) = response.chart.result.and_then(|results| results.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let Some(quote) = result.indicators.quote.into_iter().next() else {
        return Ok(Vec::new());
    };

    let offset = result.meta.gmtoffset.unwrap_or(0);
    let timestamps = result.timestamp.unwrap_or_default();
    let opens = quote.open.unwrap_or_default();
    let highs = quote.high.unwrap_or_default();
    let lows = quote.low.unwrap_or_default();
    let closes = quote.close.unwrap_or_default();
    let volumes = quote.volume.unwrap_or_default();

    let mut bars: Vec<PriceBar> = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let (Some(open), Some(high), Some(low), Some(close)) =
            (value_at(&opens, i), value_at(&highs, i), value_at(&lows, i), value_at(&closes, i))
        else {
            debug!("Skipping row {} with missing OHLC values", i);
            continue;
        };
        let Some(date) = ts
            .checked_add(offset)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.date_naive())
        else {
            warn!("Skipping row {} with out-of-range timestamp {}", i, ts);
            continue;
        };

        let bar = PriceBar {
            date,
            open,
            high,
            low,
            close,
            volume: volumes.get(i).copied().flatten().unwrap_or(0),
        };
        if !validate_bar(&bar) {
            continue;
        }

        match bars.last().map(|last| last.date) {
            Some(last) if last == bar.date => {
                if let Some(slot) = bars.last_mut() {
                    *slot = bar;
                }
            }
            Some(last) if last > bar.date => {
                warn!("Dropping out-of-order row dated {} after {}", bar.date, last);
            }
            _ => bars.push(bar),
        }
    }

    Ok(bars)
}

/// The source selected by configuration.
pub enum MarketDataSource {
    Yahoo(YahooFetcher),
    Csv(CsvSource),
}

impl MarketDataSource {
    pub fn from_config(config: &SourceConfig) -> Result<Self, DataIngestionError> {
        match config.kind {
            SourceKind::Yahoo => {
                info!("Using Yahoo chart API at {}", config.yahoo_base_url);
                Ok(Self::Yahoo(YahooFetcher::new(config)?))
            }
            SourceKind::Csv => {
                info!("Using CSV snapshots under {}", config.csv_dir.display());
                Ok(Self::Csv(CsvSource::new(&config.csv_dir)))
            }
        }
    }
}

impl PriceSource for MarketDataSource {
    async fn fetch(&self, request: &PriceRequest) -> Result<PriceSeries, DataIngestionError> {
        match self {
            Self::Yahoo(source) => source.fetch(request).await,
            Self::Csv(source) => source.fetch(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART: &str = r#"{
        "chart": {
            "result": [{
                "meta": { "symbol": "AAPL", "gmtoffset": -18000 },
                "timestamp": [1704205800, 1704292200, 1704378600, 1704378600, 1704465000, 1704724200],
                "indicators": { "quote": [{
                    "open":   [187.15, 184.22, 182.0,  182.15, 181.99, null],
                    "high":   [188.44, 185.88, 183.0,  183.09, 182.76, 185.6],
                    "low":    [183.89, 183.43, 180.0,  180.88, 180.17, 181.5],
                    "close":  [185.64, 184.25, 181.0,  181.91, 181.18, 185.56],
                    "volume": [82488700, 58414500, 1, 71983600, null, 59144500]
                }]}
            }],
            "error": null
        }
    }"#;

    #[test]
    fn extract_ohlc_skips_nulls_and_dedupes_dates() {
        let response: ChartResponse = serde_json::from_str(CHART).unwrap();
        let bars = extract_ohlc(response).unwrap();

        let dates: Vec<String> = bars.iter().map(|b| b.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-01-02", "2024-01-03", "2024-01-04", "2024-01-05"]);
        assert_eq!(bars[2].close, 181.91);
        assert_eq!(bars[3].volume, 0);
    }

    #[test]
    fn overflowing_timestamps_are_skipped() {
        let body = r#"{"chart":{"result":[{
            "meta": { "symbol": "AAPL", "gmtoffset": 3600 },
            "timestamp": [1704205800, 9223372036854775807],
            "indicators": { "quote": [{
                "open": [187.15, 184.22], "high": [188.44, 185.88], "low": [183.89, 183.43],
                "close": [185.64, 184.25], "volume": [82488700, 58414500]
            }]}
        }],"error":null}}"#;
        let response: ChartResponse = serde_json::from_str(body).unwrap();
        let bars = extract_ohlc(response).unwrap();

        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date.to_string(), "2024-01-02");
    }

    #[test]
    fn not_found_error_means_no_data() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let response: ChartResponse = serde_json::from_str(body).unwrap();
        assert!(extract_ohlc(response).unwrap().is_empty());
    }

    #[test]
    fn other_api_errors_are_reported() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input"}}}"#;
        let response: ChartResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(
            extract_ohlc(response),
            Err(DataIngestionError::ApiError { code, .. }) if code == "Bad Request"
        ));
    }

    #[test]
    fn symbols_use_yahoo_share_class_notation() {
        assert_eq!(normalize_symbol("brk.b"), "BRK-B");
        assert_eq!(normalize_symbol(" AAPL "), "AAPL");
    }

    #[test]
    fn range_bounds_are_utc_midnight() {
        let date: NaiveDate = "2020-01-01".parse().unwrap();
        assert_eq!(unix_midnight(date), 1577836800);
    }
}
