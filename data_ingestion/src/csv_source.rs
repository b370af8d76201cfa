use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::DataIngestionError;
use crate::fetcher::PriceSource;
use crate::series::{PriceBar, PriceRequest, PriceSeries, validate_bar};

/// Reads `<dir>/<TICKER>.csv` snapshots with `date,open,high,low,close,volume` columns.
pub struct CsvSource {
    dir: PathBuf,
}

impl CsvSource {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", ticker.trim().to_uppercase()))
    }

    pub fn load(&self, request: &PriceRequest) -> Result<PriceSeries, DataIngestionError> {
        let path = self.path_for(&request.ticker);
        if !path.exists() {
            info!("No snapshot for {} at {}", request.ticker, path.display());
            return Ok(PriceSeries::empty());
        }

        let mut bars = read_bars(&path)?;
        bars.retain(|bar| request.contains(bar.date));
        bars.sort_by_key(|bar| bar.date);
        debug!("Loaded {} rows for {} from {}", bars.len(), request.ticker, path.display());

        PriceSeries::new(bars)
    }
}

impl PriceSource for CsvSource {
    async fn fetch(&self, request: &PriceRequest) -> Result<PriceSeries, DataIngestionError> {
        self.load(request)
    }
}

fn read_bars(path: &Path) -> Result<Vec<PriceBar>, DataIngestionError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut bars = Vec::new();
    for record in reader.deserialize() {
        let bar: PriceBar = record?;
        if validate_bar(&bar) {
            bars.push(bar);
        }
    }
    Ok(bars)
}

pub fn write_series(path: impl AsRef<Path>, series: &PriceSeries) -> Result<(), DataIngestionError> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    for bar in series.bars() {
        writer.serialize(bar)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("csv-source-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn request(ticker: &str, start: &str, end: &str) -> PriceRequest {
        let start: NaiveDate = start.parse().unwrap();
        let end: NaiveDate = end.parse().unwrap();
        PriceRequest::new(ticker, start, end).unwrap()
    }

    #[test]
    fn missing_snapshot_is_empty_series() {
        let source = CsvSource::new(scratch_dir("missing"));
        let series = source.load(&request("NOPE", "2020-01-01", "2021-01-01")).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn loads_download_style_headers_and_filters_range() {
        let dir = scratch_dir("headers");
        std::fs::write(
            dir.join("MSFT.csv"),
            "Date,Open,High,Low,Close,Adj Close,Volume\n\
             2024-01-04,10,11,9,10.5,10.4,300\n\
             2024-01-02,10,11,9,10.0,9.9,100\n\
             2024-01-03,10,11,9,-1.0,9.9,200\n\
             2024-01-05,10,11,9,11.0,10.9,400\n",
        )
        .unwrap();

        let source = CsvSource::new(&dir);
        let series = source.load(&request("msft", "2024-01-01", "2024-01-05")).unwrap();

        let dates: Vec<String> = series.dates().iter().map(|d| d.to_string()).collect();
        assert_eq!(dates, vec!["2024-01-02", "2024-01-04"]);
        assert_eq!(series.bars()[1].volume, 300);
    }

    #[tokio::test]
    async fn written_snapshot_is_readable_by_fetch() {
        let dir = scratch_dir("roundtrip");
        let bars = (1..=3)
            .map(|day| PriceBar {
                date: NaiveDate::from_ymd_opt(2024, 2, day).unwrap(),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.0 + day as f64,
                volume: 10,
            })
            .collect();
        let series = PriceSeries::new(bars).unwrap();

        let source = CsvSource::new(&dir);
        write_series(source.path_for("ibm"), &series).unwrap();

        let loaded = source.fetch(&request("IBM", "2024-01-01", "2024-03-01")).await.unwrap();
        assert_eq!(loaded, series);
    }
}
