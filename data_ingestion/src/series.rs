use chrono::NaiveDate;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::DataIngestionError;

/// One daily OHLC record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    #[serde(alias = "Date")]
    pub date: NaiveDate,
    #[serde(alias = "Open")]
    pub open: f64,
    #[serde(alias = "High")]
    pub high: f64,
    #[serde(alias = "Low")]
    pub low: f64,
    #[serde(alias = "Close")]
    pub close: f64,
    #[serde(alias = "Volume", default)]
    pub volume: u64,
}

/// Daily bars ordered by strictly ascending date. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<PriceBar>) -> Result<Self, DataIngestionError> {
        if let Some(pair) = bars.windows(2).find(|pair| pair[0].date >= pair[1].date) {
            return Err(DataIngestionError::InvalidSeries(format!(
                "dates must be strictly ascending, found {} followed by {}",
                pair[0].date, pair[1].date
            )));
        }
        Ok(Self { bars })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn opens(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.open).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }
}

/// A ticker plus a half-open `[start, end)` date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRequest {
    pub ticker: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PriceRequest {
    pub fn new(ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Self, DataIngestionError> {
        let ticker = ticker.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(DataIngestionError::InvalidRequest("ticker symbol is empty".to_string()));
        }
        if start >= end {
            return Err(DataIngestionError::InvalidRequest(format!(
                "start date {start} must be before end date {end}"
            )));
        }
        Ok(Self { ticker, start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

pub fn validate_bar(data: &PriceBar) -> bool {
    let mut is_valid = true;
    let fields = [("Open", data.open), ("High", data.high), ("Low", data.low), ("Close", data.close)];

    for (name, value) in fields {
        if !value.is_finite() {
            warn!("{} on {} is not a finite number", name, data.date);
            is_valid = false;
        } else if value < 0.0 {
            warn!("{} on {} cannot be negative", name, data.date);
            is_valid = false;
        }
    }

    if data.high < data.low {
        warn!("High {} on {} is below low {}", data.high, data.date, data.low);
        is_valid = false;
    }

    is_valid
}
