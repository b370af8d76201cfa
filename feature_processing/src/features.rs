use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

pub const NUM_FEATURES: usize = 7;

/// Column names and order the classifier was trained on. Inference presents features in
/// exactly this order; `FeatureVector::to_array` is the only place that lays them out.
pub const FEATURE_COLUMNS: [&str; NUM_FEATURES] =
    ["Price_Change", "MA5", "MA10", "EMA10", "EMA20", "Momentum", "RSI"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub price_change: f64,
    pub ma5: f64,
    pub ma10: f64,
    pub ema10: f64,
    pub ema20: f64,
    pub momentum: f64,
    pub rsi: f64,
}

impl FeatureVector {
    pub fn to_array(&self) -> [f64; NUM_FEATURES] {
        [
            self.price_change,
            self.ma5,
            self.ma10,
            self.ema10,
            self.ema20,
            self.momentum,
            self.rsi,
        ]
    }
}

/// Features for one trading day, together with that day's close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub close: f64,
    pub features: FeatureVector,
}

/// Complete feature rows in ascending date order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub(crate) fn from_rows(rows: Vec<FeatureRow>) -> Self {
        debug_assert!(rows.windows(2).all(|pair| pair[0].date < pair[1].date));
        Self { rows }
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|row| row.date).collect()
    }

    /// Date, Close, then one column per feature in `FEATURE_COLUMNS` order.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let dates: Vec<String> = self.rows.iter().map(|row| row.date.to_string()).collect();
        let closes: Vec<f64> = self.rows.iter().map(|row| row.close).collect();

        let mut columns = vec![Series::new("Date", dates), Series::new("Close", closes)];
        for (idx, name) in FEATURE_COLUMNS.iter().enumerate() {
            let values: Vec<f64> = self.rows.iter().map(|row| row.features.to_array()[idx]).collect();
            columns.push(Series::new(name, values));
        }

        DataFrame::new(columns)
    }
}
