use chrono::NaiveDate;
use data_ingestion::PriceSeries;
use log::debug;

use crate::features::{FeatureRow, FeatureTable, FeatureVector};
use crate::indicators::{
    exponential_moving_average, momentum, price_change_ratio, rsi, simple_moving_average,
};

pub const MA_FAST_WINDOW: usize = 5;
pub const MA_SLOW_WINDOW: usize = 10;
pub const EMA_FAST_SPAN: usize = 10;
pub const EMA_SLOW_SPAN: usize = 20;
pub const MOMENTUM_LAG: usize = 5;
pub const RSI_WINDOW: usize = 14;

/// Observations (including the current day) a row needs before it is eligible:
/// the longest window in the feature set, so EMA20 has seen a full span.
pub const MIN_HISTORY: usize = EMA_SLOW_SPAN;

/// Every indicator value for one date, before the completeness filter.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRow {
    pub date: NaiveDate,
    pub close: f64,
    /// Number of observations up to and including this date.
    pub history: usize,
    pub price_change: Option<f64>,
    pub ma5: Option<f64>,
    pub ma10: Option<f64>,
    pub ema10: Option<f64>,
    pub ema20: Option<f64>,
    pub momentum: Option<f64>,
    pub rsi: Option<f64>,
}

impl IndicatorRow {
    /// The row filter: enough history AND all seven columns defined and finite.
    pub fn is_complete(&self) -> bool {
        self.history >= MIN_HISTORY
            && [
                self.price_change,
                self.ma5,
                self.ma10,
                self.ema10,
                self.ema20,
                self.momentum,
                self.rsi,
            ]
            .iter()
            .all(|value| value.is_some_and(f64::is_finite))
    }

    pub fn into_feature_row(self) -> Option<FeatureRow> {
        if !self.is_complete() {
            return None;
        }
        Some(FeatureRow {
            date: self.date,
            close: self.close,
            features: FeatureVector {
                price_change: self.price_change?,
                ma5: self.ma5?,
                ma10: self.ma10?,
                ema10: self.ema10?,
                ema20: self.ema20?,
                momentum: self.momentum?,
                rsi: self.rsi?,
            },
        })
    }
}

/// Computes every indicator column for each bar of the series, in date order.
pub fn compute_indicators(series: &PriceSeries) -> Vec<IndicatorRow> {
    let closes = series.closes();
    let opens = series.opens();

    let price_change = price_change_ratio(&opens, &closes);
    let ma5 = simple_moving_average(&closes, MA_FAST_WINDOW);
    let ma10 = simple_moving_average(&closes, MA_SLOW_WINDOW);
    let ema10 = exponential_moving_average(&closes, EMA_FAST_SPAN);
    let ema20 = exponential_moving_average(&closes, EMA_SLOW_SPAN);
    let mom = momentum(&closes, MOMENTUM_LAG);
    let rsi = rsi(&closes, RSI_WINDOW);

    series
        .bars()
        .iter()
        .enumerate()
        .map(|(i, bar)| IndicatorRow {
            date: bar.date,
            close: bar.close,
            history: i + 1,
            price_change: price_change[i],
            ma5: ma5[i],
            ma10: ma10[i],
            ema10: Some(ema10[i]),
            ema20: Some(ema20[i]),
            momentum: mom[i],
            rsi: rsi[i],
        })
        .collect()
}

/// Builds the feature table, dropping every date that fails `IndicatorRow::is_complete`.
/// An empty or too-short series yields an empty table.
pub fn extract_features(series: &PriceSeries) -> FeatureTable {
    let rows: Vec<FeatureRow> = compute_indicators(series)
        .into_iter()
        .filter_map(IndicatorRow::into_feature_row)
        .collect();

    debug!(
        "Extracted {} feature rows from {} bars ({} dropped)",
        rows.len(),
        series.len(),
        series.len() - rows.len()
    );

    FeatureTable::from_rows(rows)
}
