use data_ingestion::{PriceRequest, PriceSeries, PriceSource};
use feature_processing::{MIN_HISTORY, extract_features};
use log::{info, warn};

use crate::engine::InferenceEngine;
use crate::error::PredictError;
use crate::report::{Report, build_report, join_predictions};

/// Features, prediction and formatting for one already-downloaded series.
///
/// The model is only invoked when at least one complete feature row exists.
pub fn run_pipeline(
    engine: &InferenceEngine,
    ticker: &str,
    series: &PriceSeries,
    tail_len: usize,
) -> Result<Report, PredictError> {
    if series.is_empty() {
        warn!("No price data for {}", ticker);
        return Err(PredictError::EmptyInput {
            ticker: ticker.to_string(),
        });
    }

    let table = extract_features(series);
    if table.is_empty() {
        warn!(
            "{} rows for {} are not enough for a complete feature row",
            series.len(),
            ticker
        );
        return Err(PredictError::InsufficientHistory {
            ticker: ticker.to_string(),
            rows: series.len(),
            required: MIN_HISTORY,
        });
    }

    let predictions = engine.predict(&table)?;
    let rows = join_predictions(&table, &predictions)?;
    let report = build_report(ticker, engine.model_name(), &rows, tail_len);

    info!(
        "{}: scored {} rows, {} predicted up days",
        ticker, report.rows_scored, report.up_count
    );
    Ok(report)
}

/// A data source and the shared model behind one request entry point.
pub struct Predictor<S> {
    source: S,
    engine: InferenceEngine,
    tail_len: usize,
}

impl<S: PriceSource> Predictor<S> {
    pub fn new(source: S, engine: InferenceEngine, tail_len: usize) -> Self {
        Self {
            source,
            engine,
            tail_len,
        }
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    pub async fn predict(&self, request: &PriceRequest) -> Result<Report, PredictError> {
        info!(
            "Predicting {} from {} to {}",
            request.ticker, request.start, request.end
        );
        let series = self.source.fetch(request).await?;
        run_pipeline(&self.engine, &request.ticker, &series, self.tail_len)
    }
}
