use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use data_ingestion::csv_source::write_series;
use data_ingestion::{CsvSource, PriceBar, PriceRequest, PriceSeries};
use inference_server::model::{load_model, parse_model};
use inference_server::{InferenceEngine, InferenceError, Label, PredictError, Predictor};

const SAMPLE_MODEL: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../model/stock_movement_model.json");

fn snapshot_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("pipeline-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn series(len: usize, close_at: impl Fn(usize) -> f64, open_offset: f64) -> PriceSeries {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let bars = (0..len)
        .map(|i| {
            let close = close_at(i);
            PriceBar {
                date: start + Days::new(i as u64),
                open: close + open_offset,
                high: close.max(close + open_offset) + 0.5,
                low: close.min(close + open_offset) - 0.5,
                close,
                volume: 10_000,
            }
        })
        .collect();
    PriceSeries::new(bars).unwrap()
}

fn request(ticker: &str, start: &str, end: &str) -> PriceRequest {
    PriceRequest::new(ticker, start.parse().unwrap(), end.parse().unwrap()).unwrap()
}

fn predictor_over(dir: &Path) -> Predictor<CsvSource> {
    let engine = InferenceEngine::new(load_model(SAMPLE_MODEL).unwrap()).unwrap();
    Predictor::new(CsvSource::new(dir), engine, 10)
}

#[tokio::test]
async fn flat_prices_are_scored_down() {
    let dir = snapshot_dir("flat");
    let source = CsvSource::new(&dir);
    write_series(source.path_for("FLAT"), &series(40, |_| 100.0, 0.0)).unwrap();

    let report = predictor_over(&dir)
        .predict(&request("flat", "2024-01-01", "2024-03-01"))
        .await
        .unwrap();

    assert_eq!(report.rows_scored, 21);
    assert_eq!(report.up_count, 0);
    assert!(report.up_days.is_empty());
    assert_eq!(report.recent.len(), 10);
    assert_eq!(report.recent[9].date, NaiveDate::from_ymd_opt(2024, 2, 9).unwrap());
    assert!(report.recent.iter().all(|row| row.label == Label::Down && row.close == 100.0));
}

#[tokio::test]
async fn steady_selloff_is_scored_up() {
    let dir = snapshot_dir("selloff");
    let source = CsvSource::new(&dir);
    write_series(source.path_for("DROP"), &series(40, |i| 200.0 - i as f64, 1.0)).unwrap();

    let report = predictor_over(&dir)
        .predict(&request("DROP", "2024-01-01", "2024-03-01"))
        .await
        .unwrap();

    assert_eq!(report.rows_scored, 21);
    assert_eq!(report.up_count, 21);
    assert_eq!(report.up_days, report.close_series);
}

#[tokio::test]
async fn range_without_rows_reports_no_data() {
    let dir = snapshot_dir("norows");
    let source = CsvSource::new(&dir);
    write_series(source.path_for("OLD"), &series(40, |_| 50.0, 0.0)).unwrap();

    let predictor = predictor_over(&dir);

    let err = predictor.predict(&request("OLD", "2019-01-01", "2020-01-01")).await.unwrap_err();
    assert!(matches!(err, PredictError::EmptyInput { .. }));

    let err = predictor.predict(&request("OLD", "2024-01-01", "2024-01-10")).await.unwrap_err();
    assert!(matches!(err, PredictError::InsufficientHistory { rows: 9, .. }));
    assert_eq!(err.user_message(), "No data found for this ticker and date range.");

    let err = predictor.predict(&request("MISSING", "2024-01-01", "2024-03-01")).await.unwrap_err();
    assert!(matches!(err, PredictError::EmptyInput { .. }));
}

#[test]
fn renamed_feature_columns_are_rejected_at_startup() {
    let json = std::fs::read_to_string(SAMPLE_MODEL).unwrap().replace("\"Momentum\"", "\"Momentum_5\"");
    let model = parse_model(&json, "renamed").unwrap();

    assert!(matches!(
        InferenceEngine::new(model),
        Err(InferenceError::ContractMismatch { .. })
    ));
}
