use chrono::NaiveDate;
use feature_processing::FeatureTable;
use polars::prelude::*;
use serde::Serialize;

use crate::engine::{Label, Prediction};
use crate::error::InferenceError;

pub const DEFAULT_TAIL_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictedRow {
    pub date: NaiveDate,
    pub close: f64,
    pub label: Label,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Chart-ready view of one prediction request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub ticker: String,
    pub model: String,
    pub rows_scored: usize,
    pub up_count: usize,
    /// Every scored close, for the price line.
    pub close_series: Vec<ChartPoint>,
    /// Closes on predicted Up days, for marker overlay.
    pub up_days: Vec<ChartPoint>,
    /// The last rows, oldest first, for the summary table.
    pub recent: Vec<PredictedRow>,
}

/// Attaches each prediction to its feature row, checking length and date alignment.
pub fn join_predictions(
    table: &FeatureTable,
    predictions: &[Prediction],
) -> Result<Vec<PredictedRow>, InferenceError> {
    if predictions.len() != table.len() {
        return Err(InferenceError::OutputLength {
            expected: table.len(),
            found: predictions.len(),
        });
    }

    table
        .rows()
        .iter()
        .zip(predictions)
        .map(|(row, prediction)| {
            if row.date != prediction.date {
                return Err(InferenceError::DateMismatch {
                    expected: row.date.to_string(),
                    found: prediction.date.to_string(),
                });
            }
            Ok(PredictedRow {
                date: row.date,
                close: row.close,
                label: prediction.label,
            })
        })
        .collect()
}

/// The last `n` rows in their original order.
pub fn tail(rows: &[PredictedRow], n: usize) -> &[PredictedRow] {
    &rows[rows.len().saturating_sub(n)..]
}

pub fn build_report(ticker: &str, model: &str, rows: &[PredictedRow], tail_len: usize) -> Report {
    let close_series: Vec<ChartPoint> = rows
        .iter()
        .map(|row| ChartPoint {
            date: row.date,
            close: row.close,
        })
        .collect();
    let up_days: Vec<ChartPoint> = rows
        .iter()
        .filter(|row| row.label == Label::Up)
        .map(|row| ChartPoint {
            date: row.date,
            close: row.close,
        })
        .collect();

    Report {
        ticker: ticker.to_string(),
        model: model.to_string(),
        rows_scored: rows.len(),
        up_count: up_days.len(),
        close_series,
        up_days,
        recent: tail(rows, tail_len).to_vec(),
    }
}

impl Report {
    /// `recent` as a Date / Close / Predicted table.
    pub fn summary_frame(&self) -> PolarsResult<DataFrame> {
        let dates: Vec<String> = self.recent.iter().map(|row| row.date.to_string()).collect();
        let closes: Vec<f64> = self.recent.iter().map(|row| row.close).collect();
        let labels: Vec<String> = self.recent.iter().map(|row| row.label.to_string()).collect();

        DataFrame::new(vec![
            Series::new("Date", dates),
            Series::new("Close", closes),
            Series::new("Predicted", labels),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::zigzag_series;
    use feature_processing::extract_features;

    fn rows(labels: &[Label]) -> Vec<PredictedRow> {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        labels
            .iter()
            .enumerate()
            .map(|(i, &label)| PredictedRow {
                date: start + chrono::Days::new(i as u64),
                close: 10.0 + i as f64,
                label,
            })
            .collect()
    }

    #[test]
    fn recent_view_is_last_ten_in_date_order() {
        let labels: Vec<Label> = (0..25).map(|i| if i % 3 == 0 { Label::Up } else { Label::Down }).collect();
        let rows = rows(&labels);
        let report = build_report("AAPL", "m", &rows, DEFAULT_TAIL_LEN);

        assert_eq!(report.recent.len(), 10);
        assert_eq!(report.recent[0], rows[15]);
        assert_eq!(report.recent[9], rows[24]);
        assert!(report.recent.windows(2).all(|pair| pair[0].date < pair[1].date));
    }

    #[test]
    fn recent_view_is_shorter_for_small_tables() {
        for k in [0, 1, 4, 10] {
            let rows = rows(&vec![Label::Down; k]);
            let report = build_report("AAPL", "m", &rows, DEFAULT_TAIL_LEN);
            assert_eq!(report.recent.len(), k.min(10));
        }
    }

    #[test]
    fn up_days_are_the_up_subsequence() {
        let rows = rows(&[Label::Up, Label::Down, Label::Down, Label::Up, Label::Up]);
        let report = build_report("MSFT", "m", &rows, DEFAULT_TAIL_LEN);

        assert_eq!(report.close_series.len(), 5);
        assert_eq!(report.up_count, 3);
        let up_dates: Vec<NaiveDate> = report.up_days.iter().map(|p| p.date).collect();
        assert_eq!(up_dates, vec![rows[0].date, rows[3].date, rows[4].date]);
        assert_eq!(report.up_days[1].close, 13.0);
    }

    #[test]
    fn join_checks_alignment() {
        let table = extract_features(&zigzag_series(25));
        let mut predictions: Vec<Prediction> = table
            .rows()
            .iter()
            .map(|row| Prediction {
                date: row.date,
                label: Label::Up,
            })
            .collect();

        let joined = join_predictions(&table, &predictions).unwrap();
        assert_eq!(joined.len(), table.len());
        assert_eq!(joined[0].close, table.rows()[0].close);

        predictions.swap(0, 1);
        assert!(matches!(
            join_predictions(&table, &predictions),
            Err(InferenceError::DateMismatch { .. })
        ));

        predictions.pop();
        assert!(matches!(
            join_predictions(&table, &predictions),
            Err(InferenceError::OutputLength { .. })
        ));
    }

    #[test]
    fn summary_frame_matches_recent_rows() {
        let rows = rows(&[Label::Up, Label::Down, Label::Up]);
        let report = build_report("AAPL", "m", &rows, 2);
        let df = report.summary_frame().unwrap();

        assert_eq!(df.shape(), (2, 3));
        assert_eq!(df.get_column_names(), vec!["Date", "Close", "Predicted"]);
        let closes = df.column("Close").unwrap().f64().unwrap();
        assert_eq!(closes.get(0), Some(11.0));
        assert_eq!(closes.get(1), Some(12.0));
    }
}
