use axum::http::StatusCode;
use data_ingestion::DataIngestionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Failed to load model from {path}: {reason}")]
    ModelLoad { path: String, reason: String },

    #[error("Model feature contract mismatch: expected {expected:?}, model was trained on {found:?}")]
    ContractMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Feature matrix has {found} columns, model expects {expected}")]
    FeatureWidth { expected: usize, found: usize },

    #[error("Model returned {found} predictions for {expected} rows")]
    OutputLength { expected: usize, found: usize },

    #[error("Prediction dated {found} does not line up with feature row dated {expected}")]
    DateMismatch { expected: String, found: String },

    #[error("Failed to shape feature matrix: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// Why a single prediction request produced no report.
#[derive(Error, Debug)]
pub enum PredictError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Market data unavailable: {0}")]
    DataSource(DataIngestionError),

    #[error("No price data for {ticker}")]
    EmptyInput { ticker: String },

    #[error("{ticker} has {rows} rows, at least {required} are needed for a complete feature row")]
    InsufficientHistory {
        ticker: String,
        rows: usize,
        required: usize,
    },

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl From<DataIngestionError> for PredictError {
    fn from(err: DataIngestionError) -> Self {
        match err {
            DataIngestionError::InvalidRequest(reason) => PredictError::InvalidRequest(reason),
            other => PredictError::DataSource(other),
        }
    }
}

impl PredictError {
    /// Text shown to the end user in place of a report.
    pub fn user_message(&self) -> String {
        match self {
            PredictError::EmptyInput { .. } | PredictError::InsufficientHistory { .. } => {
                "No data found for this ticker and date range.".to_string()
            }
            PredictError::InvalidRequest(reason) => format!("Invalid request: {reason}"),
            PredictError::DataSource(_) => {
                "Could not download market data right now, please try again later.".to_string()
            }
            PredictError::Inference(_) => "Prediction failed.".to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PredictError::EmptyInput { .. } | PredictError::InsufficientHistory { .. } => {
                StatusCode::NOT_FOUND
            }
            PredictError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            PredictError::DataSource(_) => StatusCode::BAD_GATEWAY,
            PredictError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_conditions_share_the_no_data_message() {
        let empty = PredictError::EmptyInput { ticker: "ZZZZ".into() };
        let short = PredictError::InsufficientHistory {
            ticker: "ZZZZ".into(),
            rows: 3,
            required: 20,
        };
        assert_eq!(empty.user_message(), short.user_message());
        assert_eq!(empty.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_request_from_ingestion_maps_to_bad_request() {
        let err: PredictError = DataIngestionError::InvalidRequest("ticker symbol is empty".into()).into();
        assert!(matches!(err, PredictError::InvalidRequest(_)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: PredictError = DataIngestionError::HttpStatus(StatusCode::TOO_MANY_REQUESTS).into();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }
}
