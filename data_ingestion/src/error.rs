use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataIngestionError {
    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config not found: {0}")]
    ConfigValueNotFoundError(#[from] config::ConfigError),

    #[error("Market data API error: {code} - {description}")]
    ApiError { code: String, description: String },

    #[error("Market data API returned status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error("Invalid price series: {0}")]
    InvalidSeries(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
