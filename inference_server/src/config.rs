use std::path::PathBuf;

use chrono::NaiveDate;
use config::ConfigError;
use data_ingestion::config::{SourceConfig, load_settings};
use serde::Deserialize;

use crate::report::DEFAULT_TAIL_LEN;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("model/stock_movement_model.json"),
        }
    }
}

/// Report length and the values used when a request leaves a field out.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub tail_len: usize,
    pub default_ticker: String,
    pub default_start: NaiveDate,
    pub default_end: NaiveDate,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            tail_len: DEFAULT_TAIL_LEN,
            default_ticker: "AAPL".to_string(),
            default_start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            default_end: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub source: SourceConfig,
    pub report: ReportConfig,
}

impl AppConfig {
    pub fn from_env(path: &str) -> Result<Self, ConfigError> {
        load_settings(path)
    }
}
