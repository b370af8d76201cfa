use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use serde::de::DeserializeOwned;

pub const DEFAULT_CONFIG_FILE: &str = "predictor.toml";
pub const ENV_PREFIX: &str = "PREDICTOR";

/// Layers the optional TOML file under `PREDICTOR__SECTION__KEY` environment variables.
pub fn load_settings<T: DeserializeOwned>(path: &str) -> Result<T, ConfigError> {
    let cfg = Config::builder()
        .add_source(File::new(path, FileFormat::Toml).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    cfg.try_deserialize()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Yahoo,
    Csv,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub yahoo_base_url: String,
    pub timeout_secs: u64,
    pub csv_dir: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Yahoo,
            yahoo_base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout_secs: 30,
            csv_dir: PathBuf::from("data"),
        }
    }
}

/// Settings read by the `data_ingestion` binary; other sections of the shared file are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub source: SourceConfig,
}

impl IngestionConfig {
    pub fn from_env(path: &str) -> Result<Self, ConfigError> {
        load_settings(path)
    }
}
