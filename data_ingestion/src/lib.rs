pub mod config;
pub mod csv_source;
pub mod error;
pub mod fetcher;
pub mod logger;
pub mod series;

pub use error::DataIngestionError;
pub use fetcher::{MarketDataSource, PriceSource, YahooFetcher};
pub use csv_source::CsvSource;
pub use series::{PriceBar, PriceRequest, PriceSeries};
