pub mod features;
pub mod indicators;
pub mod processor;

pub use features::{FEATURE_COLUMNS, FeatureRow, FeatureTable, FeatureVector, NUM_FEATURES};
pub use processor::{IndicatorRow, MIN_HISTORY, compute_indicators, extract_features};
