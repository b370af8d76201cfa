pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod report;
pub mod server;
pub mod service;

pub use engine::{InferenceEngine, Label, Prediction, PredictionModel};
pub use error::{InferenceError, PredictError};
pub use report::Report;
pub use service::{Predictor, run_pipeline};
