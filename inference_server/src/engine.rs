use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use feature_processing::{FEATURE_COLUMNS, FeatureTable, NUM_FEATURES};
use log::{debug, info};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::InferenceError;

/// Predicted next-day direction. Ordinal encoding matches the training labels (Down = 0, Up = 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Down = 0,
    Up = 1,
}

impl Label {
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_probability(p_up: f64, threshold: f64) -> Self {
        if p_up > threshold { Label::Up } else { Label::Down }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Up => write!(f, "Up"),
            Label::Down => write!(f, "Down"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub date: NaiveDate,
    pub label: Label,
}

/// A pre-trained binary classifier. Implementations must not mutate themselves on `predict`
/// so one instance can serve concurrent requests.
pub trait PredictionModel: Send + Sync {
    fn name(&self) -> &str;

    /// Column names, in order, the model was trained on.
    fn feature_names(&self) -> &[String];

    /// One label per row of `features`, in row order.
    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<Label>, InferenceError>;
}

/// Lays the table out as a `rows x NUM_FEATURES` matrix in `FEATURE_COLUMNS` order.
pub fn feature_matrix(table: &FeatureTable) -> Result<Array2<f64>, InferenceError> {
    let flat: Vec<f64> = table
        .rows()
        .iter()
        .flat_map(|row| row.features.to_array())
        .collect();
    Ok(Array2::from_shape_vec((table.len(), NUM_FEATURES), flat)?)
}

pub fn verify_feature_contract(model: &dyn PredictionModel) -> Result<(), InferenceError> {
    let found = model.feature_names();
    if found.iter().map(String::as_str).eq(FEATURE_COLUMNS) {
        return Ok(());
    }
    Err(InferenceError::ContractMismatch {
        expected: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
        found: found.to_vec(),
    })
}

/// Shared, read-only handle to the loaded model.
#[derive(Clone)]
pub struct InferenceEngine {
    model: Arc<dyn PredictionModel>,
}

impl InferenceEngine {
    /// Fails when the model was trained on a different column set than the pipeline produces.
    pub fn new(model: Arc<dyn PredictionModel>) -> Result<Self, InferenceError> {
        verify_feature_contract(model.as_ref())?;
        info!("Model {} accepted with features {:?}", model.name(), FEATURE_COLUMNS);
        Ok(Self { model })
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn predict(&self, table: &FeatureTable) -> Result<Vec<Prediction>, InferenceError> {
        let matrix = feature_matrix(table)?;
        let labels = self.model.predict(matrix.view())?;
        if labels.len() != table.len() {
            return Err(InferenceError::OutputLength {
                expected: table.len(),
                found: labels.len(),
            });
        }

        debug!("Scored {} rows with {}", labels.len(), self.model.name());
        Ok(table
            .rows()
            .iter()
            .zip(labels)
            .map(|(row, label)| Prediction {
                date: row.date,
                label,
            })
            .collect())
    }
}
