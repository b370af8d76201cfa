//! Model store: loads a serialized classifier artifact into a [`PredictionModel`].
//!
//! Artifacts are JSON documents:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "name": "stock-movement-forest",
//!   "features": ["Price_Change", "MA5", "MA10", "EMA10", "EMA20", "Momentum", "RSI"],
//!   "estimator": { "kind": "forest", "trees": [ ... ] }
//! }
//! ```
//!
//! Any problem reading or validating the artifact is an `InferenceError::ModelLoad`; the
//! feature list itself is checked later, by `InferenceEngine::new`.

use std::path::Path;
use std::sync::Arc;

use log::info;
use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::engine::{Label, PredictionModel};
use crate::error::InferenceError;

pub const SUPPORTED_FORMAT_VERSION: u32 = 1;

const LEAF: i64 = -1;

fn default_threshold() -> f64 {
    0.5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub name: String,
    pub features: Vec<String>,
    pub estimator: Estimator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    Logistic {
        coefficients: Vec<f64>,
        intercept: f64,
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
    Forest {
        trees: Vec<DecisionTree>,
    },
}

/// A binary decision tree in flat array form. Node `i` splits on `feature[i] <= threshold[i]`
/// (left) versus greater (right); a node whose children are both -1 is a leaf. `value[i]` is
/// the probability of an Up day at node `i`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<f64>,
}

impl DecisionTree {
    fn validate(&self, num_features: usize) -> Result<(), String> {
        let nodes = self.value.len();
        if nodes == 0 {
            return Err("tree has no nodes".to_string());
        }
        if self.children_left.len() != nodes
            || self.children_right.len() != nodes
            || self.feature.len() != nodes
            || self.threshold.len() != nodes
        {
            return Err("tree arrays have different lengths".to_string());
        }

        for node in 0..nodes {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left == LEAF && right == LEAF {
                continue;
            }
            // children always come after their parent, so every walk terminates
            for child in [left, right] {
                if child <= node as i64 || child >= nodes as i64 {
                    return Err(format!("node {node} has invalid child {child}"));
                }
            }
            let feature = self.feature[node];
            if feature < 0 || feature as usize >= num_features {
                return Err(format!("node {node} splits on unknown feature {feature}"));
            }
        }
        Ok(())
    }

    /// P(Up) at the leaf reached by `row`. Assumes `validate` passed.
    fn probability(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut node = 0usize;
        loop {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left == LEAF && right == LEAF {
                return self.value[node];
            }
            let feature = self.feature[node] as usize;
            node = if row[feature] <= self.threshold[node] {
                left as usize
            } else {
                right as usize
            };
        }
    }
}

struct LogisticModel {
    name: String,
    features: Vec<String>,
    coefficients: Vec<f64>,
    intercept: f64,
    threshold: f64,
}

impl PredictionModel for LogisticModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_names(&self) -> &[String] {
        &self.features
    }

    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<Label>, InferenceError> {
        check_width(features, self.coefficients.len())?;
        Ok(features
            .rows()
            .into_iter()
            .map(|row| {
                let z: f64 = row.iter().zip(&self.coefficients).map(|(x, w)| x * w).sum::<f64>()
                    + self.intercept;
                let p_up = 1.0 / (1.0 + (-z).exp());
                Label::from_probability(p_up, self.threshold)
            })
            .collect())
    }
}

struct ForestModel {
    name: String,
    features: Vec<String>,
    trees: Vec<DecisionTree>,
}

impl PredictionModel for ForestModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_names(&self) -> &[String] {
        &self.features
    }

    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<Label>, InferenceError> {
        check_width(features, self.features.len())?;
        let n_trees = self.trees.len() as f64;
        Ok(features
            .rows()
            .into_iter()
            .map(|row| {
                let p_up = self.trees.iter().map(|tree| tree.probability(row)).sum::<f64>() / n_trees;
                Label::from_probability(p_up, 0.5)
            })
            .collect())
    }
}

fn check_width(features: ArrayView2<'_, f64>, expected: usize) -> Result<(), InferenceError> {
    let found = features.ncols();
    if found != expected {
        return Err(InferenceError::FeatureWidth { expected, found });
    }
    Ok(())
}

impl ModelArtifact {
    pub fn into_model(self) -> Result<Arc<dyn PredictionModel>, String> {
        if self.format_version != SUPPORTED_FORMAT_VERSION {
            return Err(format!(
                "unsupported format_version {} (expected {})",
                self.format_version, SUPPORTED_FORMAT_VERSION
            ));
        }
        if self.features.is_empty() {
            return Err("artifact lists no features".to_string());
        }

        match self.estimator {
            Estimator::Logistic {
                coefficients,
                intercept,
                threshold,
            } => {
                if coefficients.len() != self.features.len() {
                    return Err(format!(
                        "{} coefficients for {} features",
                        coefficients.len(),
                        self.features.len()
                    ));
                }
                if !(0.0..=1.0).contains(&threshold) {
                    return Err(format!("threshold {threshold} is not a probability"));
                }
                Ok(Arc::new(LogisticModel {
                    name: self.name,
                    features: self.features,
                    coefficients,
                    intercept,
                    threshold,
                }))
            }
            Estimator::Forest { trees } => {
                if trees.is_empty() {
                    return Err("forest contains no trees".to_string());
                }
                for (idx, tree) in trees.iter().enumerate() {
                    tree.validate(self.features.len())
                        .map_err(|reason| format!("tree {idx}: {reason}"))?;
                }
                Ok(Arc::new(ForestModel {
                    name: self.name,
                    features: self.features,
                    trees,
                }))
            }
        }
    }
}

/// Parses and validates an artifact held in memory. `origin` names it in errors.
pub fn parse_model(json: &str, origin: &str) -> Result<Arc<dyn PredictionModel>, InferenceError> {
    let load_error = |reason: String| InferenceError::ModelLoad {
        path: origin.to_string(),
        reason,
    };
    let artifact: ModelArtifact = serde_json::from_str(json).map_err(|e| load_error(e.to_string()))?;
    artifact.into_model().map_err(load_error)
}

pub fn load_model(path: impl AsRef<Path>) -> Result<Arc<dyn PredictionModel>, InferenceError> {
    let path = path.as_ref();
    let origin = path.display().to_string();
    let json = std::fs::read_to_string(path).map_err(|e| InferenceError::ModelLoad {
        path: origin.clone(),
        reason: e.to_string(),
    })?;

    let model = parse_model(&json, &origin)?;
    info!("Loaded model {} from {}", model.name(), origin);
    Ok(model)
}
