//! The linear surrogate classifier.
//!
//! The surrogate is a logistic regression over the encoded columns of the
//! transform pipeline. Attribution needs its coefficients as well as its
//! probability output, so both live on the SurrogateModel trait.

use crate::{
    error::{ScoreError, ScoreResult},
    types::ModelVersion,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The contract every default-probability model must fulfill.
pub trait SurrogateModel: Send + Sync {
    /// Probability of default for one encoded row.
    fn predict_proba(&self, encoded: &[f64]) -> ScoreResult<f64>;

    /// One coefficient per encoded column, in pipeline order.
    fn coefficients(&self) -> &[f64];

    /// Encoded column names the model was fitted on, if recorded.
    fn feature_names(&self) -> &[String] {
        &[]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticSurrogate {
    pub model_version: ModelVersion,
    #[serde(default)]
    pub feature_names: Vec<String>,
    pub coefficients:  Vec<f64>,
    pub intercept:     f64,
}

impl LogisticSurrogate {
    pub fn load(path: &Path) -> ScoreResult<Self> {
        if !path.exists() {
            return Err(ScoreError::ArtifactMissing { path: path.to_path_buf() });
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ScoreError::artifact_invalid(path, e.to_string()))?;
        let model: LogisticSurrogate = serde_json::from_str(&content)
            .map_err(|e| ScoreError::artifact_invalid(path, e.to_string()))?;
        if model.coefficients.is_empty() {
            return Err(ScoreError::artifact_invalid(path, "surrogate has no coefficients"));
        }
        if !model.feature_names.is_empty() && model.feature_names.len() != model.coefficients.len() {
            return Err(ScoreError::artifact_invalid(
                path,
                format!(
                    "{} feature names but {} coefficients",
                    model.feature_names.len(),
                    model.coefficients.len()
                ),
            ));
        }
        log::debug!(
            "Loaded surrogate {} ({} coefficients) from {}",
            model.model_version,
            model.coefficients.len(),
            path.display()
        );
        Ok(model)
    }

    /// Log-odds of default for one encoded row.
    pub fn decision_function(&self, encoded: &[f64]) -> ScoreResult<f64> {
        if encoded.len() != self.coefficients.len() {
            return Err(ScoreError::Resolution(format!(
                "encoded row has {} columns, surrogate expects {}",
                encoded.len(),
                self.coefficients.len()
            )));
        }
        let dot: f64 = self
            .coefficients
            .iter()
            .zip(encoded)
            .map(|(c, x)| c * x)
            .sum();
        Ok(self.intercept + dot)
    }
}

impl SurrogateModel for LogisticSurrogate {
    fn predict_proba(&self, encoded: &[f64]) -> ScoreResult<f64> {
        self.decision_function(encoded).map(sigmoid)
    }

    fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

/// Numerically stable logistic function.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
