//! Linear regression model stored as JSON.
//!
//! File layout (`<models_dir>/<alloy>_model.json`):
//!
//! ```json
//! { "coefficients": [12.0, 80.0, 4.5, 0.0, 0.0], "intercept": 0.0, "n_features_in": 5 }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::registry::RegistryError;
use super::{Predictor, PredictorError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
    /// Width recorded at fit time. Must equal `coefficients.len()` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_features_in: Option<usize>,
}

impl LinearModel {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            n_features_in: Some(coefficients.len()),
            coefficients,
            intercept,
        }
    }

    /// Check internal consistency after deserialization.
    pub fn validate(&self) -> Result<(), String> {
        if self.coefficients.is_empty() {
            return Err("coefficients must not be empty".to_string());
        }
        if let Some(n) = self.n_features_in {
            if n != self.coefficients.len() {
                return Err(format!(
                    "n_features_in = {n} but {} coefficients present",
                    self.coefficients.len()
                ));
            }
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err("coefficients and intercept must be finite".to_string());
        }
        Ok(())
    }

    /// Load and validate a model file.
    pub fn load_from_disk(path: &Path) -> Result<Self, RegistryError> {
        let data = std::fs::read(path).map_err(|e| RegistryError::Io(path.to_path_buf(), e))?;
        let model: Self = serde_json::from_slice(&data)
            .map_err(|e| RegistryError::Parse(path.to_path_buf(), e))?;
        model.validate().map_err(|reason| RegistryError::InvalidModel {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(model)
    }

    /// Write the model as JSON, via a temp file and rename.
    pub fn save_to_disk(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let tmp_path = path.with_extension("json.tmp");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&tmp_path, &json)?;
        std::fs::rename(&tmp_path, path)
    }
}

impl Predictor for LinearModel {
    fn predict(&self, features: &[f64]) -> Result<f64, PredictorError> {
        if features.len() != self.coefficients.len() {
            return Err(PredictorError::FeatureCount {
                expected: self.coefficients.len(),
                actual: features.len(),
            });
        }
        Ok(self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(c, x)| c * x)
                .sum::<f64>())
    }

    fn expected_features(&self) -> Option<usize> {
        Some(self.coefficients.len())
    }

    fn kind(&self) -> &str {
        "linear"
    }
}
