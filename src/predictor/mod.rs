//! Regression model collaborators
//!
//! The pipeline only needs something that maps a feature vector to one
//! kg/ton figure. How that something was trained or stored is outside the
//! dosing core.
//!
//! - `Predictor`: the capability the pipeline consumes
//! - `linear`: file-backed linear regressor (`<alloy>_model.json`)
//! - `registry`: alloy id → shared predictor handle, built once at startup

pub mod linear;
pub mod registry;

pub use linear::LinearModel;
pub use registry::{FeatureMismatch, ModelRegistry, RegistryError};

use thiserror::Error;

/// Failure raised by a single predictor call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictorError {
    #[error("model expects {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("model returned a non-finite value ({0})")]
    NonFinite(f64),

    #[error("{0}")]
    Failed(String),
}

/// A pre-trained per-alloy regressor.
///
/// Implementations are shared read-only across requests, hence
/// `Send + Sync` and `&self`.
pub trait Predictor: Send + Sync {
    /// Predict kg of addition per ton of melt from the chemistry delta vector.
    fn predict(&self, features: &[f64]) -> Result<f64, PredictorError>;

    /// Input width the model was fitted with, if it records one.
    fn expected_features(&self) -> Option<usize> {
        None
    }

    /// Short human-readable model kind for logs.
    fn kind(&self) -> &str {
        "external"
    }
}
