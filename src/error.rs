//! Request-level error taxonomy.
//!
//! Every variant's `Display` text is the operator-facing message placed in
//! the `{status: "error", message}` result. Nothing here escapes the
//! pipeline as a panic.

use thiserror::Error;

use crate::predictor::PredictorError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DosingError {
    #[error("Request body is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Chemistry data must be dictionaries")]
    ChemistryNotMapping,

    #[error("Chemistry value for '{element}' in {field} must be a number")]
    ChemistryNotNumeric { field: String, element: String },

    #[error("Chemistry value for '{element}' in {field} cannot be negative (got {value})")]
    NegativeChemistry {
        field: String,
        element: String,
        value: f64,
    },

    #[error("melt_weight_kg must be a number")]
    WeightNotNumeric,

    #[error("Melt weight too small: {weight} kg (min: {min} kg)")]
    WeightTooSmall { weight: f64, min: f64 },

    #[error("Melt weight too large: {weight} kg (max: {max} kg)")]
    WeightTooLarge { weight: f64, max: f64 },

    #[error("Prediction error: {alloy}: {source}")]
    Prediction {
        alloy: String,
        #[source]
        source: PredictorError,
    },
}

impl DosingError {
    /// True for errors raised before any predictor is called.
    pub fn is_input_error(&self) -> bool {
        !matches!(self, Self::Prediction { .. })
    }
}
