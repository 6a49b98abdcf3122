//! Pipeline output: per-alloy predictions and the tagged result object.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ChemistryDelta;
use crate::error::DosingError;

/// Full post-processing trace for one alloy.
///
/// Carries the raw model output alongside the surfaced values so callers can
/// audit a clamp. Only the surfaced subset goes into the response.
#[derive(Debug, Clone, PartialEq)]
pub struct AlloyPrediction {
    pub alloy_id: String,
    /// Model output before any bound was applied (kg/ton).
    pub raw_kg_per_ton: f64,
    /// Output after flooring and clamping (kg/ton).
    pub kg_per_ton: f64,
    /// Safety-adjusted total for the whole correction (kg).
    pub total_kg: f64,
    /// Amount to add now (kg).
    pub step_kg: f64,
    pub estimated_steps: u32,
    pub max_per_step_kg: f64,
    /// True when the prediction exceeded `max_per_ton`.
    pub clamped: bool,
    pub warnings: Vec<String>,
}

impl AlloyPrediction {
    pub fn was_clamped(&self) -> bool {
        self.clamped
    }

    pub fn to_recommendation(&self) -> AlloyRecommendation {
        AlloyRecommendation {
            step_recommendation_kg: self.step_kg,
            total_estimated_kg: self.total_kg,
            estimated_steps: self.estimated_steps,
            kg_per_ton: self.kg_per_ton,
            max_per_step_kg: self.max_per_step_kg,
        }
    }
}

/// Per-alloy entry in the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlloyRecommendation {
    pub step_recommendation_kg: f64,
    pub total_estimated_kg: f64,
    pub estimated_steps: u32,
    pub kg_per_ton: f64,
    pub max_per_step_kg: f64,
}

impl AlloyRecommendation {
    pub fn is_active(&self) -> bool {
        self.step_recommendation_kg > 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorInstructions {
    pub message: String,
    pub next_action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationMetadata {
    /// Alloys whose models ran, in reporting order.
    pub models_used: Vec<String>,
    pub large_correction: bool,
    pub safety_factor_applied: f64,
}

/// Successful pipeline result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub chemistry_delta: ChemistryDelta,
    pub melt_weight_kg: f64,
    pub melt_weight_tons: f64,
    pub recommendations: BTreeMap<String, AlloyRecommendation>,
    pub warnings: Option<Vec<String>>,
    pub operator_instructions: OperatorInstructions,
    pub metadata: RecommendationMetadata,
}

impl Recommendation {
    /// Alloys with a non-zero step, i.e. what the operator actually adds.
    pub fn active_recommendations(&self) -> BTreeMap<&str, &AlloyRecommendation> {
        self.recommendations
            .iter()
            .filter(|(_, r)| r.is_active())
            .map(|(k, r)| (k.as_str(), r))
            .collect()
    }

    pub fn warnings(&self) -> &[String] {
        self.warnings.as_deref().unwrap_or_default()
    }
}

/// Tagged result: `{"status": "success", ...}` or `{"status": "error", "message": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DosingOutcome {
    Success(Recommendation),
    Error { message: String },
}

impl DosingOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Error { .. } => "error",
        }
    }

    pub fn recommendation(&self) -> Option<&Recommendation> {
        match self {
            Self::Success(r) => Some(r),
            Self::Error { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Error { message } => Some(message),
        }
    }
}

impl From<DosingError> for DosingOutcome {
    fn from(err: DosingError) -> Self {
        Self::Error {
            message: err.to_string(),
        }
    }
}

impl From<Result<Recommendation, DosingError>> for DosingOutcome {
    fn from(result: Result<Recommendation, DosingError>) -> Self {
        match result {
            Ok(r) => Self::Success(r),
            Err(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Recommendation {
        let mut recommendations = BTreeMap::new();
        recommendations.insert(
            "fesi".to_string(),
            AlloyRecommendation {
                step_recommendation_kg: 120.0,
                total_estimated_kg: 120.0,
                estimated_steps: 1,
                kg_per_ton: 7.06,
                max_per_step_kg: 500.0,
            },
        );
        recommendations.insert(
            "ni".to_string(),
            AlloyRecommendation {
                step_recommendation_kg: 0.0,
                total_estimated_kg: 3.4,
                estimated_steps: 0,
                kg_per_ton: 0.2,
                max_per_step_kg: 200.0,
            },
        );
        Recommendation {
            chemistry_delta: [("C".to_string(), 0.03)].into_iter().collect(),
            melt_weight_kg: 20_000.0,
            melt_weight_tons: 20.0,
            recommendations,
            warnings: None,
            operator_instructions: OperatorInstructions {
                message: "m".to_string(),
                next_action: "n".to_string(),
            },
            metadata: RecommendationMetadata {
                models_used: vec!["fesi".to_string(), "ni".to_string()],
                large_correction: false,
                safety_factor_applied: 0.85,
            },
        }
    }

    #[test]
    fn test_active_view_drops_zero_steps() {
        let r = sample();
        let active = r.active_recommendations();
        assert_eq!(active.len(), 1);
        assert!(active.contains_key("fesi"));
    }

    #[test]
    fn test_success_shape() {
        let v = serde_json::to_value(DosingOutcome::Success(sample())).unwrap();
        assert_eq!(v["status"], "success");
        assert!(v["warnings"].is_null());
        assert_eq!(v["recommendations"]["fesi"]["estimated_steps"], 1);
        assert_eq!(v["metadata"]["safety_factor_applied"], 0.85);
    }

    #[test]
    fn test_error_shape() {
        let outcome: DosingOutcome = DosingError::WeightNotNumeric.into();
        let v = serde_json::to_value(&outcome).unwrap();
        assert_eq!(v, serde_json::json!({"status": "error", "message": "melt_weight_kg must be a number"}));
        assert!(v.get("recommendations").is_none());
    }

    #[test]
    fn test_error_outcome_parses_from_wire() {
        let outcome: DosingOutcome =
            serde_json::from_str(r#"{"status": "error", "message": "boom"}"#).unwrap();
        assert_eq!(outcome.error_message(), Some("boom"));
        assert_eq!(outcome.status(), "error");
        assert!(outcome.recommendation().is_none());
    }
}
