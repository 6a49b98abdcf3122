//! Response assembler: per-alloy predictions → `Recommendation`.

use crate::config::defaults;
use crate::types::{
    AlloyPrediction, ChemistryDelta, OperatorInstructions, Recommendation, RecommendationMetadata,
};

use super::safety::round_to;

/// Inputs shared by every alloy in one request.
pub struct AssemblyContext {
    pub chemistry_delta: ChemistryDelta,
    pub melt_weight_kg: f64,
    pub melt_weight_tons: f64,
    pub large_correction: bool,
    pub safety_factor: f64,
}

/// Build the success response.
///
/// Warning order: the large-correction notice first, then each alloy's
/// warnings in the order `predictions` arrive.
pub fn assemble(ctx: AssemblyContext, predictions: &[AlloyPrediction]) -> Recommendation {
    let mut warnings: Vec<String> = Vec::new();
    if ctx.large_correction {
        warnings.push(defaults::WARNING_LARGE_CORRECTION.to_string());
    }
    warnings.extend(predictions.iter().flat_map(|p| p.warnings.iter().cloned()));

    let recommendations = predictions
        .iter()
        .map(|p| (p.alloy_id.clone(), p.to_recommendation()))
        .collect();

    let any_active = predictions.iter().any(|p| p.step_kg > 0.0);
    let operator_instructions = if any_active {
        OperatorInstructions {
            message: defaults::MSG_RECOMMENDED.to_string(),
            next_action: defaults::NEXT_ACTION_RECOMMENDED.to_string(),
        }
    } else {
        OperatorInstructions {
            message: defaults::MSG_NO_ADDITIONS.to_string(),
            next_action: defaults::NEXT_ACTION_NO_ADDITIONS.to_string(),
        }
    };

    Recommendation {
        chemistry_delta: ctx.chemistry_delta,
        melt_weight_kg: ctx.melt_weight_kg,
        melt_weight_tons: round_to(ctx.melt_weight_tons, 2),
        recommendations,
        warnings: (!warnings.is_empty()).then_some(warnings),
        operator_instructions,
        metadata: RecommendationMetadata {
            models_used: predictions.iter().map(|p| p.alloy_id.clone()).collect(),
            large_correction: ctx.large_correction,
            safety_factor_applied: ctx.safety_factor,
        },
    }
}
