//! Safety / clamp stage
//!
//! Turns one raw kg/ton prediction into an operator-safe addition:
//! 1. Floor at the alloy's `min_per_ton` (never below zero)
//! 2. Clamp to `max_per_ton`, with a warning
//! 3. Convert to kg using melt weight in tons
//! 4. Apply the conservative safety factor
//! 5. Split into steps bounded by `max_per_step_kg`
//! 6. Warn when a step approaches that bound

use tracing::warn;

use crate::config::{AlloyConfig, StepStrategy};
use crate::types::AlloyPrediction;

/// Round to `decimals` places for reporting.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Step plan for a safety-adjusted total: `(step_kg, estimated_steps)`.
pub fn plan_steps(total_kg: f64, max_per_step_kg: f64, min_step_kg: f64) -> (f64, u32) {
    if total_kg <= min_step_kg {
        (0.0, 0)
    } else if total_kg <= max_per_step_kg {
        (total_kg, 1)
    } else {
        (max_per_step_kg, (total_kg / max_per_step_kg).ceil() as u32)
    }
}

/// Post-process one alloy's raw model output.
pub fn plan_alloy(
    alloy: &AlloyConfig,
    raw_kg_per_ton: f64,
    melt_weight_tons: f64,
    steps: &StepStrategy,
    warn_multiplier: f64,
) -> AlloyPrediction {
    let mut warnings = Vec::new();

    let floored = raw_kg_per_ton.max(alloy.min_per_ton).max(0.0);
    let clamped = floored > alloy.max_per_ton;
    let kg_per_ton = if clamped {
        warn!(
            alloy = %alloy.id,
            predicted = floored,
            max = alloy.max_per_ton,
            "Prediction above bound, clamping"
        );
        warnings.push(format!(
            "{}: Model predicted {:.2} kg/ton, clamped to {:.1} kg/ton",
            alloy.id, floored, alloy.max_per_ton
        ));
        alloy.max_per_ton
    } else {
        floored
    };

    // Plan on the reported (rounded) total so the step rules hold on the output
    let total_kg = round_to(kg_per_ton * melt_weight_tons * steps.safety_factor, 1);
    let (step_kg, estimated_steps) = plan_steps(total_kg, alloy.max_per_step_kg, steps.min_step_kg);

    if step_kg > alloy.max_per_step_kg * warn_multiplier {
        warnings.push(format!(
            "{}: Large step size ({:.0} kg) - proceed carefully",
            alloy.id, step_kg
        ));
    }

    AlloyPrediction {
        alloy_id: alloy.id.clone(),
        raw_kg_per_ton,
        kg_per_ton: if clamped {
            alloy.max_per_ton
        } else {
            round_to(kg_per_ton, 2).min(alloy.max_per_ton)
        },
        total_kg,
        step_kg,
        estimated_steps,
        max_per_step_kg: alloy.max_per_step_kg,
        clamped,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fesi() -> AlloyConfig {
        AlloyConfig::new("fesi", 50.0, 500.0)
    }

    #[test]
    fn test_negative_prediction_floors_to_zero() {
        let p = plan_alloy(&fesi(), -12.0, 20.0, &StepStrategy::default(), 0.8);
        assert_eq!(p.kg_per_ton, 0.0);
        assert_eq!(p.total_kg, 0.0);
        assert_eq!((p.step_kg, p.estimated_steps), (0.0, 0));
        assert!(p.warnings.is_empty());
    }

    #[test]
    fn test_single_step() {
        // 10 kg/t * 20 t * 0.85 = 170 kg
        let p = plan_alloy(&fesi(), 10.0, 20.0, &StepStrategy::default(), 0.8);
        assert_eq!(p.total_kg, 170.0);
        assert_eq!(p.step_kg, 170.0);
        assert_eq!(p.estimated_steps, 1);
        assert!(p.warnings.is_empty());
    }

    #[test]
    fn test_multi_step() {
        // 40 kg/t * 50 t * 0.85 = 1700 kg -> 4 steps of 500
        let p = plan_alloy(&fesi(), 40.0, 50.0, &StepStrategy::default(), 0.8);
        assert_eq!(p.total_kg, 1700.0);
        assert_eq!(p.step_kg, 500.0);
        assert_eq!(p.estimated_steps, 4);
        assert!(p.warnings.iter().any(|w| w.contains("Large step size (500 kg)")));
    }

    #[test]
    fn test_clamp_warns_and_reports_bound() {
        let p = plan_alloy(&fesi(), 500.0, 20.0, &StepStrategy::default(), 0.8);
        assert_eq!(p.kg_per_ton, 50.0);
        assert!(p.was_clamped());
        assert_eq!(
            p.warnings[0],
            "fesi: Model predicted 500.00 kg/ton, clamped to 50.0 kg/ton"
        );
        // 50 * 20 * 0.85 = 850 kg -> 2 steps
        assert_eq!(p.estimated_steps, 2);
    }

    #[test]
    fn test_rounding_down_is_not_a_clamp() {
        let p = plan_alloy(&fesi(), 10.004, 20.0, &StepStrategy::default(), 0.8);
        assert_eq!(p.kg_per_ton, 10.0);
        assert!(!p.was_clamped());
        assert!(p.warnings.is_empty());
    }

    #[test]
    fn test_min_step_boundary_is_skip() {
        // 0.5 kg/t * 20 t * 0.85 = 8.5 kg; 10 kg is the cut-off
        let p = plan_alloy(&fesi(), 0.5, 20.0, &StepStrategy::default(), 0.8);
        assert_eq!(p.total_kg, 8.5);
        assert_eq!((p.step_kg, p.estimated_steps), (0.0, 0));
        assert_eq!(plan_steps(10.0, 500.0, 10.0), (0.0, 0));
        assert_eq!(plan_steps(10.1, 500.0, 10.0), (10.1, 1));
    }

    #[test]
    fn test_exact_multiple_of_step() {
        assert_eq!(plan_steps(1000.0, 500.0, 10.0), (500.0, 2));
        assert_eq!(plan_steps(500.0, 500.0, 10.0), (500.0, 1));
    }

    #[test]
    fn test_min_per_ton_floor() {
        let mut alloy = fesi();
        alloy.min_per_ton = 2.0;
        let p = plan_alloy(&alloy, -1.0, 10.0, &StepStrategy::default(), 0.8);
        assert_eq!(p.kg_per_ton, 2.0);
        assert_eq!(p.total_kg, 17.0);
    }

    #[test]
    fn test_per_alloy_warn_multiplier() {
        // 170 kg against a 500 kg step bound: warn only when multiplier < 0.34
        let quiet = plan_alloy(&fesi(), 10.0, 20.0, &StepStrategy::default(), 0.8);
        let loud = plan_alloy(&fesi(), 10.0, 20.0, &StepStrategy::default(), 0.3);
        assert!(quiet.warnings.is_empty());
        assert_eq!(loud.warnings.len(), 1);
    }
}
