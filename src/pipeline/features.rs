//! Delta & feature builder, plus the large-correction detector.

use crate::types::{ChemistryDelta, Composition};

/// `target - initial` for every configured element, zero-filled.
pub fn compute_chemistry_delta(
    elements: &[String],
    initial: &Composition,
    target: &Composition,
) -> ChemistryDelta {
    elements
        .iter()
        .map(|e| (e.clone(), target.percent(e) - initial.percent(e)))
        .collect()
}

/// Model input vector in configured element order.
///
/// Features are positional, so the order of `elements` is the contract.
pub fn prepare_features(elements: &[String], delta: &ChemistryDelta) -> Vec<f64> {
    elements
        .iter()
        .map(|e| delta.get(e).copied().unwrap_or(0.0))
        .collect()
}

/// True when any element moves by more than `threshold` of its target.
///
/// Elements with no positive target are ignored.
pub fn check_large_correction(
    elements: &[String],
    delta: &ChemistryDelta,
    target: &Composition,
    threshold: f64,
) -> bool {
    elements.iter().any(|e| {
        let target_pct = target.percent(e);
        target_pct > 0.0 && delta.get(e).copied().unwrap_or(0.0).abs() / target_pct > threshold
    })
}
