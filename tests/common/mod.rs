//! Shared fixtures for integration tests.

#![allow(dead_code)]

use alloy_dosing::{
    Composition, DosingConfig, DosingPipeline, DosingRequest, ModelRegistry, Predictor,
    PredictorError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Deterministic stub: ignores features, returns a fixed kg/ton.
pub struct FixedPredictor(pub f64);

impl Predictor for FixedPredictor {
    fn predict(&self, _features: &[f64]) -> Result<f64, PredictorError> {
        Ok(self.0)
    }

    fn kind(&self) -> &str {
        "fixed"
    }
}

/// Counts calls so tests can prove inference never ran.
pub struct CountingPredictor {
    pub value: f64,
    pub calls: Arc<AtomicUsize>,
}

impl CountingPredictor {
    pub fn new(value: f64) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                value,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

impl Predictor for CountingPredictor {
    fn predict(&self, _features: &[f64]) -> Result<f64, PredictorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.value)
    }
}

/// All four default alloys returning the same value.
pub fn uniform_registry(kg_per_ton: f64) -> ModelRegistry {
    ["fesi", "femn", "fecr", "ni"]
        .into_iter()
        .fold(ModelRegistry::new(), |reg, id| {
            reg.with_model(id, FixedPredictor(kg_per_ton))
        })
}

pub fn pipeline_with(config: DosingConfig, registry: ModelRegistry) -> DosingPipeline {
    DosingPipeline::new(Arc::new(config), Arc::new(registry)).expect("pipeline should build")
}

pub fn default_pipeline(registry: ModelRegistry) -> DosingPipeline {
    pipeline_with(DosingConfig::default(), registry)
}

/// Typical low-alloy correction: small C, Si and Mn pickup.
pub fn typical_request(melt_weight_kg: f64) -> DosingRequest {
    DosingRequest::new(
        Composition::new()
            .with("C", 0.15)
            .with("Si", 0.25)
            .with("Mn", 0.80),
        Composition::new()
            .with("C", 0.16)
            .with("Si", 0.27)
            .with("Mn", 0.85),
        melt_weight_kg,
    )
}
