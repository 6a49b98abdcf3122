//! Dosing Pipeline
//!
//! One synchronous call per request:
//!
//! ```text
//! DosingRequest
//!   → melt weight bounds, chemistry values
//!   → chemistry delta → feature vector        (features)
//!   → one predictor call per alloy            (inference)
//!   → floor / clamp / convert / step plan     (safety)
//!   → Recommendation                          (assembler)
//! ```
//!
//! The pipeline holds only the config and the model registry, both
//! immutable and shared; identical inputs always give identical output.

pub mod assembler;
pub mod features;
pub mod safety;

use rayon::prelude::*;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::{defaults::KG_PER_TON, AlloyConfig, DosingConfig};
use crate::error::DosingError;
use crate::predictor::{FeatureMismatch, ModelRegistry, Predictor, PredictorError};
use crate::types::{AlloyPrediction, DosingOutcome, DosingRequest, Recommendation};

use assembler::AssemblyContext;

/// Construction-time failures. These are startup errors, never per-request.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No models available: the registry is empty")]
    NoModels,

    #[error("Model '{0}' has no [[alloys]] entry in the config")]
    UnconfiguredModel(String),

    #[error("Feature count mismatch: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    FeatureMismatch(Vec<FeatureMismatch>),
}

/// An alloy with both bounds and a model.
struct ActiveAlloy {
    config: AlloyConfig,
    warn_multiplier: f64,
    predictor: Arc<dyn Predictor>,
}

pub struct DosingPipeline {
    config: Arc<DosingConfig>,
    alloys: Vec<ActiveAlloy>,
}

impl DosingPipeline {
    /// Bind config to models.
    ///
    /// Alloys are kept in config order, which fixes the order of results
    /// and warnings. A configured alloy without a model is skipped with a
    /// warning; a model without a configured alloy is an error.
    pub fn new(
        config: Arc<DosingConfig>,
        registry: Arc<ModelRegistry>,
    ) -> Result<Self, PipelineError> {
        if registry.is_empty() {
            return Err(PipelineError::NoModels);
        }
        if let Some(orphan) = registry.ids().find(|id| config.alloy(id).is_none()) {
            return Err(PipelineError::UnconfiguredModel(orphan.to_string()));
        }

        let mut alloys = Vec::with_capacity(registry.len());
        for alloy in &config.alloys {
            match registry.get_model(&alloy.id) {
                Ok(predictor) => alloys.push(ActiveAlloy {
                    config: alloy.clone(),
                    warn_multiplier: config.warn_multiplier_for(alloy),
                    predictor: Arc::clone(predictor),
                }),
                Err(_) => warn!(alloy = %alloy.id, "No model loaded for configured alloy, skipping"),
            }
        }
        let configured = config.chemistry.elements.len();
        let mismatches = registry.feature_mismatches(configured);
        if mismatches.is_empty() {
            info!(features = configured, "Models configured correctly");
        } else if config.models.strict_feature_check {
            return Err(PipelineError::FeatureMismatch(mismatches));
        } else {
            for m in &mismatches {
                error!("FEATURE MISMATCH: {m}. Update chemistry.elements or the model files");
            }
        }

        info!(
            alloys = ?alloys.iter().map(|a| a.config.id.as_str()).collect::<Vec<_>>(),
            parallel = config.inference.parallel,
            "Dosing pipeline ready"
        );
        Ok(Self { config, alloys })
    }

    pub fn config(&self) -> &DosingConfig {
        &self.config
    }

    /// Alloys that will be predicted, in reporting order.
    pub fn models_used(&self) -> Vec<&str> {
        self.alloys.iter().map(|a| a.config.id.as_str()).collect()
    }

    /// Run a raw JSON body through the input adapter and the pipeline.
    pub fn handle_json_str(&self, body: &str) -> DosingOutcome {
        match DosingRequest::from_json_str(body) {
            Ok(request) => self.recommend(&request),
            Err(e) => Self::reject(e),
        }
    }

    /// Run a decoded JSON body through the input adapter and the pipeline.
    pub fn handle_json(&self, body: &serde_json::Value) -> DosingOutcome {
        match DosingRequest::from_json(body) {
            Ok(request) => self.recommend(&request),
            Err(e) => Self::reject(e),
        }
    }

    /// Compute recommendations. Never panics; every failure becomes an
    /// error outcome.
    pub fn recommend(&self, request: &DosingRequest) -> DosingOutcome {
        match self.try_recommend(request) {
            Ok(r) => {
                info!(
                    melt_weight_kg = r.melt_weight_kg,
                    melt_weight_tons = r.melt_weight_tons,
                    active = r.active_recommendations().len(),
                    "Predictions generated"
                );
                DosingOutcome::Success(r)
            }
            Err(e) => Self::reject(e),
        }
    }

    fn reject(e: DosingError) -> DosingOutcome {
        if e.is_input_error() {
            warn!(error = %e, "Request rejected");
        } else {
            error!(error = %e, "Prediction failed");
        }
        e.into()
    }

    /// The pipeline proper, with `?` propagation.
    pub fn try_recommend(&self, request: &DosingRequest) -> Result<Recommendation, DosingError> {
        let weight = request.melt_weight_kg;
        self.check_melt_weight(weight)?;
        request.validate_chemistry()?;
        let melt_weight_tons = weight / KG_PER_TON;

        let elements = &self.config.chemistry.elements;
        let delta = features::compute_chemistry_delta(
            elements,
            &request.initial_chemistry,
            &request.target_chemistry,
        );
        debug!(?delta, "Chemistry delta");

        let large_correction = features::check_large_correction(
            elements,
            &delta,
            &request.target_chemistry,
            self.config.steps.large_correction_threshold,
        );

        let feature_vector = features::prepare_features(elements, &delta);
        let raw = self.run_inference(&feature_vector)?;

        let predictions: Vec<AlloyPrediction> = self
            .alloys
            .iter()
            .zip(raw)
            .map(|(alloy, raw_kg_per_ton)| {
                safety::plan_alloy(
                    &alloy.config,
                    raw_kg_per_ton,
                    melt_weight_tons,
                    &self.config.steps,
                    alloy.warn_multiplier,
                )
            })
            .collect();

        Ok(assembler::assemble(
            AssemblyContext {
                chemistry_delta: delta,
                melt_weight_kg: weight,
                melt_weight_tons,
                large_correction,
                safety_factor: self.config.steps.safety_factor,
            },
            &predictions,
        ))
    }

    fn check_melt_weight(&self, weight: f64) -> Result<(), DosingError> {
        let s = &self.config.safety;
        if !weight.is_finite() {
            return Err(DosingError::WeightNotNumeric);
        }
        if weight < s.min_melt_weight_kg {
            return Err(DosingError::WeightTooSmall {
                weight,
                min: s.min_melt_weight_kg,
            });
        }
        if weight > s.max_melt_weight_kg {
            return Err(DosingError::WeightTooLarge {
                weight,
                max: s.max_melt_weight_kg,
            });
        }
        Ok(())
    }

    /// One call per alloy; any failure aborts the request.
    ///
    /// Output order matches `self.alloys` whether or not the calls run on
    /// the rayon pool.
    fn run_inference(&self, features: &[f64]) -> Result<Vec<f64>, DosingError> {
        let infer = |alloy: &ActiveAlloy| -> Result<f64, DosingError> {
            alloy
                .predictor
                .predict(features)
                .and_then(|y| {
                    if y.is_finite() {
                        Ok(y)
                    } else {
                        Err(PredictorError::NonFinite(y))
                    }
                })
                .map_err(|source| DosingError::Prediction {
                    alloy: alloy.config.id.clone(),
                    source,
                })
        };

        if self.config.inference.parallel {
            self.alloys.par_iter().map(infer).collect()
        } else {
            self.alloys.iter().map(infer).collect()
        }
    }
}
