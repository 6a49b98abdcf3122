//! Pipeline Regression Tests
//!
//! Runs the full dosing pipeline through the public API with deterministic
//! stub predictors. Asserts on the delta, weight bounds, clamping, step
//! planning, and the shape of the JSON result.

mod common;

use alloy_dosing::{Composition, DosingConfig, DosingRequest, ModelRegistry};
use common::{
    default_pipeline, pipeline_with, typical_request, uniform_registry, CountingPredictor,
    FixedPredictor,
};
use serde_json::json;
use std::sync::atomic::Ordering;

// ============================================================================
// Delta
// ============================================================================

#[test]
fn delta_is_target_minus_initial_for_every_element() {
    let pipeline = default_pipeline(uniform_registry(1.0));
    let request = DosingRequest::new(
        Composition::new().with("C", 0.15).with("Mn", 1.10),
        Composition::new().with("C", 0.18).with("Si", 0.30).with("Mn", 1.00),
        20_000.0,
    );
    let outcome = pipeline.recommend(&request);
    let r = outcome.recommendation().expect("success");

    assert_eq!(r.chemistry_delta.len(), 5);
    assert_eq!(r.chemistry_delta["C"], 0.18 - 0.15);
    assert_eq!(r.chemistry_delta["Si"], 0.30);
    assert_eq!(r.chemistry_delta["Mn"], 1.00 - 1.10);
    assert_eq!(r.chemistry_delta["Cr"], 0.0);
    assert_eq!(r.chemistry_delta["Ni"], 0.0);
}

// ============================================================================
// Melt weight bounds
// ============================================================================

#[test]
fn weight_below_minimum_rejected_before_inference() {
    let (predictor, calls) = CountingPredictor::new(5.0);
    let pipeline = default_pipeline(ModelRegistry::new().with_model("fesi", predictor));

    let outcome = pipeline.recommend(&typical_request(50.0));
    assert_eq!(outcome.status(), "error");
    let msg = outcome.error_message().expect("error message");
    assert!(msg.contains("min: 100 kg"), "got: {msg}");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn weight_above_maximum_rejected_before_inference() {
    let (predictor, calls) = CountingPredictor::new(5.0);
    let pipeline = default_pipeline(ModelRegistry::new().with_model("fesi", predictor));

    let outcome = pipeline.recommend(&typical_request(200_000.0));
    let msg = outcome.error_message().expect("error message");
    assert!(msg.contains("max: 100000 kg"), "got: {msg}");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn malformed_input_never_reaches_predictors() {
    let (predictor, calls) = CountingPredictor::new(5.0);
    let pipeline = default_pipeline(ModelRegistry::new().with_model("fesi", predictor));

    let bodies = [
        json!({"initial_chemistry": {"C": 0.1}, "target_chemistry": {"C": 0.2}}),
        json!({"initial_chemistry": {"C": -0.1}, "target_chemistry": {"C": 0.2}, "melt_weight_kg": 1000}),
        json!({"initial_chemistry": {}, "target_chemistry": {}, "melt_weight_kg": "heavy"}),
        json!([1, 2, 3]),
    ];
    for body in &bodies {
        assert!(!pipeline.handle_json(body).is_success(), "accepted: {body}");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn typed_request_with_negative_chemistry_rejected_before_inference() {
    let (predictor, calls) = CountingPredictor::new(5.0);
    let pipeline = default_pipeline(ModelRegistry::new().with_model("fesi", predictor));

    let built = DosingRequest::new(
        Composition::new().with("C", -3.0),
        Composition::new().with("C", 0.2),
        20_000.0,
    );
    let msg = pipeline.recommend(&built).error_message().map(str::to_string);
    assert!(msg.expect("negative initial C").contains("cannot be negative"));

    let deserialized: DosingRequest = serde_json::from_value(json!({
        "initial_chemistry": {"Mn": -1.0},
        "target_chemistry": {"Mn": 1.0},
        "melt_weight_kg": 20000.0
    }))
    .expect("plain serde accepts the shape");
    assert!(!pipeline.recommend(&deserialized).is_success());

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Clamping and steps
// ============================================================================

#[test]
fn tenfold_overprediction_is_clamped_with_warning() {
    let pipeline = default_pipeline(ModelRegistry::new().with_model("fesi", FixedPredictor(500.0)));
    let outcome = pipeline.recommend(&typical_request(20_000.0));
    let r = outcome.recommendation().expect("success");

    let fesi = &r.recommendations["fesi"];
    assert_eq!(fesi.kg_per_ton, 50.0);
    // 50 kg/t * 20 t * 0.85 = 850 kg, split by the 500 kg step bound
    assert_eq!(fesi.total_estimated_kg, 850.0);
    assert_eq!(fesi.step_recommendation_kg, 500.0);
    assert_eq!(fesi.estimated_steps, 2);
    assert!(r.warnings().iter().any(|w| w.starts_with("fesi:") && w.contains("clamped")));
    assert_eq!(r.operator_instructions.message, "Recommended alloy additions for STEP 1:");
}

#[test]
fn clamp_warning_kept_when_nothing_is_added() {
    // 50 kg/t * 0.1 t * 0.85 = 4.25 kg, below the 10 kg minimum step
    let pipeline = default_pipeline(ModelRegistry::new().with_model("fesi", FixedPredictor(500.0)));
    let outcome = pipeline.recommend(&typical_request(100.0));
    let r = outcome.recommendation().expect("success");

    assert_eq!(r.operator_instructions.message, "No alloy additions needed");
    assert!(r.active_recommendations().is_empty());
    assert_eq!(r.recommendations["fesi"].kg_per_ton, 50.0);
    assert_eq!(
        r.warnings(),
        &["fesi: Model predicted 500.00 kg/ton, clamped to 50.0 kg/ton".to_string()]
    );
}

#[test]
fn step_rules_hold_for_any_model_output() {
    let raws = [-100.0, 0.0, 0.004, 0.3, 1.0, 7.7, 29.9, 50.0, 1.0e6];
    let weights = [100.0, 5_000.0, 37_500.0, 100_000.0];
    let config = DosingConfig::default();
    let min_step = config.steps.min_step_kg;

    for &raw in &raws {
        let pipeline = default_pipeline(uniform_registry(raw));
        for &weight in &weights {
            let outcome = pipeline.recommend(&typical_request(weight));
            let r = outcome.recommendation().expect("success");
            for (id, rec) in &r.recommendations {
                let alloy = config.alloy(id).expect("configured alloy");
                let ctx = format!("{id} raw={raw} weight={weight}");

                assert!(rec.step_recommendation_kg >= 0.0, "{ctx}");
                assert!(rec.step_recommendation_kg <= alloy.max_per_step_kg, "{ctx}");
                assert!(rec.kg_per_ton <= alloy.max_per_ton, "{ctx}");

                if rec.total_estimated_kg <= min_step {
                    assert_eq!(rec.step_recommendation_kg, 0.0, "{ctx}");
                    assert_eq!(rec.estimated_steps, 0, "{ctx}");
                } else if rec.total_estimated_kg > alloy.max_per_step_kg {
                    let expected = (rec.total_estimated_kg / alloy.max_per_step_kg).ceil() as u32;
                    assert_eq!(rec.estimated_steps, expected, "{ctx}");
                    assert_eq!(rec.step_recommendation_kg, alloy.max_per_step_kg, "{ctx}");
                } else {
                    assert_eq!(rec.estimated_steps, 1, "{ctx}");
                    assert_eq!(rec.step_recommendation_kg, rec.total_estimated_kg, "{ctx}");
                }
            }
        }
    }
}

#[test]
fn no_change_needed_gives_no_additions() {
    let pipeline = default_pipeline(uniform_registry(0.001));
    let request = DosingRequest::new(
        Composition::new().with("C", 0.15),
        Composition::new().with("C", 0.15),
        20_000.0,
    );
    let outcome = pipeline.recommend(&request);
    let r = outcome.recommendation().expect("success");

    assert_eq!(r.operator_instructions.message, "No alloy additions needed");
    assert_eq!(r.operator_instructions.next_action, "Chemistry is within target range");
    assert!(r.active_recommendations().is_empty());
    assert!(r.warnings.is_none());
    assert!(r.chemistry_delta.values().all(|d| *d == 0.0));
}

#[test]
fn large_correction_warning_comes_first() {
    let pipeline = default_pipeline(uniform_registry(1_000.0));
    let request = DosingRequest::new(
        Composition::new().with("Cr", 12.0),
        Composition::new().with("Cr", 18.0),
        60_000.0,
    );
    let outcome = pipeline.recommend(&request);
    let r = outcome.recommendation().expect("success");

    assert!(r.metadata.large_correction);
    assert_eq!(r.warnings()[0], "Large chemistry correction - multiple steps recommended");
    // One clamp warning per alloy follows, in config order
    let alloy_prefixes: Vec<&str> = r.warnings()[1..]
        .iter()
        .filter(|w| w.contains("clamped"))
        .filter_map(|w| w.split(':').next())
        .collect();
    assert_eq!(alloy_prefixes, vec!["fesi", "femn", "fecr", "ni"]);
}

// ============================================================================
// Determinism and result shape
// ============================================================================

#[test]
fn identical_requests_give_identical_results() {
    let pipeline = default_pipeline(uniform_registry(12.5));
    let request = typical_request(43_210.0);
    assert_eq!(pipeline.recommend(&request), pipeline.recommend(&request));
}

#[test]
fn parallel_inference_preserves_results() {
    let mut config = DosingConfig::default();
    config.inference.parallel = true;
    let registry = ModelRegistry::new()
        .with_model("fesi", FixedPredictor(3.0))
        .with_model("femn", FixedPredictor(45.0))
        .with_model("fecr", FixedPredictor(-2.0))
        .with_model("ni", FixedPredictor(9.9));

    let parallel = pipeline_with(config, registry.clone());
    let sequential = default_pipeline(registry);
    let request = typical_request(80_000.0);
    assert_eq!(parallel.recommend(&request), sequential.recommend(&request));
}

#[test]
fn success_json_shape() {
    let pipeline = default_pipeline(uniform_registry(10.0));
    let outcome = pipeline.handle_json_str(
        r#"{"initial_chemistry": {"C": 0.15}, "target_chemistry": {"C": 0.16}, "melt_weight_kg": "20000"}"#,
    );
    let value = serde_json::to_value(&outcome).expect("serializable");

    assert_eq!(value["status"], "success");
    assert_eq!(value["melt_weight_kg"], 20_000.0);
    assert_eq!(value["melt_weight_tons"], 20.0);
    assert_eq!(value["recommendations"]["fesi"]["step_recommendation_kg"], 170.0);
    assert_eq!(value["recommendations"]["fesi"]["estimated_steps"], 1);
    assert_eq!(value["metadata"]["safety_factor_applied"], 0.85);
    assert!(value["operator_instructions"]["next_action"].is_string());
}

#[test]
fn error_json_shape() {
    let pipeline = default_pipeline(uniform_registry(10.0));
    let outcome = pipeline.handle_json_str(r#"{"target_chemistry": {}}"#);
    let value = serde_json::to_value(&outcome).expect("serializable");

    assert_eq!(
        value,
        json!({
            "status": "error",
            "message": "Missing required fields: initial_chemistry, melt_weight_kg"
        })
    );
}
