//! System-wide default constants.
//!
//! Centralises the numbers and operator strings the dosing pipeline falls
//! back to when no config file overrides them.

// ============================================================================
// Chemistry
// ============================================================================

/// Element symbols fed to the models, in feature order.
///
/// The models are positional: reordering this list silently changes
/// what every coefficient multiplies.
pub const DEFAULT_ELEMENTS: &[&str] = &["C", "Si", "Mn", "Cr", "Ni"];

/// Kilograms per metric ton, used to convert melt weight for kg/ton models.
pub const KG_PER_TON: f64 = 1_000.0;

// ============================================================================
// Safety Thresholds
// ============================================================================

/// Warn when a step exceeds this fraction of the alloy's per-step maximum.
pub const WARN_THRESHOLD_MULTIPLIER: f64 = 0.8;

/// Smallest melt the models were fitted for (kg).
pub const MIN_MELT_WEIGHT_KG: f64 = 100.0;

/// Largest melt the models were fitted for (kg). 100 000 = 100 t.
pub const MAX_MELT_WEIGHT_KG: f64 = 100_000.0;

// ============================================================================
// Step Strategy
// ============================================================================

/// Flag the correction as large if |delta| exceeds this fraction of target.
pub const LARGE_CORRECTION_THRESHOLD: f64 = 0.10;

/// Fraction of the computed addition actually recommended.
pub const SAFETY_FACTOR: f64 = 0.85;

/// Additions at or below this mass (kg) are not worth making.
pub const MIN_STEP_KG: f64 = 10.0;

// ============================================================================
// Models
// ============================================================================

/// Directory searched for `<alloy>_model.json` files.
pub const MODELS_DIR: &str = "models";

/// File name suffix for model files.
pub const MODEL_FILE_SUFFIX: &str = "_model.json";

// ============================================================================
// Operator Messages
// ============================================================================

pub const MSG_RECOMMENDED: &str = "Recommended alloy additions for STEP 1:";
pub const NEXT_ACTION_RECOMMENDED: &str = "Add alloys → Mix (5-10 min) → Sample → Re-run system";
pub const MSG_NO_ADDITIONS: &str = "No alloy additions needed";
pub const NEXT_ACTION_NO_ADDITIONS: &str = "Chemistry is within target range";
pub const WARNING_LARGE_CORRECTION: &str =
    "Large chemistry correction - multiple steps recommended";
