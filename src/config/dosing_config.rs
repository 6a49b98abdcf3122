//! Dosing Configuration - every pipeline threshold as an operator-tunable TOML value
//!
//! Each struct implements `Default` with the values the models were fitted
//! against, so a missing config file gives the standard furnace setup.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "DOSING_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "dosing_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a furnace deployment.
///
/// Load with `DosingConfig::load()` which searches:
/// 1. `$DOSING_CONFIG` env var
/// 2. `./dosing_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DosingConfig {
    /// Plant / furnace identification
    #[serde(default)]
    pub plant: PlantInfo,

    /// Tracked elements and their feature order
    #[serde(default)]
    pub chemistry: ChemistryConfig,

    /// Per-alloy bounds, in the order results and warnings are reported
    #[serde(default = "default_alloys")]
    pub alloys: Vec<AlloyConfig>,

    /// Melt weight bounds and warning ratios
    #[serde(default)]
    pub safety: SafetyThresholds,

    /// Step-wise addition strategy
    #[serde(default)]
    pub steps: StepStrategy,

    /// Model file location and compatibility policy
    #[serde(default)]
    pub models: ModelsConfig,

    /// Inference execution
    #[serde(default)]
    pub inference: InferenceConfig,
}

impl Default for DosingConfig {
    fn default() -> Self {
        Self {
            plant: PlantInfo::default(),
            chemistry: ChemistryConfig::default(),
            alloys: default_alloys(),
            safety: SafetyThresholds::default(),
            steps: StepStrategy::default(),
            models: ModelsConfig::default(),
            inference: InferenceConfig::default(),
        }
    }
}

impl DosingConfig {
    /// Load configuration using the standard search order:
    /// 1. `$DOSING_CONFIG` environment variable
    /// 2. `./dosing_config.toml` in the current working directory
    /// 3. Built-in defaults
    ///
    /// A file that fails to load is logged and skipped.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), plant = %config.plant.name, "Loaded dosing config from DOSING_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from DOSING_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "DOSING_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(plant = %config.plant.name, "Loaded dosing config from ./dosing_config.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./dosing_config.toml, using defaults");
                }
            }
        }

        info!("No dosing_config.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys are logged as warnings, never rejected.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in &super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Look up an alloy's bounds by id.
    pub fn alloy(&self, id: &str) -> Option<&AlloyConfig> {
        self.alloys.iter().find(|a| a.id == id)
    }

    /// Configured alloy ids in reporting order.
    pub fn alloy_ids(&self) -> impl Iterator<Item = &str> {
        self.alloys.iter().map(|a| a.id.as_str())
    }

    /// Effective large-step warning ratio for one alloy.
    pub fn warn_multiplier_for(&self, alloy: &AlloyConfig) -> f64 {
        alloy
            .warn_threshold_multiplier
            .unwrap_or(self.safety.warn_threshold_multiplier)
    }

    /// Validate all thresholds for internal consistency.
    ///
    /// Every problem is collected so operators can fix a file in one pass.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        // Chemistry: the feature vector must be well-defined
        let elements = &self.chemistry.elements;
        if elements.is_empty() {
            errors.push("chemistry.elements must list at least one element".to_string());
        }
        let mut seen = HashSet::new();
        for e in elements {
            if e.trim().is_empty() {
                errors.push("chemistry.elements contains an empty symbol".to_string());
            } else if !seen.insert(e.as_str()) {
                errors.push(format!("chemistry.elements lists '{e}' more than once"));
            }
        }

        // Alloys
        if self.alloys.is_empty() {
            errors.push("at least one [[alloys]] entry is required".to_string());
        }
        let mut ids = HashSet::new();
        for a in &self.alloys {
            if a.id.trim().is_empty() {
                errors.push("alloys: id must not be empty".to_string());
                continue;
            }
            if !ids.insert(a.id.as_str()) {
                errors.push(format!("alloys: duplicate id '{}'", a.id));
            }
            if a.min_per_ton < 0.0 {
                errors.push(format!(
                    "alloys.{}: min_per_ton ({:.2}) cannot be negative",
                    a.id, a.min_per_ton
                ));
            }
            if a.max_per_ton < a.min_per_ton {
                errors.push(format!(
                    "alloys.{}: max_per_ton ({:.2}) must be >= min_per_ton ({:.2})",
                    a.id, a.max_per_ton, a.min_per_ton
                ));
            }
            if a.max_per_step_kg <= 0.0 {
                errors.push(format!("alloys.{}: max_per_step_kg must be > 0", a.id));
            }
            if let Some(m) = a.warn_threshold_multiplier {
                Self::check_ratio(m, &format!("alloys.{}.warn_threshold_multiplier", a.id), &mut errors);
            }
        }

        // Safety: min < max (weight outside this window never reaches the models)
        let s = &self.safety;
        if s.min_melt_weight_kg <= 0.0 {
            errors.push("safety.min_melt_weight_kg must be > 0".to_string());
        }
        if s.max_melt_weight_kg <= s.min_melt_weight_kg {
            errors.push(format!(
                "safety.max_melt_weight_kg ({:.1}) must be > min_melt_weight_kg ({:.1})",
                s.max_melt_weight_kg, s.min_melt_weight_kg
            ));
        }
        Self::check_ratio(s.warn_threshold_multiplier, "safety.warn_threshold_multiplier", &mut errors);

        // Steps
        let st = &self.steps;
        Self::check_ratio(st.safety_factor, "steps.safety_factor", &mut errors);
        if st.large_correction_threshold <= 0.0 {
            errors.push("steps.large_correction_threshold must be > 0".to_string());
        }
        if st.min_step_kg < 0.0 {
            errors.push("steps.min_step_kg cannot be negative".to_string());
        }

        let (range_errors, range_warnings) = super::validation::validate_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        // NaN/Inf slip through every comparison above; sweep all f64 fields
        if let Ok(value) = toml::Value::try_from(self) {
            for key in super::validation::non_finite_keys(&value, "") {
                errors.push(format!("{key} must be a finite number"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Ratios must sit in (0, 1].
    fn check_ratio(value: f64, name: &str, errors: &mut Vec<String>) {
        if !(value > 0.0 && value <= 1.0) {
            errors.push(format!("{name} ({value}) must be in (0, 1]"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error ({}): {1}", .0.display())]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Plant Info
// ============================================================================

/// Furnace identification, echoed in logs only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlantInfo {
    #[serde(default = "default_plant_name")]
    pub name: String,

    #[serde(default)]
    pub furnace: String,
}

fn default_plant_name() -> String {
    "Unnamed".to_string()
}

impl Default for PlantInfo {
    fn default() -> Self {
        Self {
            name: default_plant_name(),
            furnace: String::new(),
        }
    }
}

// ============================================================================
// Chemistry
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChemistryConfig {
    /// Element symbols in model feature order.
    #[serde(default = "default_elements")]
    pub elements: Vec<String>,
}

fn default_elements() -> Vec<String> {
    defaults::DEFAULT_ELEMENTS.iter().map(|e| (*e).to_string()).collect()
}

impl Default for ChemistryConfig {
    fn default() -> Self {
        Self {
            elements: default_elements(),
        }
    }
}

// ============================================================================
// Alloys
// ============================================================================

/// Static bounds for one alloy. Models predict kg per ton of melt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlloyConfig {
    /// Alloy id; also names the model file (`<id>_model.json`).
    pub id: String,

    /// Lower kg/ton bound. Negative predictions are floored here.
    #[serde(default)]
    pub min_per_ton: f64,

    /// Upper kg/ton bound. Larger predictions are clamped with a warning.
    pub max_per_ton: f64,

    /// Absolute maximum kg per addition step.
    pub max_per_step_kg: f64,

    /// Overrides `safety.warn_threshold_multiplier` for this alloy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn_threshold_multiplier: Option<f64>,
}

impl AlloyConfig {
    pub fn new(id: &str, max_per_ton: f64, max_per_step_kg: f64) -> Self {
        Self {
            id: id.to_string(),
            min_per_ton: 0.0,
            max_per_ton,
            max_per_step_kg,
            warn_threshold_multiplier: None,
        }
    }
}

fn default_alloys() -> Vec<AlloyConfig> {
    vec![
        AlloyConfig::new("fesi", 50.0, 500.0),
        AlloyConfig::new("femn", 30.0, 300.0),
        AlloyConfig::new("fecr", 40.0, 400.0),
        AlloyConfig::new("ni", 20.0, 200.0),
    ]
}

// ============================================================================
// Safety Thresholds
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyThresholds {
    /// Warn if a step exceeds this fraction of `max_per_step_kg`.
    #[serde(default = "default_warn_threshold_multiplier")]
    pub warn_threshold_multiplier: f64,

    /// Minimum melt size (kg).
    #[serde(default = "default_min_melt_weight_kg")]
    pub min_melt_weight_kg: f64,

    /// Maximum melt size (kg).
    #[serde(default = "default_max_melt_weight_kg")]
    pub max_melt_weight_kg: f64,
}

fn default_warn_threshold_multiplier() -> f64 { defaults::WARN_THRESHOLD_MULTIPLIER }
fn default_min_melt_weight_kg() -> f64 { defaults::MIN_MELT_WEIGHT_KG }
fn default_max_melt_weight_kg() -> f64 { defaults::MAX_MELT_WEIGHT_KG }

impl Default for SafetyThresholds {
    fn default() -> Self {
        Self {
            warn_threshold_multiplier: default_warn_threshold_multiplier(),
            min_melt_weight_kg: default_min_melt_weight_kg(),
            max_melt_weight_kg: default_max_melt_weight_kg(),
        }
    }
}

// ============================================================================
// Step Strategy
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepStrategy {
    /// Flag the request if any |delta| / target exceeds this.
    #[serde(default = "default_large_correction_threshold")]
    pub large_correction_threshold: f64,

    /// Fraction of the computed total actually recommended.
    #[serde(default = "default_safety_factor")]
    pub safety_factor: f64,

    /// Totals at or below this (kg) are skipped.
    #[serde(default = "default_min_step_kg")]
    pub min_step_kg: f64,
}

fn default_large_correction_threshold() -> f64 { defaults::LARGE_CORRECTION_THRESHOLD }
fn default_safety_factor() -> f64 { defaults::SAFETY_FACTOR }
fn default_min_step_kg() -> f64 { defaults::MIN_STEP_KG }

impl Default for StepStrategy {
    fn default() -> Self {
        Self {
            large_correction_threshold: default_large_correction_threshold(),
            safety_factor: default_safety_factor(),
            min_step_kg: default_min_step_kg(),
        }
    }
}

// ============================================================================
// Models
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Directory holding `<alloy>_model.json` files.
    ///
    /// Can be overridden by the `--models-dir` CLI flag.
    #[serde(default = "default_models_dir")]
    pub dir: PathBuf,

    /// Refuse to start when a model's input width differs from
    /// `chemistry.elements`. When false the mismatch is only logged.
    #[serde(default)]
    pub strict_feature_check: bool,
}

fn default_models_dir() -> PathBuf {
    PathBuf::from(defaults::MODELS_DIR)
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            dir: default_models_dir(),
            strict_feature_check: false,
        }
    }
}

// ============================================================================
// Inference
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Run the per-alloy predictors on the rayon pool.
    #[serde(default)]
    pub parallel: bool,
}

// ============================================================================
// Tests
// ============================================================================
