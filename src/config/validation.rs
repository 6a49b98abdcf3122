//! Config validation: unknown-key detection with Levenshtein suggestions
//! and plausibility checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for DosingConfig.
///
/// Entries of `[[alloys]]` share the `alloys.` prefix. Any new field added
/// to DosingConfig must be added here too.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [plant]
        "plant",
        "plant.name",
        "plant.furnace",
        // [chemistry]
        "chemistry",
        "chemistry.elements",
        // [[alloys]]
        "alloys",
        "alloys.id",
        "alloys.min_per_ton",
        "alloys.max_per_ton",
        "alloys.max_per_step_kg",
        "alloys.warn_threshold_multiplier",
        // [safety]
        "safety",
        "safety.warn_threshold_multiplier",
        "safety.min_melt_weight_kg",
        "safety.max_melt_weight_kg",
        // [steps]
        "steps",
        "steps.large_correction_threshold",
        "steps.safety_factor",
        "steps.min_step_kg",
        // [models]
        "models",
        "models.dir",
        "models.strict_feature_check",
        // [inference]
        "inference",
        "inference.parallel",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// A table `{ a = { b = 1, c = 2 } }` yields `["a", "a.b", "a.c"]`. Arrays of
/// tables contribute their keys under the array's own path, once per entry.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            match v {
                toml::Value::Table(_) => keys.extend(walk_toml_keys(v, &path)),
                toml::Value::Array(items) => {
                    for item in items.iter().filter(|i| i.is_table()) {
                        keys.extend(walk_toml_keys(item, &path));
                    }
                }
                _ => {}
            }
        }
    }
    keys
}

/// Dotted paths of every float in the tree that is NaN or infinite.
pub fn non_finite_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let join = |k: &str| {
        if prefix.is_empty() {
            k.to_string()
        } else {
            format!("{prefix}.{k}")
        }
    };
    match value {
        toml::Value::Float(f) if !f.is_finite() => vec![prefix.to_string()],
        toml::Value::Table(table) => table
            .iter()
            .flat_map(|(k, v)| non_finite_keys(v, &join(k)))
            .collect(),
        toml::Value::Array(items) => items
            .iter()
            .flat_map(|v| non_finite_keys(v, prefix))
            .collect(),
        _ => Vec::new(),
    }
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Ties resolve to the lexicographically smallest key so output is stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (levenshtein(unknown, k), k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys, it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new(); // parse errors are reported by serde later
    };

    let known = known_config_keys();
    let mut reported = HashSet::new();
    let mut warnings = Vec::new();

    for key in walk_toml_keys(&value, "") {
        if !known.contains(key.as_str()) && reported.insert(key.clone()) {
            let suggestion = suggest_correction(&key, &known);
            warnings.push(ValidationWarning {
                message: format!("Unknown config key '{key}'"),
                field: key,
                suggestion,
            });
        }
    }

    warnings
}

// ============================================================================
// Range Validation
// ============================================================================

/// Largest melt weight (kg) considered plausible for a single furnace.
const PLAUSIBLE_MAX_MELT_KG: f64 = 500_000.0;

/// Safety factors below this leave most corrections to later rounds.
const PLAUSIBLE_MIN_SAFETY_FACTOR: f64 = 0.5;

/// Validate plausibility of a parsed DosingConfig.
///
/// Returns (errors, warnings). Errors are impossible values that must
/// prevent startup; warnings are suspicious but not fatal.
pub fn validate_ranges(config: &super::DosingConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // A single step larger than the whole bound on the heaviest melt can never be used
    let max_tons = config.safety.max_melt_weight_kg / super::defaults::KG_PER_TON;
    for a in &config.alloys {
        let largest_total = a.max_per_ton * max_tons;
        if a.max_per_step_kg > largest_total && largest_total > 0.0 {
            warnings.push(ValidationWarning {
                field: format!("alloys.{}.max_per_step_kg", a.id),
                message: format!(
                    "alloys.{}: max_per_step_kg = {:.1} exceeds the largest possible addition ({:.1} kg)",
                    a.id, a.max_per_step_kg, largest_total
                ),
                suggestion: None,
            });
        }
    }

    // min_step_kg must stay below every step bound or that alloy is never dosed
    for a in &config.alloys {
        if a.max_per_step_kg > 0.0 && config.steps.min_step_kg >= a.max_per_step_kg {
            errors.push(format!(
                "steps.min_step_kg = {:.1} is not below alloys.{}.max_per_step_kg = {:.1}",
                config.steps.min_step_kg, a.id, a.max_per_step_kg
            ));
        }
    }

    if config.safety.max_melt_weight_kg > PLAUSIBLE_MAX_MELT_KG {
        warnings.push(ValidationWarning {
            field: "safety.max_melt_weight_kg".to_string(),
            message: format!(
                "max_melt_weight_kg = {:.0} is outside typical range (up to {PLAUSIBLE_MAX_MELT_KG:.0} kg)",
                config.safety.max_melt_weight_kg
            ),
            suggestion: None,
        });
    }

    let sf = config.steps.safety_factor;
    if sf > 0.0 && sf < PLAUSIBLE_MIN_SAFETY_FACTOR {
        warnings.push(ValidationWarning {
            field: "steps.safety_factor".to_string(),
            message: format!("safety_factor = {sf:.2} is unusually conservative (< {PLAUSIBLE_MIN_SAFETY_FACTOR})"),
            suggestion: None,
        });
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================
