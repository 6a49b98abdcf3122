//! Dosing request and the input adapter that builds it from raw JSON.
//!
//! Validation here covers shape only (fields present, maps are maps, numbers
//! are numbers). Melt weight bounds depend on config and are checked by the
//! pipeline.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Composition;
use crate::error::DosingError;

pub const FIELD_INITIAL: &str = "initial_chemistry";
pub const FIELD_TARGET: &str = "target_chemistry";
pub const FIELD_WEIGHT: &str = "melt_weight_kg";

/// One request: current chemistry, desired chemistry, melt size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DosingRequest {
    pub initial_chemistry: Composition,
    pub target_chemistry: Composition,
    pub melt_weight_kg: f64,
}

impl DosingRequest {
    pub fn new(initial: Composition, target: Composition, melt_weight_kg: f64) -> Self {
        Self {
            initial_chemistry: initial,
            target_chemistry: target,
            melt_weight_kg,
        }
    }

    /// Parse a raw JSON body.
    pub fn from_json_str(body: &str) -> Result<Self, DosingError> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| DosingError::MalformedJson(e.to_string()))?;
        Self::from_json(&value)
    }

    /// Validate and normalize a decoded JSON body.
    ///
    /// `melt_weight_kg` accepts a number or a numeric string. Chemistry
    /// values must be non-negative numbers.
    pub fn from_json(value: &Value) -> Result<Self, DosingError> {
        let obj = value.as_object().ok_or(DosingError::NotAnObject)?;

        let missing: Vec<String> = [FIELD_INITIAL, FIELD_TARGET, FIELD_WEIGHT]
            .into_iter()
            .filter(|f| !obj.contains_key(*f))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(DosingError::MissingFields(missing));
        }

        let (Some(initial), Some(target)) = (obj[FIELD_INITIAL].as_object(), obj[FIELD_TARGET].as_object())
        else {
            return Err(DosingError::ChemistryNotMapping);
        };

        let melt_weight_kg = parse_weight(&obj[FIELD_WEIGHT])?;

        Ok(Self {
            initial_chemistry: parse_composition(FIELD_INITIAL, initial)?,
            target_chemistry: parse_composition(FIELD_TARGET, target)?,
            melt_weight_kg,
        })
    }

    /// Every chemistry value must be a finite, non-negative percent.
    ///
    /// `from_json` enforces this while parsing; requests built with `new`
    /// or plain serde are checked here.
    pub fn validate_chemistry(&self) -> Result<(), DosingError> {
        for (field, composition) in [
            (FIELD_INITIAL, &self.initial_chemistry),
            (FIELD_TARGET, &self.target_chemistry),
        ] {
            for (element, percent) in composition.iter() {
                check_percent(field, element, percent)?;
            }
        }
        Ok(())
    }
}

fn parse_weight(value: &Value) -> Result<f64, DosingError> {
    let weight = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    weight
        .filter(|w| w.is_finite())
        .ok_or(DosingError::WeightNotNumeric)
}

fn parse_composition(
    field: &str,
    map: &serde_json::Map<String, Value>,
) -> Result<Composition, DosingError> {
    let mut composition = Composition::new();
    for (element, raw) in map {
        let percent = raw.as_f64().ok_or_else(|| DosingError::ChemistryNotNumeric {
            field: field.to_string(),
            element: element.clone(),
        })?;
        composition.insert(element.clone(), check_percent(field, element, percent)?);
    }
    Ok(composition)
}

fn check_percent(field: &str, element: &str, percent: f64) -> Result<f64, DosingError> {
    if !percent.is_finite() {
        return Err(DosingError::ChemistryNotNumeric {
            field: field.to_string(),
            element: element.to_string(),
        });
    }
    if percent < 0.0 {
        return Err(DosingError::NegativeChemistry {
            field: field.to_string(),
            element: element.to_string(),
            value: percent,
        });
    }
    Ok(percent)
}
