//! Melt chemistry: element symbol → weight percent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-element difference `target% - initial%`, keyed by configured element.
pub type ChemistryDelta = BTreeMap<String, f64>;

/// A melt composition in percent by weight.
///
/// Elements not present read as 0.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Composition(BTreeMap<String, f64>);

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and fixtures.
    #[must_use]
    pub fn with(mut self, element: &str, percent: f64) -> Self {
        self.0.insert(element.to_string(), percent);
        self
    }

    pub fn insert(&mut self, element: impl Into<String>, percent: f64) {
        self.0.insert(element.into(), percent);
    }

    /// Percent for `element`, zero-filled when absent.
    pub fn percent(&self, element: &str) -> f64 {
        self.0.get(element).copied().unwrap_or(0.0)
    }

    pub fn get(&self, element: &str) -> Option<f64> {
        self.0.get(element).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Composition {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<BTreeMap<String, f64>> for Composition {
    fn from(map: BTreeMap<String, f64>) -> Self {
        Self(map)
    }
}
