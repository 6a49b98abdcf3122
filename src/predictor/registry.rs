//! Model Registry
//!
//! Alloy id → shared predictor handle. Built once at process start, then
//! read concurrently by every request; nothing mutates it afterwards.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use super::{LinearModel, Predictor};
use crate::config::defaults::MODEL_FILE_SUFFIX;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Model I/O error ({}): {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Model parse error ({}): {1}", .0.display())]
    Parse(PathBuf, #[source] serde_json::Error),

    #[error("Invalid model ({}): {reason}", .path.display())]
    InvalidModel { path: PathBuf, reason: String },

    #[error("Failed to load any models from {}: {}", .dir.display(), .failures.join("; "))]
    NoModelsLoaded { dir: PathBuf, failures: Vec<String> },

    #[error("Model '{id}' not found. Available: {}", .available.join(", "))]
    NotFound { id: String, available: Vec<String> },
}

/// A model whose input width disagrees with the configured element list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureMismatch {
    pub alloy: String,
    pub expected: usize,
    pub configured: usize,
}

impl std::fmt::Display for FeatureMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: model expects {} features, config has {}",
            self.alloy, self.expected, self.configured
        )
    }
}

#[derive(Default, Clone)]
pub struct ModelRegistry {
    models: BTreeMap<String, Arc<dyn Predictor>>,
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.models.iter().map(|(k, m)| (k, m.kind())))
            .finish()
    }
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a predictor, replacing any previous one for `id`.
    pub fn insert(&mut self, id: impl Into<String>, predictor: Arc<dyn Predictor>) {
        self.models.insert(id.into(), predictor);
    }

    /// Builder-style `insert`.
    #[must_use]
    pub fn with_model(mut self, id: &str, predictor: impl Predictor + 'static) -> Self {
        self.insert(id, Arc::new(predictor));
        self
    }

    /// Load `<dir>/<id>_model.json` for every requested alloy.
    ///
    /// Missing or unreadable files are logged and skipped; the call fails
    /// only when nothing could be loaded.
    pub fn load_from_dir<'a>(
        dir: &Path,
        alloy_ids: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, RegistryError> {
        info!(dir = %dir.display(), "Loading alloy models");

        let mut registry = Self::new();
        let mut failures = Vec::new();

        for id in alloy_ids {
            let path = dir.join(format!("{id}{MODEL_FILE_SUFFIX}"));
            if !path.exists() {
                warn!(alloy = id, path = %path.display(), "Model file not found");
                failures.push(format!("{id}: file not found"));
                continue;
            }
            match LinearModel::load_from_disk(&path) {
                Ok(model) => {
                    info!(
                        alloy = id,
                        file = %path.display(),
                        features = model.coefficients.len(),
                        "Loaded model"
                    );
                    registry.insert(id, Arc::new(model));
                }
                Err(e) => {
                    error!(alloy = id, error = %e, "Failed to load model");
                    failures.push(format!("{id}: {e}"));
                }
            }
        }

        if registry.is_empty() {
            return Err(RegistryError::NoModelsLoaded {
                dir: dir.to_path_buf(),
                failures,
            });
        }

        info!(count = registry.len(), "Successfully loaded model(s)");
        if !failures.is_empty() {
            warn!(count = failures.len(), "Some models failed to load: {}", failures.join("; "));
        }
        Ok(registry)
    }

    pub fn get_model(&self, id: &str) -> Result<&Arc<dyn Predictor>, RegistryError> {
        self.models.get(id).ok_or_else(|| RegistryError::NotFound {
            id: id.to_string(),
            available: self.models.keys().cloned().collect(),
        })
    }

    pub fn get_all_models(&self) -> &BTreeMap<String, Arc<dyn Predictor>> {
        &self.models
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Models whose recorded input width differs from `configured`.
    pub fn feature_mismatches(&self, configured: usize) -> Vec<FeatureMismatch> {
        self.models
            .iter()
            .filter_map(|(id, m)| {
                let expected = m.expected_features()?;
                (expected != configured).then(|| FeatureMismatch {
                    alloy: id.clone(),
                    expected,
                    configured,
                })
            })
            .collect()
    }
}
