//! Serialized model blob

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::classifier::Classifier;
use crate::forest::ForestModel;
use crate::margin::MarginModel;
use crate::InferenceError;

/// Trained model as written by the training job (postcard encoded)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelArtifact {
    Forest(ForestModel),
    Margin(MarginModel),
}

impl ModelArtifact {
    /// Decode and validate a blob
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InferenceError> {
        let artifact: Self =
            postcard::from_bytes(bytes).map_err(|e| InferenceError::ModelLoad(format!("decode failed: {}", e)))?;
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, InferenceError> {
        postcard::to_allocvec(self).map_err(|e| InferenceError::ModelLoad(format!("encode failed: {}", e)))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .map_err(|e| InferenceError::ModelLoad(format!("cannot read {}: {}", path.display(), e)))?;
        debug!("Read {} byte model blob from {}", bytes.len(), path.display());

        Self::from_bytes(&bytes).inspect_err(|e| warn!("Rejected model blob {}: {}", path.display(), e))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), InferenceError> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        fs::write(path, bytes)
            .map_err(|e| InferenceError::ModelLoad(format!("cannot write {}: {}", path.display(), e)))
    }

    pub fn validate(&self) -> Result<(), InferenceError> {
        match self {
            Self::Forest(model) => model.validate(),
            Self::Margin(model) => model.validate(),
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            Self::Forest(model) => model,
            Self::Margin(model) => model,
        }
    }
}

impl Classifier for ModelArtifact {
    fn classes(&self) -> &[String] {
        self.inner().classes()
    }

    fn n_features(&self) -> usize {
        self.inner().n_features()
    }

    fn model_type(&self) -> &str {
        self.inner().model_type()
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        self.inner().predict_proba(features)
    }
}
