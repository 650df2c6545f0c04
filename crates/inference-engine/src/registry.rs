//! Process-wide handle to the current model

use std::fmt;
use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::artifact::ModelArtifact;
use crate::classifier::Classifier;
use crate::metadata::ModelMetadata;
use crate::InferenceError;

/// A classifier paired with the metadata that describes it.
/// Construction checks that the two agree; neither changes afterwards.
pub struct LoadedModel {
    classifier: Box<dyn Classifier>,
    metadata: ModelMetadata,
}

impl LoadedModel {
    pub fn new(classifier: Box<dyn Classifier>, metadata: ModelMetadata) -> Result<Self, InferenceError> {
        metadata.validate()?;
        metadata.check_consistent(classifier.as_ref())?;
        Ok(Self { classifier, metadata })
    }

    /// Read the sidecar, then the blob, and check they agree
    pub fn from_files(model_path: impl AsRef<Path>, metadata_path: impl AsRef<Path>) -> Result<Self, InferenceError> {
        let (model_path, metadata_path) = (model_path.as_ref(), metadata_path.as_ref());

        let metadata = ModelMetadata::load(metadata_path)?;
        let artifact = ModelArtifact::load(model_path)?;
        Self::new(Box::new(artifact), metadata).inspect_err(|e| {
            warn!(
                "Model {} does not match {}: {}",
                model_path.display(),
                metadata_path.display(),
                e
            )
        })
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("model_type", &self.classifier.model_type())
            .field("classes", &self.classifier.classes())
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// Liveness report; never touches the feature pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model_loaded: bool,
    pub metadata_loaded: bool,
}

/// Metadata report; `metadata` is null while no model is loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_loaded: bool,
    pub metadata: Option<ModelMetadata>,
}

/// Holds at most one published model.
///
/// Loads build and validate the replacement before taking the write lock, so
/// a failed load leaves the previous model in place. Readers take an `Arc`
/// snapshot, which keeps in-flight requests on the model they started with.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    current: RwLock<Option<Arc<LoadedModel>>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(model: LoadedModel) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(model))),
        }
    }

    /// Load a model from disk and publish it
    pub fn load_from_files(
        &self,
        model_path: impl AsRef<Path>,
        metadata_path: impl AsRef<Path>,
    ) -> Result<(), InferenceError> {
        let model = LoadedModel::from_files(model_path.as_ref(), metadata_path)?;
        info!(
            "Loaded {} model from {} ({} mapped labels)",
            model.metadata().model_type,
            model_path.as_ref().display(),
            model.metadata().class_mapping.len()
        );
        self.publish(model);
        Ok(())
    }

    /// Replace the current model
    pub fn publish(&self, model: LoadedModel) {
        let model = Arc::new(model);
        // The slot only ever holds a complete value, so a poisoned lock is still usable
        let mut slot = self.current.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(model);
        info!("Model published");
    }

    /// Snapshot of the current model
    pub fn current(&self) -> Option<Arc<LoadedModel>> {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.current().is_some()
    }

    pub fn metadata(&self) -> Option<ModelMetadata> {
        self.current().map(|model| model.metadata().clone())
    }

    pub fn model_info(&self) -> ModelInfo {
        let metadata = self.metadata();
        ModelInfo {
            model_loaded: metadata.is_some(),
            metadata,
        }
    }

    pub fn health(&self) -> HealthStatus {
        let loaded = self.is_loaded();
        HealthStatus {
            status: "healthy".to_string(),
            model_loaded: loaded,
            metadata_loaded: loaded,
        }
    }
}
