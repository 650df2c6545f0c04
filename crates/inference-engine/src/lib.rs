//! Cattle/Buffalo Inference Engine
//!
//! Loads a trained model artifact and its metadata sidecar, and turns the
//! classifier output for an encoded image into a structured prediction.

mod artifact;
mod classifier;
mod forest;
mod margin;
mod metadata;
mod registry;
mod service;

pub use artifact::ModelArtifact;
pub use classifier::Classifier;
pub use forest::{DecisionTree, ForestModel, TreeNode};
pub use margin::{MarginModel, PlattScaling};
pub use metadata::{AnimalClass, ClassMapping, ModelMetadata};
pub use registry::{HealthStatus, LoadedModel, ModelInfo, ModelRegistry};
pub use service::{ClassificationResult, ClassificationService};

use feature_engine::FeatureError;
use thiserror::Error;

/// Errors during model loading and inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model not loaded")]
    ModelUnavailable,
    #[error("Model metadata mismatch: {0}")]
    MetadataMismatch(String),
    #[error("Model load failed: {0}")]
    ModelLoad(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: usize, actual: usize },
    #[error(transparent)]
    Extraction(#[from] FeatureError),
}
