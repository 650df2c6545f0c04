//! Classification service

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use feature_engine::{BoundingBox, FeatureEncoder, FeatureVector};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::metadata::{AnimalClass, ClassMapping};
use crate::registry::{LoadedModel, ModelRegistry};
use crate::InferenceError;

/// Probability above which a breed guess is reported
const BREED_THRESHOLD: f64 = 0.8;
const BREED_CONFIDENCE: f64 = 0.7;
const UNKNOWN_BREED: &str = "Unknown";

/// Tolerance on the probability sum and on each probability's upper bound
const SUM_TOLERANCE: f64 = 1e-3;

/// Structured prediction for one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub prediction: AnimalClass,
    /// Largest class probability
    pub confidence: f64,
    pub probabilities: BTreeMap<AnimalClass, f64>,
    pub breed: String,
    #[serde(rename = "breedConfidence")]
    pub breed_confidence: f64,
    pub model_type: String,
    pub class_mapping: ClassMapping,
}

/// Encodes images and scores them against the registry's current model
pub struct ClassificationService {
    registry: Arc<ModelRegistry>,
    encoder: FeatureEncoder,
}

impl ClassificationService {
    pub fn new(registry: Arc<ModelRegistry>, encoder: FeatureEncoder) -> Self {
        Self { registry, encoder }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Classify an already encoded vector
    pub fn classify(&self, features: &FeatureVector) -> Result<ClassificationResult, InferenceError> {
        let model = self.registry.current().ok_or(InferenceError::ModelUnavailable)?;
        classify_with(&model, features)
    }

    /// Encode an image and classify it. The model is checked before any
    /// feature extraction runs.
    pub fn classify_image(
        &self,
        image: &RgbImage,
        bbox: Option<&BoundingBox>,
    ) -> Result<ClassificationResult, InferenceError> {
        let model = self.registry.current().ok_or(InferenceError::ModelUnavailable)?;
        let features = self.encoder.encode(image, bbox)?;
        classify_with(&model, &features)
    }
}

fn classify_with(model: &LoadedModel, features: &FeatureVector) -> Result<ClassificationResult, InferenceError> {
    let start = Instant::now();
    let classifier = model.classifier();

    let label = classifier.predict(features.values())?;
    let proba = classifier.predict_proba(features.values())?;
    let classes = classifier.classes();

    if proba.len() != classes.len() {
        return Err(InferenceError::InferenceFailed(format!(
            "{} probabilities for {} classes",
            proba.len(),
            classes.len()
        )));
    }
    if proba.iter().any(|p| !p.is_finite() || *p < 0.0 || *p > 1.0 + SUM_TOLERANCE) {
        return Err(InferenceError::InferenceFailed(format!("invalid probabilities {:?}", proba)));
    }
    let total: f64 = proba.iter().sum();
    if (total - 1.0).abs() > SUM_TOLERANCE {
        return Err(InferenceError::InferenceFailed(format!("probabilities sum to {}", total)));
    }
    // Rounding in the model may leave a value just above 1
    let proba: Vec<f64> = proba.into_iter().map(|p| p.min(1.0)).collect();

    let prediction: AnimalClass = label.parse()?;
    let mut probabilities = BTreeMap::new();
    for (class, &p) in classes.iter().zip(&proba) {
        *probabilities.entry(class.parse::<AnimalClass>()?).or_insert(0.0) += p;
    }
    for p in probabilities.values_mut() {
        *p = p.min(1.0);
    }

    let confidence = proba.iter().copied().fold(0.0, f64::max);
    let (breed, breed_confidence) = guess_breed(prediction, &probabilities);

    debug!("Classification took {:?}", start.elapsed());
    info!("Classification result: {} (confidence: {:.3})", prediction, confidence);

    Ok(ClassificationResult {
        prediction,
        confidence,
        probabilities,
        breed: breed.to_string(),
        breed_confidence,
        model_type: model.metadata().model_type.clone(),
        class_mapping: model.metadata().class_mapping.clone(),
    })
}

/// Representative breed when the coarse class is confident
fn guess_breed(prediction: AnimalClass, probabilities: &BTreeMap<AnimalClass, f64>) -> (&'static str, f64) {
    let p = probabilities.get(&prediction).copied().unwrap_or(0.0);
    if p <= BREED_THRESHOLD {
        return (UNKNOWN_BREED, 0.0);
    }
    match prediction {
        AnimalClass::Cattle => ("Holstein", BREED_CONFIDENCE),
        AnimalClass::Buffalo => ("Asian buffalo", BREED_CONFIDENCE),
    }
}
