//! Model metadata sidecar

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use feature_engine::{feature_names, FEATURE_DIMENSION};
use serde::{Deserialize, Serialize};

use crate::classifier::Classifier;
use crate::InferenceError;

/// Coarse class the service reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AnimalClass {
    Cattle,
    Buffalo,
}

impl AnimalClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnimalClass::Cattle => "Cattle",
            AnimalClass::Buffalo => "Buffalo",
        }
    }
}

impl fmt::Display for AnimalClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnimalClass {
    type Err = InferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Cattle" => Ok(AnimalClass::Cattle),
            "Buffalo" => Ok(AnimalClass::Buffalo),
            other => Err(InferenceError::InferenceFailed(format!("unknown class label '{}'", other))),
        }
    }
}

/// Raw dataset label to coarse class
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassMapping(BTreeMap<String, AnimalClass>);

impl ClassMapping {
    pub fn new(mapping: BTreeMap<String, AnimalClass>) -> Self {
        Self(mapping)
    }

    pub fn coarse(&self, label: &str) -> Option<AnimalClass> {
        self.0.get(label).copied()
    }

    pub fn contains_class(&self, class: AnimalClass) -> bool {
        self.0.values().any(|&c| c == class)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, AnimalClass)> for ClassMapping {
    fn from_iter<I: IntoIterator<Item = (String, AnimalClass)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// JSON sidecar stored next to the model blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelMetadata {
    pub class_mapping: ClassMapping,
    pub model_type: String,
    /// Names of the vector fields the model was trained on; may be left empty
    #[serde(default)]
    pub feature_names: Vec<String>,
    /// Held-out accuracy reported by training
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl ModelMetadata {
    pub fn new(class_mapping: ClassMapping, model_type: impl Into<String>) -> Self {
        Self {
            class_mapping,
            model_type: model_type.into(),
            feature_names: feature_names(),
            accuracy: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, InferenceError> {
        let metadata: Self = serde_json::from_str(json)
            .map_err(|e| InferenceError::MetadataMismatch(format!("malformed metadata: {}", e)))?;
        metadata.validate()?;
        Ok(metadata)
    }

    pub fn to_json(&self) -> Result<String, InferenceError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| InferenceError::MetadataMismatch(format!("cannot serialize metadata: {}", e)))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| InferenceError::MetadataMismatch(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), InferenceError> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)
            .map_err(|e| InferenceError::MetadataMismatch(format!("cannot write {}: {}", path.display(), e)))
    }

    /// Checks that need no model
    pub fn validate(&self) -> Result<(), InferenceError> {
        if self.class_mapping.is_empty() {
            return Err(InferenceError::MetadataMismatch("class_mapping is empty".into()));
        }
        if self.model_type.trim().is_empty() {
            return Err(InferenceError::MetadataMismatch("model_type is empty".into()));
        }
        if !self.feature_names.is_empty() && self.feature_names != feature_names() {
            return Err(InferenceError::MetadataMismatch(format!(
                "feature_names do not match the {}-value layout",
                FEATURE_DIMENSION
            )));
        }
        if let Some(accuracy) = self.accuracy {
            if !(0.0..=1.0).contains(&accuracy) {
                return Err(InferenceError::MetadataMismatch(format!("accuracy {} outside [0, 1]", accuracy)));
            }
        }
        Ok(())
    }

    /// Checks that the metadata describes this classifier
    pub fn check_consistent(&self, classifier: &dyn Classifier) -> Result<(), InferenceError> {
        if classifier.model_type() != self.model_type {
            return Err(InferenceError::MetadataMismatch(format!(
                "metadata describes {}, blob holds {}",
                self.model_type,
                classifier.model_type()
            )));
        }
        if classifier.n_features() != FEATURE_DIMENSION {
            return Err(InferenceError::MetadataMismatch(format!(
                "model expects {} features, encoder produces {}",
                classifier.n_features(),
                FEATURE_DIMENSION
            )));
        }
        for label in classifier.classes() {
            let known = label
                .parse::<AnimalClass>()
                .map(|class| self.class_mapping.contains_class(class))
                .unwrap_or(false);
            if !known {
                return Err(InferenceError::MetadataMismatch(format!(
                    "model class '{}' is not a mapped class",
                    label
                )));
            }
        }
        Ok(())
    }
}
