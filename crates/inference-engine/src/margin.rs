//! One-vs-rest linear margin evaluator with Platt calibration

use serde::{Deserialize, Serialize};

use crate::classifier::Classifier;
use crate::InferenceError;

/// Sigmoid fitted on held-out margins: `p = 1 / (1 + exp(a * margin + b))`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlattScaling {
    pub a: f64,
    pub b: f64,
}

impl PlattScaling {
    #[inline]
    pub fn probability(&self, margin: f64) -> f64 {
        let t = self.a * margin + self.b;
        if t >= 0.0 {
            let e = (-t).exp();
            e / (1.0 + e)
        } else {
            1.0 / (1.0 + t.exp())
        }
    }
}

/// Standardises inputs, scores one hyperplane per class, calibrates each
/// margin and normalises the calibrated scores to sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginModel {
    classes: Vec<String>,
    mean: Vec<f64>,
    scale: Vec<f64>,
    weights: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
    calibration: Vec<PlattScaling>,
}

impl MarginModel {
    pub const MODEL_TYPE: &'static str = "LinearSVC";

    pub fn new(
        classes: Vec<String>,
        mean: Vec<f64>,
        scale: Vec<f64>,
        weights: Vec<Vec<f64>>,
        intercepts: Vec<f64>,
        calibration: Vec<PlattScaling>,
    ) -> Result<Self, InferenceError> {
        let model = Self {
            classes,
            mean,
            scale,
            weights,
            intercepts,
            calibration,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> Result<(), InferenceError> {
        let n_classes = self.classes.len();
        let n_features = self.mean.len();

        if n_classes < 2 {
            return Err(InferenceError::ModelLoad("margin model needs at least two classes".into()));
        }
        if n_features == 0 || self.scale.len() != n_features {
            return Err(InferenceError::ModelLoad(format!(
                "standardisation has {} means and {} scales",
                n_features,
                self.scale.len()
            )));
        }
        if self.weights.len() != n_classes || self.intercepts.len() != n_classes || self.calibration.len() != n_classes {
            return Err(InferenceError::ModelLoad(format!(
                "expected {} hyperplanes, got {} weight rows, {} intercepts, {} calibrations",
                n_classes,
                self.weights.len(),
                self.intercepts.len(),
                self.calibration.len()
            )));
        }
        if let Some(row) = self.weights.iter().position(|w| w.len() != n_features) {
            return Err(InferenceError::ModelLoad(format!(
                "weight row {} has {} entries, expected {}",
                row,
                self.weights[row].len(),
                n_features
            )));
        }
        if self.scale.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(InferenceError::ModelLoad("standardisation scale must be positive".into()));
        }

        let finite = self.mean.iter().all(|v| v.is_finite())
            && self.weights.iter().flatten().all(|v| v.is_finite())
            && self.intercepts.iter().all(|v| v.is_finite())
            && self.calibration.iter().all(|c| c.a.is_finite() && c.b.is_finite());
        if !finite {
            return Err(InferenceError::ModelLoad("margin model has non-finite parameters".into()));
        }
        Ok(())
    }

    /// Signed distance to each class hyperplane in standardised space
    pub fn decision_function(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        self.check_input(features)?;

        let standardised: Vec<f64> = features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect();

        Ok(self
            .weights
            .iter()
            .zip(&self.intercepts)
            .map(|(w, b)| w.iter().zip(&standardised).map(|(w, z)| w * z).sum::<f64>() + b)
            .collect())
    }
}

impl Classifier for MarginModel {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.mean.len()
    }

    fn model_type(&self) -> &str {
        Self::MODEL_TYPE
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        let margins = self.decision_function(features)?;
        let scores: Vec<f64> = margins
            .iter()
            .zip(&self.calibration)
            .map(|(m, c)| c.probability(*m))
            .collect();

        let total: f64 = scores.iter().sum();
        if !(total.is_finite() && total > 0.0) {
            return Err(InferenceError::InferenceFailed(format!(
                "calibrated scores sum to {}",
                total
            )));
        }
        Ok(scores.into_iter().map(|s| s / total).collect())
    }
}
