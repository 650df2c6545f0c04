//! Predict side of a trained classifier

use crate::InferenceError;

/// A trained classifier that scores one feature vector at a time.
///
/// Implementations are immutable after construction and shared across
/// threads behind an `Arc`.
pub trait Classifier: Send + Sync {
    /// Class labels, in the order `predict_proba` reports them
    fn classes(&self) -> &[String];

    /// Number of input features the model was trained on
    fn n_features(&self) -> usize;

    /// Model family name, as recorded in the metadata sidecar
    fn model_type(&self) -> &str;

    /// Per-class probabilities aligned with `classes()`
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError>;

    /// Most probable label; ties go to the earlier class
    fn predict(&self, features: &[f64]) -> Result<String, InferenceError> {
        let probabilities = self.predict_proba(features)?;
        let best = argmax(&probabilities)
            .ok_or_else(|| InferenceError::InferenceFailed("empty probability vector".into()))?;
        self.classes()
            .get(best)
            .cloned()
            .ok_or_else(|| InferenceError::InferenceFailed(format!("class index {} out of range", best)))
    }

    /// Reject inputs whose length differs from the trained feature count
    fn check_input(&self, features: &[f64]) -> Result<(), InferenceError> {
        if features.len() != self.n_features() {
            return Err(InferenceError::InvalidInputShape {
                expected: self.n_features(),
                actual: features.len(),
            });
        }
        Ok(())
    }
}

/// Index of the first maximum
pub(crate) fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}
