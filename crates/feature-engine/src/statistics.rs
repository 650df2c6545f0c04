//! Statistical Moments Computation

use crate::FeatureError;

/// First three moments of a sample
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatisticalMoments {
    /// Mean value
    pub mean: f64,
    /// Population standard deviation (divides by N)
    pub std_dev: f64,
    /// Skewness, mean of ((x - mean) / std)^3; 0 for a constant sample
    pub skewness: f64,
}

impl StatisticalMoments {
    /// Compute moments from a non-empty sample
    pub fn compute(values: &[f64]) -> Result<Self, FeatureError> {
        Self::from_iter(values.iter().copied(), values.len())
    }

    /// Compute moments over 8-bit samples (a channel of an image)
    pub fn from_bytes(values: &[u8]) -> Result<Self, FeatureError> {
        Self::from_iter(values.iter().map(|&v| f64::from(v)), values.len())
    }

    fn from_iter<I>(values: I, len: usize) -> Result<Self, FeatureError>
    where
        I: Iterator<Item = f64> + Clone,
    {
        if len == 0 {
            return Err(FeatureError::ExtractionFailure(
                "statistical moments of an empty sample".into(),
            ));
        }

        let n = len as f64;

        // Mean
        let mean = values.clone().sum::<f64>() / n;

        // Population variance
        let variance = values.clone().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        let std_dev = variance.sqrt();

        let skewness = if std_dev > 0.0 {
            values.map(|v| ((v - mean) / std_dev).powi(3)).sum::<f64>() / n
        } else {
            0.0
        };

        Ok(Self { mean, std_dev, skewness })
    }
}
