//! Fixed-range histograms

use crate::FeatureError;

/// Histogram with a fixed number of equal-width bins over `[lo, hi)`.
///
/// Values below `lo` land in the first bin and values at or above `hi` in the
/// last one, so every input value is counted exactly once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBinner {
    bins: usize,
    lo: f64,
    hi: f64,
}

impl HistogramBinner {
    pub fn new(bins: usize, lo: f64, hi: f64) -> Result<Self, FeatureError> {
        if bins == 0 {
            return Err(FeatureError::ExtractionFailure("histogram needs at least one bin".into()));
        }
        if !(lo.is_finite() && hi.is_finite() && hi > lo) {
            return Err(FeatureError::ExtractionFailure(format!(
                "invalid histogram range [{}, {})",
                lo, hi
            )));
        }
        Ok(Self { bins, lo, hi })
    }

    /// For parameters known to be valid at compile time
    pub(crate) const fn fixed(bins: usize, lo: f64, hi: f64) -> Self {
        Self { bins, lo, hi }
    }

    /// Histogram over the full 8-bit range `[0, 256)`
    pub fn byte_range(bins: usize) -> Result<Self, FeatureError> {
        Self::new(bins, 0.0, 256.0)
    }

    /// Bin index for a single value
    #[inline]
    pub fn bin_of(&self, value: f64) -> usize {
        let scaled = ((value - self.lo) / (self.hi - self.lo) * self.bins as f64).floor();
        // NaN casts to 0; out-of-range values clamp to the boundary bins
        (scaled.max(0.0) as usize).min(self.bins - 1)
    }

    /// Count values into bins
    pub fn compute<I>(&self, values: I) -> Vec<f64>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut counts = vec![0u64; self.bins];
        for value in values {
            counts[self.bin_of(value)] += 1;
        }
        counts.into_iter().map(|c| c as f64).collect()
    }
}
