//! Feature Vector Assembly

use std::ops::Range;
use std::time::Instant;

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::color::{to_gray, to_hsv};
use crate::contour::ShapeMetrics;
use crate::edges::EdgeDetector;
use crate::frame::{self, BoundingBox};
use crate::histogram::HistogramBinner;
use crate::lbp::LbpComputer;
use crate::statistics::StatisticalMoments;
use crate::FeatureError;

/// Number of features in the vector
pub const FEATURE_DIMENSION: usize = 222;

/// Bins per color channel histogram (RGB and HSV)
pub const COLOR_BINS: usize = 32;

/// Bins of the texture histogram, over LBP codes `[0, 16)`
pub const TEXTURE_BINS: usize = 16;

/// Position of each feature group inside the vector.
///
/// The order is part of the model contract: a trained model expects exactly
/// this layout.
pub mod layout {
    use std::ops::Range;

    use super::{COLOR_BINS, TEXTURE_BINS};

    pub const RGB_HISTOGRAM: Range<usize> = 0..3 * COLOR_BINS;
    pub const HSV_HISTOGRAM: Range<usize> = RGB_HISTOGRAM.end..RGB_HISTOGRAM.end + 3 * COLOR_BINS;
    pub const TEXTURE_HISTOGRAM: Range<usize> = HSV_HISTOGRAM.end..HSV_HISTOGRAM.end + TEXTURE_BINS;
    pub const EDGE_DENSITY: usize = TEXTURE_HISTOGRAM.end;
    pub const BRIGHTNESS: usize = EDGE_DENSITY + 1;
    pub const CONTRAST: usize = BRIGHTNESS + 1;
    pub const CONTOUR_AREA: usize = CONTRAST + 1;
    pub const CIRCULARITY: usize = CONTOUR_AREA + 1;
    /// (mean, std, skewness) for R, G, then B
    pub const COLOR_MOMENTS: Range<usize> = CIRCULARITY + 1..CIRCULARITY + 10;
}

/// Names of the 222 features, in vector order
pub fn feature_names() -> Vec<String> {
    let mut names = Vec::with_capacity(FEATURE_DIMENSION);

    for channel in ["r", "g", "b"] {
        names.extend((0..COLOR_BINS).map(|bin| format!("hist_{}_{}", channel, bin)));
    }
    for channel in ["h", "s", "v"] {
        names.extend((0..COLOR_BINS).map(|bin| format!("hist_{}_{}", channel, bin)));
    }
    names.extend((0..TEXTURE_BINS).map(|bin| format!("lbp_{}", bin)));
    names.push("edge_density".to_string());
    names.push("brightness".to_string());
    names.push("contrast".to_string());
    names.push("contour_area".to_string());
    names.push("circularity".to_string());
    for channel in ["r", "g", "b"] {
        for moment in ["mean", "std", "skewness"] {
            names.push(format!("{}_{}", channel, moment));
        }
    }

    names
}

/// Fixed-length feature vector for classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    /// Wrap raw values, checking length and finiteness
    pub fn new(values: Vec<f64>) -> Result<Self, FeatureError> {
        if values.len() != FEATURE_DIMENSION {
            return Err(FeatureError::ExtractionFailure(format!(
                "feature vector has {} values, expected {}",
                values.len(),
                FEATURE_DIMENSION
            )));
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(FeatureError::ExtractionFailure(format!(
                "feature {} is not finite ({})",
                i, values[i]
            )));
        }
        Ok(Self { values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn slice(&self, range: Range<usize>) -> &[f64] {
        &self.values[range]
    }

    pub fn edge_density(&self) -> f64 {
        self.values[layout::EDGE_DENSITY]
    }

    pub fn brightness(&self) -> f64 {
        self.values[layout::BRIGHTNESS]
    }

    pub fn contrast(&self) -> f64 {
        self.values[layout::CONTRAST]
    }

    pub fn contour_area(&self) -> f64 {
        self.values[layout::CONTOUR_AREA]
    }

    pub fn circularity(&self) -> f64 {
        self.values[layout::CIRCULARITY]
    }
}

impl TryFrom<Vec<f64>> for FeatureVector {
    type Error = FeatureError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl From<FeatureVector> for Vec<f64> {
    fn from(v: FeatureVector) -> Self {
        v.values
    }
}

/// Encoder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Side of the square the input is resized to
    pub input_size: u32,
    /// LBP sampling radius
    pub lbp_radius: usize,
    /// LBP neighbor count
    pub lbp_neighbors: usize,
    /// Edge detector thresholds (8-bit intensity scale)
    pub edge_low_threshold: f32,
    pub edge_high_threshold: f32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            input_size: 224,
            lbp_radius: 1,
            lbp_neighbors: 8,
            edge_low_threshold: 50.0,
            edge_high_threshold: 150.0,
        }
    }
}

/// Turns an image (and optional bounding box) into a [`FeatureVector`].
///
/// Encoding is pure: the same input always yields a bit-identical vector, so
/// the encoder can be shared between the training and serving call sites.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    input_size: u32,
    color_hist: HistogramBinner,
    texture_hist: HistogramBinner,
    lbp: LbpComputer,
    edges: EdgeDetector,
}

impl FeatureEncoder {
    /// Create an encoder, validating the configuration
    pub fn new(config: &EncoderConfig) -> Result<Self, FeatureError> {
        if config.input_size == 0 {
            return Err(FeatureError::ExtractionFailure("input size must be positive".into()));
        }

        Ok(Self {
            input_size: config.input_size,
            color_hist: HistogramBinner::byte_range(COLOR_BINS)?,
            texture_hist: HistogramBinner::new(TEXTURE_BINS, 0.0, TEXTURE_BINS as f64)?,
            lbp: LbpComputer::new(config.lbp_radius, config.lbp_neighbors)?,
            edges: EdgeDetector::new(config.edge_low_threshold, config.edge_high_threshold)?,
        })
    }

    /// Encode an image, cropping to `bbox` first when given
    pub fn encode(
        &self,
        image: &RgbImage,
        bbox: Option<&BoundingBox>,
    ) -> Result<FeatureVector, FeatureError> {
        let start = Instant::now();

        frame::ensure_non_empty(image)?;
        let cropped;
        let source = match bbox {
            Some(bbox) => {
                cropped = frame::crop(image, bbox)?;
                &cropped
            }
            None => image,
        };

        let resized = frame::resize_exact(source, self.input_size, self.input_size);
        let values = self.extract(&resized)?;
        let vector = FeatureVector::new(values)?;

        debug!(
            "Encoded {}x{} image (bbox={:?}) in {:?}",
            image.width(),
            image.height(),
            bbox,
            start.elapsed()
        );

        Ok(vector)
    }

    /// Run every extractor over an already resized image
    fn extract(&self, rgb: &RgbImage) -> Result<Vec<f64>, FeatureError> {
        let hsv = to_hsv(rgb);
        let gray = to_gray(rgb);

        let mut values = Vec::with_capacity(FEATURE_DIMENSION);

        // Color histograms
        for channel in 0..3 {
            values.extend(self.channel_histogram(rgb, channel));
        }
        for channel in 0..3 {
            values.extend(self.channel_histogram(&hsv, channel));
        }

        // Texture
        let lbp = self.lbp.compute(&gray)?;
        values.extend(self.texture_hist.compute(lbp.as_raw().iter().map(|&c| f64::from(c))));

        // Edges
        let mask = self.edges.detect(&gray)?;
        values.push(mask.density());

        // Brightness and contrast
        let gray_stats = gray_moments(&gray)?;
        values.push(gray_stats.mean);
        values.push(gray_stats.std_dev);

        // Shape
        let shape = ShapeMetrics::largest(&mask);
        values.push(shape.area);
        values.push(shape.circularity);

        // Color moments
        for channel in 0..3 {
            let samples: Vec<u8> = rgb.pixels().map(|p| p[channel]).collect();
            let moments = StatisticalMoments::from_bytes(&samples)?;
            values.extend([moments.mean, moments.std_dev, moments.skewness]);
        }

        Ok(values)
    }

    fn channel_histogram(&self, image: &RgbImage, channel: usize) -> Vec<f64> {
        self.color_hist
            .compute(image.pixels().map(|p| f64::from(p[channel])))
    }
}

impl Default for FeatureEncoder {
    fn default() -> Self {
        Self {
            input_size: 224,
            color_hist: HistogramBinner::fixed(COLOR_BINS, 0.0, 256.0),
            texture_hist: HistogramBinner::fixed(TEXTURE_BINS, 0.0, TEXTURE_BINS as f64),
            lbp: LbpComputer::default(),
            edges: EdgeDetector::default(),
        }
    }
}

fn gray_moments(gray: &GrayImage) -> Result<StatisticalMoments, FeatureError> {
    StatisticalMoments::from_bytes(gray.as_raw())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// Mid-gray 224x224 frame with a dark 124x124 square in the middle
    fn square_fixture() -> RgbImage {
        RgbImage::from_fn(224, 224, |x, y| {
            if (50..174).contains(&x) && (50..174).contains(&y) {
                Rgb([30, 30, 30])
            } else {
                Rgb([128, 128, 128])
            }
        })
    }

    fn noisy(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let v = x.wrapping_mul(2654435761).wrapping_add(y.wrapping_mul(40503)) >> 7;
            Rgb([v as u8, (v >> 8) as u8, (v >> 16) as u8])
        })
    }

    #[test]
    fn test_layout_adds_up() {
        assert_eq!(layout::COLOR_MOMENTS.end, FEATURE_DIMENSION);
        assert_eq!(layout::EDGE_DENSITY, 208);
        assert_eq!(layout::CIRCULARITY, 212);
        assert_eq!(feature_names().len(), FEATURE_DIMENSION);
        assert_eq!(feature_names()[layout::BRIGHTNESS], "brightness");
    }

    #[test]
    fn test_feature_vector_validation() {
        assert!(FeatureVector::new(vec![0.0; FEATURE_DIMENSION]).is_ok());
        assert!(FeatureVector::new(vec![0.0; FEATURE_DIMENSION - 1]).is_err());

        let mut values = vec![0.0; FEATURE_DIMENSION];
        values[7] = f64::NAN;
        assert!(FeatureVector::new(values).is_err());
    }

    #[test]
    fn test_feature_vector_json_checks_length() {
        let short = serde_json::to_string(&vec![1.0; 3]).unwrap();
        assert!(serde_json::from_str::<FeatureVector>(&short).is_err());
    }

    #[test]
    fn test_encode_dimension_and_determinism() {
        let encoder = FeatureEncoder::default();
        let img = noisy(97, 61);

        let a = encoder.encode(&img, None).unwrap();
        let b = encoder.encode(&img, None).unwrap();
        assert_eq!(a.len(), FEATURE_DIMENSION);
        let bits_a: Vec<u64> = a.values().iter().map(|v| v.to_bits()).collect();
        let bits_b: Vec<u64> = b.values().iter().map(|v| v.to_bits()).collect();
        assert_eq!(bits_a, bits_b);
    }

    #[test]
    fn test_histograms_count_every_pixel() {
        let v = FeatureEncoder::default().encode(&noisy(300, 200), None).unwrap();
        let pixels = 224.0 * 224.0;
        for range in [layout::RGB_HISTOGRAM, layout::HSV_HISTOGRAM] {
            for channel in v.slice(range).chunks(COLOR_BINS) {
                assert_eq!(channel.iter().sum::<f64>(), pixels);
            }
        }
        assert_eq!(v.slice(layout::TEXTURE_HISTOGRAM).iter().sum::<f64>(), pixels);
    }

    #[test]
    fn test_constant_image() {
        let img = RgbImage::from_pixel(50, 80, Rgb([200, 120, 40]));
        let v = FeatureEncoder::default().encode(&img, None).unwrap();

        assert_eq!(v.edge_density(), 0.0);
        assert_eq!(v.contour_area(), 0.0);
        assert_eq!(v.circularity(), 0.0);
        assert_eq!(v.contrast(), 0.0);

        let moments = v.slice(layout::COLOR_MOMENTS);
        assert_eq!(moments, &[200.0, 0.0, 0.0, 120.0, 0.0, 0.0, 40.0, 0.0, 0.0]);
    }

    #[test]
    fn test_bbox_equals_pre_cropped() {
        let encoder = FeatureEncoder::default();
        let img = noisy(120, 90);
        let bbox = BoundingBox::new(10, 5, 100, 70);

        let with_bbox = encoder.encode(&img, Some(&bbox)).unwrap();
        let cropped = frame::crop(&img, &bbox).unwrap();
        let pre_cropped = encoder.encode(&cropped, None).unwrap();
        assert_eq!(with_bbox, pre_cropped);
    }

    #[test]
    fn test_invalid_bbox_rejected() {
        let encoder = FeatureEncoder::default();
        let img = noisy(40, 40);
        let result = encoder.encode(&img, Some(&BoundingBox::new(0, 0, 41, 10)));
        assert!(matches!(result, Err(FeatureError::InvalidBoundingBox { .. })));
    }

    #[test]
    fn test_zero_area_image_rejected() {
        let img = RgbImage::new(0, 10);
        assert!(matches!(
            FeatureEncoder::default().encode(&img, None),
            Err(FeatureError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_square_fixture_regression() {
        let v = FeatureEncoder::default().encode(&square_fixture(), None).unwrap();
        let pixels = 224.0 * 224.0;

        // Texture: border pixels code 0, flat interior codes saturate the last bin
        let texture = v.slice(layout::TEXTURE_HISTOGRAM);
        assert!(texture[0] >= 4.0 * 223.0);
        assert!(texture[0] + texture[TEXTURE_BINS - 1] >= 0.95 * pixels);

        // Edges: a thin outline around the square
        let density = v.edge_density();
        assert!(density > 0.005 && density < 0.02, "edge density {}", density);

        // Shape: the outline of a ~124 px square
        let area = v.contour_area();
        assert!(area > 14_000.0 && area < 16_500.0, "area {}", area);
        let circularity = v.circularity();
        assert!(circularity > 0.7 && circularity < 0.9, "circularity {}", circularity);

        // Gray histogram-derived stats
        assert!(v.brightness() > 30.0 && v.brightness() < 128.0);
        assert!(v.contrast() > 0.0);

        // Every RGB channel sees the same two values, so moments agree
        let m = v.slice(layout::COLOR_MOMENTS);
        assert_eq!(m[0..3], m[3..6]);
        assert_eq!(m[3..6], m[6..9]);
    }

    #[test]
    fn test_resize_stability() {
        let encoder = FeatureEncoder::default();
        let small = square_fixture();
        let large = image::imageops::resize(&small, 448, 448, image::imageops::FilterType::Nearest);

        let a = encoder.encode(&small, None).unwrap();
        let b = encoder.encode(&large, None).unwrap();
        assert_eq!(a.len(), b.len());
        assert!((a.brightness() - b.brightness()).abs() < 2.0);
        assert!((a.contrast() - b.contrast()).abs() < 2.0);
        assert!((a.circularity() - b.circularity()).abs() < 0.1);
        assert!((a.contour_area() - b.contour_area()).abs() / a.contour_area() < 0.1);
    }

    #[test]
    fn test_invalid_config() {
        let config = EncoderConfig {
            input_size: 0,
            ..Default::default()
        };
        assert!(FeatureEncoder::new(&config).is_err());

        let config = EncoderConfig {
            edge_low_threshold: 200.0,
            ..Default::default()
        };
        assert!(FeatureEncoder::new(&config).is_err());
    }
}
