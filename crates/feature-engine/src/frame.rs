//! Image frames: decoding, bounding boxes, crop and resize

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::imageops::{self, FilterType};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::FeatureError;

/// Axis-aligned region of interest in pixel coordinates.
///
/// `xmax`/`ymax` are exclusive. Coordinates are signed so that boxes coming
/// straight from user input can be validated instead of wrapping around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: i64,
    pub ymin: i64,
    pub xmax: i64,
    pub ymax: i64,
}

impl BoundingBox {
    pub fn new(xmin: i64, ymin: i64, xmax: i64, ymax: i64) -> Self {
        Self { xmin, ymin, xmax, ymax }
    }

    /// Check `0 <= xmin < xmax <= width` and `0 <= ymin < ymax <= height`
    pub fn validate(&self, width: u32, height: u32) -> Result<(), FeatureError> {
        let ok = 0 <= self.xmin
            && self.xmin < self.xmax
            && self.xmax <= i64::from(width)
            && 0 <= self.ymin
            && self.ymin < self.ymax
            && self.ymax <= i64::from(height);

        if ok {
            Ok(())
        } else {
            Err(FeatureError::InvalidBoundingBox {
                xmin: self.xmin,
                ymin: self.ymin,
                xmax: self.xmax,
                ymax: self.ymax,
                width,
                height,
            })
        }
    }

    /// Width of the box (only meaningful once validated)
    pub fn width(&self) -> u32 {
        (self.xmax - self.xmin) as u32
    }

    /// Height of the box (only meaningful once validated)
    pub fn height(&self) -> u32 {
        (self.ymax - self.ymin) as u32
    }
}

impl From<[i64; 4]> for BoundingBox {
    fn from(b: [i64; 4]) -> Self {
        Self::new(b[0], b[1], b[2], b[3])
    }
}

/// Reject zero-area images
pub fn ensure_non_empty(image: &RgbImage) -> Result<(), FeatureError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(FeatureError::InvalidImage(format!(
            "image has zero area ({}x{})",
            image.width(),
            image.height()
        )));
    }
    Ok(())
}

/// Extract the sub-rectangle covered by `bbox` (no interpolation)
pub fn crop(image: &RgbImage, bbox: &BoundingBox) -> Result<RgbImage, FeatureError> {
    ensure_non_empty(image)?;
    bbox.validate(image.width(), image.height())?;

    let cropped = imageops::crop_imm(
        image,
        bbox.xmin as u32,
        bbox.ymin as u32,
        bbox.width(),
        bbox.height(),
    )
    .to_image();

    Ok(cropped)
}

/// Resize to exactly `width` x `height` using bilinear (triangle) filtering.
///
/// An image that already has the target size is copied unchanged.
pub fn resize_exact(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    imageops::resize(image, width, height, FilterType::Triangle)
}

/// Decode an encoded image (JPEG, PNG, ...) into RGB
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, FeatureError> {
    if bytes.is_empty() {
        return Err(FeatureError::InvalidImage("empty image data".into()));
    }

    let decoded = image::load_from_memory(bytes)
        .map_err(|e| FeatureError::InvalidImage(e.to_string()))?;
    let rgb = decoded.to_rgb8();
    ensure_non_empty(&rgb)?;

    debug!("Decoded {}x{} image ({} bytes)", rgb.width(), rgb.height(), bytes.len());
    Ok(rgb)
}

/// Decode a base64 image payload, accepting an optional `data:image/...;base64,` prefix
pub fn decode_base64(payload: &str) -> Result<RgbImage, FeatureError> {
    let data = match payload.strip_prefix("data:image") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, encoded)| encoded)
            .ok_or_else(|| FeatureError::InvalidImage("malformed data URL".into()))?,
        None => payload,
    };

    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|e| FeatureError::InvalidImage(format!("base64: {}", e)))?;

    decode_image(&bytes)
}
