//! Feature Engineering Engine
//!
//! Converts a decoded RGB image (plus an optional bounding box) into the fixed
//! 222-value feature vector consumed by the cattle/buffalo classifier. The same
//! encoder is used when producing training vectors and when scoring uploads, so
//! every step here is deterministic.

pub mod color;
pub mod contour;
pub mod edges;
mod features;
pub mod frame;
pub mod histogram;
pub mod lbp;
mod statistics;

pub use contour::{Contour, ShapeMetrics};
pub use edges::{EdgeDetector, EdgeMask};
pub use features::{feature_names, layout, EncoderConfig, FeatureEncoder, FeatureVector, FEATURE_DIMENSION};
pub use frame::BoundingBox;
pub use lbp::LbpImage;
pub use statistics::StatisticalMoments;

use thiserror::Error;

/// Errors raised while decoding or encoding an image
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeatureError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error(
        "Invalid bounding box ({xmin}, {ymin}, {xmax}, {ymax}) for {width}x{height} image"
    )]
    InvalidBoundingBox {
        xmin: i64,
        ymin: i64,
        xmax: i64,
        ymax: i64,
        width: u32,
        height: u32,
    },

    #[error("Feature extraction failed: {0}")]
    ExtractionFailure(String),
}
