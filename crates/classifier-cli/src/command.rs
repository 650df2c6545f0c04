//! Subcommands

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use feature_engine::{frame, BoundingBox, FeatureEncoder};
use image::RgbImage;
use inference_engine::{ClassificationService, InferenceError, ModelRegistry};
use tracing::{info, warn};

use crate::settings::AppConfig;
use crate::CliError;

/// Cattle and buffalo classification from still images
///
/// Configuration is read from bovine-classifier.toml (or the file named by
/// BOVINE_CONFIG) and BOVINE_* environment variables.
#[derive(Debug, Parser)]
#[command(name = "bovine-classifier")]
#[command(about = "Classify cattle and buffalo images", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Print the feature vector as JSON
    Extract {
        /// Image file to read
        image: PathBuf,

        /// Crop to this box before extraction
        #[arg(long, num_args = 4, value_names = ["XMIN", "YMIN", "XMAX", "YMAX"], allow_negative_numbers = true)]
        bbox: Option<Vec<i64>>,
    },

    /// Print the classification result as JSON
    Classify {
        /// Image file to read
        image: PathBuf,

        /// Crop to this box before extraction
        #[arg(long, num_args = 4, value_names = ["XMIN", "YMIN", "XMAX", "YMAX"], allow_negative_numbers = true)]
        bbox: Option<Vec<i64>>,
    },

    /// Report whether a model is loaded
    Health,

    /// Print the model metadata, or report that no model is loaded
    ModelInfo,
}

impl Command {
    /// Run the command and return what should be printed
    pub fn run(&self, config: &AppConfig) -> Result<String, CliError> {
        match self {
            Command::Extract { image, bbox } => {
                let bbox = bounding_box(bbox.as_deref())?;
                let image = read_image(image)?;
                let vector = FeatureEncoder::default().encode(&image, bbox.as_ref())?;
                Ok(serde_json::to_string(&vector)?)
            }
            Command::Classify { image, bbox } => {
                let bbox = bounding_box(bbox.as_deref())?;
                let service = ClassificationService::new(Arc::new(open_registry(config)), FeatureEncoder::default());
                if !service.registry().is_loaded() {
                    return Err(InferenceError::ModelUnavailable.into());
                }
                let image = read_image(image)?;
                let result = service.classify_image(&image, bbox.as_ref())?;
                Ok(serde_json::to_string_pretty(&result)?)
            }
            Command::Health => {
                let registry = open_registry(config);
                Ok(serde_json::to_string_pretty(&registry.health())?)
            }
            Command::ModelInfo => {
                let registry = open_registry(config);
                Ok(serde_json::to_string_pretty(&registry.model_info())?)
            }
        }
    }
}

fn bounding_box(values: Option<&[i64]>) -> Result<Option<BoundingBox>, CliError> {
    values
        .map(|values| {
            <[i64; 4]>::try_from(values)
                .map(BoundingBox::from)
                .map_err(|_| CliError::Usage(format!("bounding box needs 4 values, got {}", values.len())))
        })
        .transpose()
}

fn read_image(path: &Path) -> Result<RgbImage, CliError> {
    let bytes = fs::read(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(frame::decode_image(&bytes)?)
}

/// A registry holding the configured model, or an empty one when it cannot be
/// loaded. Health reporting works either way.
fn open_registry(config: &AppConfig) -> ModelRegistry {
    let registry = ModelRegistry::new();
    match registry.load_from_files(&config.model_path, &config.metadata_path) {
        Ok(()) => info!("Model ready: {}", config.model_path.display()),
        Err(e) => warn!("Model not loaded: {}", e),
    }
    registry
}
