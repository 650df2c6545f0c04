//! Bovine Classifier command-line front end
//!
//! Wires configuration and logging around the feature encoder and the
//! classification service.

mod command;
mod settings;

pub use command::{Cli, Command};
pub use settings::{AppConfig, CONFIG_FILE_VAR, DEFAULT_CONFIG_FILE};

use std::path::PathBuf;

use feature_engine::FeatureError;
use inference_engine::InferenceError;
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Usage error: {0}")]
    Usage(String),
    #[error("Cannot read {path}: {source}", path = .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Feature(#[from] FeatureError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<config::ConfigError> for CliError {
    fn from(e: config::ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

/// Install the global tracing subscriber. Logs go to stderr so command
/// output on stdout stays machine readable.
pub fn init_logging(config: &AppConfig) -> Result<(), CliError> {
    let level: Level = config
        .log_level
        .parse()
        .map_err(|_| CliError::Config(format!("invalid log_level '{}'", config.log_level)))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    let installed = if config.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    installed.map_err(|e| CliError::Config(format!("failed to set tracing subscriber: {}", e)))
}
