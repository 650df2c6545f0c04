//! Application configuration

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::CliError;

/// Config file read from the working directory when `BOVINE_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "bovine-classifier.toml";

/// Names the config file to read instead of the default
pub const CONFIG_FILE_VAR: &str = "BOVINE_CONFIG";

const ENV_PREFIX: &str = "BOVINE";

/// Encoder settings are fixed; a config section under this key is rejected
const ENCODER_KEY: &str = "encoder";

/// Runtime settings: defaults, then the config file, then `BOVINE_*` variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Trained model blob
    pub model_path: PathBuf,
    /// JSON sidecar describing the model
    pub metadata_path: PathBuf,
    /// trace, debug, info, warn or error
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("cattle_buffalo_model.model"),
            metadata_path: PathBuf::from("cattle_buffalo_model_metadata.json"),
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl AppConfig {
    /// Load from the process environment
    pub fn load() -> Result<Self, CliError> {
        match env::var(CONFIG_FILE_VAR) {
            Ok(file) => Self::load_from(&file, true, None),
            Err(_) => Self::load_from(DEFAULT_CONFIG_FILE, false, None),
        }
    }

    /// Load from an explicit file; `vars` replaces the process environment
    /// when given.
    pub fn load_from(
        file: &str,
        required: bool,
        vars: Option<HashMap<String, String>>,
    ) -> Result<Self, CliError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(file).required(required))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(vars),
            );

        let raw = builder.build()?;
        if raw.get_table(ENCODER_KEY).is_ok() {
            return Err(CliError::Config(
                "encoder settings are fixed and cannot be overridden".into(),
            ));
        }

        let config: Self = raw.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CliError> {
        if self.log_level.parse::<tracing::Level>().is_err() {
            return Err(CliError::Config(format!("invalid log_level '{}'", self.log_level)));
        }
        if self.model_path.as_os_str().is_empty() || self.metadata_path.as_os_str().is_empty() {
            return Err(CliError::Config("model_path and metadata_path must be set".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env() -> Option<HashMap<String, String>> {
        Some(HashMap::new())
    }

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("absent.toml");
        let config = AppConfig::load_from(file.to_str().unwrap(), false, no_env()).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_required_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("absent.toml");
        assert!(matches!(
            AppConfig::load_from(file.to_str().unwrap(), true, no_env()),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn test_file_then_environment() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bovine-classifier.toml");
        std::fs::write(
            &file,
            "model_path = \"models/herd.model\"\nlog_level = \"debug\"\n",
        )
        .unwrap();

        let vars = HashMap::from([
            ("BOVINE_LOG_LEVEL".to_string(), "warn".to_string()),
            ("BOVINE_LOG_JSON".to_string(), "true".to_string()),
        ]);
        let config = AppConfig::load_from(file.to_str().unwrap(), true, Some(vars)).unwrap();

        assert_eq!(config.model_path, PathBuf::from("models/herd.model"));
        assert_eq!(config.metadata_path, AppConfig::default().metadata_path);
        assert_eq!(config.log_level, "warn");
        assert!(config.log_json);
    }

    #[test]
    fn test_encoder_overrides_rejected() {
        let dir = tempfile::tempdir().unwrap();

        let file = dir.path().join("bovine-classifier.toml");
        std::fs::write(&file, "[encoder]\ninput_size = 128\n").unwrap();
        assert!(matches!(
            AppConfig::load_from(file.to_str().unwrap(), true, no_env()),
            Err(CliError::Config(_))
        ));

        let absent = dir.path().join("absent.toml");
        let vars = HashMap::from([
            ("BOVINE_ENCODER__INPUT_SIZE".to_string(), "32".to_string()),
            ("BOVINE_ENCODER__LBP_NEIGHBORS".to_string(), "16".to_string()),
            ("BOVINE_ENCODER__EDGE_LOW_THRESHOLD".to_string(), "0".to_string()),
        ]);
        assert!(matches!(
            AppConfig::load_from(absent.to_str().unwrap(), false, Some(vars)),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_log_level() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("absent.toml");
        let vars = HashMap::from([("BOVINE_LOG_LEVEL".to_string(), "loud".to_string())]);
        assert!(matches!(
            AppConfig::load_from(file.to_str().unwrap(), false, Some(vars)),
            Err(CliError::Config(_))
        ));
    }
}
