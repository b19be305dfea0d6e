//! Configuration management for InfraLens.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. Every section implements `Default`, so a partial file only
//! overrides what it names.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for InfraLens.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Processing settings
    pub processing: ProcessingConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Embedding model settings
    pub embedding: EmbeddingConfig,

    /// Decision policy thresholds
    pub classifier: ClassifierConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.infralens.infralens/config.toml
    /// - Linux: ~/.config/infralens/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\infralens\config\config.toml
    ///
    /// Falls back to ~/.infralens/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "infralens", "infralens")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".infralens").join("config.toml")
            })
    }

    /// Get the resolved model directory path (with ~ expansion).
    pub fn model_dir(&self) -> PathBuf {
        let path_str = self.general.model_dir.to_string_lossy();
        let expanded = shellexpand::tilde(&path_str);
        PathBuf::from(expanded.into_owned())
    }

    /// Directory holding the configured embedding model's files.
    pub fn embedding_model_dir(&self) -> PathBuf {
        self.model_dir().join(&self.embedding.model)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.processing.parallel_workers, 4);
        assert_eq!(config.limits.max_file_size_mb, 100);
        assert_eq!(config.embedding.model, "clip-vit-base-patch32");
        assert_eq!(config.embedding.image_size, 224);
    }

    #[test]
    fn test_default_thresholds() {
        let config = Config::default();
        assert_eq!(config.classifier.gate_threshold, 0.40);
        assert_eq!(config.classifier.confirm_threshold, 0.30);
        assert_eq!(config.classifier.accept_threshold, 0.35);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[classifier]"));
        assert!(toml.contains("gate_threshold"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [classifier]
            accept_threshold = 0.5

            [limits]
            classify_timeout_ms = 1000
            "#,
        )
        .unwrap();
        assert_eq!(config.classifier.accept_threshold, 0.5);
        assert_eq!(config.classifier.gate_threshold, 0.40);
        assert_eq!(config.limits.classify_timeout_ms, 1000);
        assert_eq!(config.limits.decode_timeout_ms, 5000);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[general]\nmodel_dir = \"/opt/models\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.model_dir(), PathBuf::from("/opt/models"));
        assert_eq!(
            config.embedding_model_dir(),
            PathBuf::from("/opt/models/clip-vit-base-patch32")
        );
    }

    #[test]
    fn test_load_from_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[classifier]\nconfirm_threshold = 1.5\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("confirm_threshold"));
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = Config::load_from(Path::new("/nonexistent/infralens.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError(_)));
    }
}
