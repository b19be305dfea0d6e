//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.parallel_workers == 0 {
            return Err(ConfigError::ValidationError(
                "processing.parallel_workers must be > 0".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.classify_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.classify_timeout_ms must be > 0".into(),
            ));
        }
        if self.embedding.image_size == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.image_size must be > 0".into(),
            ));
        }
        if !(self.embedding.logit_scale > 0.0) {
            return Err(ConfigError::ValidationError(
                "embedding.logit_scale must be > 0".into(),
            ));
        }

        let thresholds = [
            ("gate_threshold", self.classifier.gate_threshold),
            ("confirm_threshold", self.classifier.confirm_threshold),
            ("accept_threshold", self.classifier.accept_threshold),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "classifier.{name} must be between 0.0 and 1.0"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_parallel_workers() {
        let mut config = Config::default();
        config.processing.parallel_workers = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("parallel_workers"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.limits.classify_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("classify_timeout_ms"));
    }

    #[test]
    fn test_validate_rejects_bad_logit_scale() {
        let mut config = Config::default();
        config.embedding.logit_scale = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logit_scale"));

        config.embedding.logit_scale = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_thresholds_out_of_range() {
        let mut config = Config::default();
        config.classifier.gate_threshold = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("gate_threshold"));

        let mut config = Config::default();
        config.classifier.accept_threshold = -0.1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("accept_threshold"));
    }
}
