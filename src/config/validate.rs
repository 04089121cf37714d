//! Configuration validation.

use crate::config::{Config, FeatureConfig};
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_server(config)?;
    validate_features(&config.features)?;

    if config.batching.chunk_size == 0 {
        return Err(invalid("batching.chunk_size must be at least 1"));
    }

    Ok(())
}

fn invalid(message: impl Into<String>) -> Error {
    Error::ConfigValidation {
        message: message.into(),
    }
}

fn validate_server(config: &Config) -> Result<()> {
    let server = &config.server;

    if server.url.trim().is_empty() {
        return Err(invalid("server.url must not be empty"));
    }
    if server.model.trim().is_empty() {
        return Err(invalid("server.model must not be empty"));
    }
    if server.timeout_secs == 0 {
        return Err(invalid("server.timeout_secs must be at least 1"));
    }

    Ok(())
}

/// Validate feature extraction parameters.
pub fn validate_features(features: &FeatureConfig) -> Result<()> {
    if features.sample_rate == 0 {
        return Err(invalid("features.sample_rate must be positive"));
    }

    if features.segment_duration <= 0.0 || features.hop_duration <= 0.0 {
        return Err(invalid(format!(
            "segment and hop durations must be positive, got {} and {}",
            features.segment_duration, features.hop_duration
        )));
    }

    if features.hop_duration > features.segment_duration {
        return Err(invalid(format!(
            "features.hop_duration ({}) must not exceed features.segment_duration ({})",
            features.hop_duration, features.segment_duration
        )));
    }

    if features.segment_size() == 0 || features.hop_size() == 0 {
        return Err(invalid(
            "segment and hop durations must each cover at least one sample",
        ));
    }

    if features.n_fft < 2 || features.hop_length == 0 || features.n_mels == 0 {
        return Err(invalid(
            "features.n_fft must be at least 2; hop_length and n_mels must be positive",
        ));
    }

    // Reflect padding mirrors n_fft / 2 samples on each side of a segment.
    if features.segment_size() <= features.n_fft / 2 {
        return Err(invalid(format!(
            "segment of {} samples is too short for n_fft {}",
            features.segment_size(),
            features.n_fft
        )));
    }

    #[allow(clippy::cast_precision_loss)]
    let nyquist = features.sample_rate as f32 / 2.0;
    if !(features.f_min >= 0.0 && features.f_min < features.f_max && features.f_max <= nyquist) {
        return Err(invalid(format!(
            "frequency band must satisfy 0 <= f_min < f_max <= {nyquist}, got [{}, {}]",
            features.f_min, features.f_max
        )));
    }

    if features.log_floor <= 0.0 || !features.log_floor.is_finite() {
        return Err(invalid(format!(
            "features.log_floor must be a positive finite number, got {}",
            features.log_floor
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_zero_chunk_size() {
        let mut config = Config::default();
        config.batching.chunk_size = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_empty_url() {
        let mut config = Config::default();
        config.server.url = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_hop_longer_than_segment() {
        let mut config = Config::default();
        config.features.hop_duration = 2.0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_band_above_nyquist() {
        let mut config = Config::default();
        config.features.f_max = 4500.0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_inverted_band() {
        let mut config = Config::default();
        config.features.f_min = 4000.0;
        config.features.f_max = 300.0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_segment_shorter_than_fft_padding() {
        let mut config = Config::default();
        config.features.segment_duration = 0.05;
        config.features.hop_duration = 0.05;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_non_positive_log_floor() {
        let mut config = Config::default();
        config.features.log_floor = 0.0;
        assert!(validate_config(&config).is_err());
    }
}
