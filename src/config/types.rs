//! Configuration type definitions.

use crate::constants::{batching, features, server};
use serde::{Deserialize, Serialize};

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Inference server settings.
    pub server: ServerConfig,

    /// Feature extraction settings.
    pub features: FeatureConfig,

    /// Batching settings.
    pub batching: BatchingConfig,

    /// Audio loading settings.
    pub audio: AudioConfig,

    /// Output settings.
    pub output: OutputConfig,
}

/// Inference server connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Server address, either `host:port` or a full URL.
    pub url: String,

    /// Model name to run on the server.
    pub model: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Identifier attached to each inference request.
    pub request_id: String,

    /// Send input tensors as raw bytes (binary tensor data extension)
    /// instead of JSON number arrays.
    pub binary_data: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: server::URL.to_string(),
            model: server::MODEL_NAME.to_string(),
            timeout_secs: server::TIMEOUT_SECS,
            request_id: server::REQUEST_ID.to_string(),
            binary_data: true,
        }
    }
}

/// Axis order of a single feature tensor.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FeatureLayout {
    /// `(mel_bins, time_frames)`, the layout `neuralfp` consumes.
    #[default]
    MelsFirst,
    /// `(time_frames, mel_bins)`.
    FramesFirst,
}

/// Log-mel feature extraction parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeatureConfig {
    /// Expected sample rate in Hz.
    pub sample_rate: u32,

    /// Segment duration in seconds.
    pub segment_duration: f32,

    /// Hop between segment starts in seconds.
    pub hop_duration: f32,

    /// FFT size.
    pub n_fft: usize,

    /// STFT hop length in samples.
    pub hop_length: usize,

    /// Number of mel bins.
    pub n_mels: usize,

    /// Lowest filterbank frequency in Hz.
    pub f_min: f32,

    /// Highest filterbank frequency in Hz.
    pub f_max: f32,

    /// Floor applied before the natural log.
    pub log_floor: f32,

    /// Axis order of each feature tensor.
    pub layout: FeatureLayout,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sample_rate: features::SAMPLE_RATE,
            segment_duration: features::SEGMENT_DURATION,
            hop_duration: features::HOP_DURATION,
            n_fft: features::N_FFT,
            hop_length: features::HOP_LENGTH,
            n_mels: features::N_MELS,
            f_min: features::F_MIN,
            f_max: features::F_MAX,
            log_floor: features::LOG_FLOOR,
            layout: FeatureLayout::default(),
        }
    }
}

impl FeatureConfig {
    /// Segment length in samples.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn segment_size(&self) -> usize {
        (self.segment_duration * self.sample_rate as f32) as usize
    }

    /// Hop between segment starts in samples.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn hop_size(&self) -> usize {
        (self.hop_duration * self.sample_rate as f32) as usize
    }
}

/// Batching settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BatchingConfig {
    /// Maximum feature tensors per inference request.
    pub chunk_size: usize,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            chunk_size: batching::CHUNK_SIZE,
        }
    }
}

/// Audio loading settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AudioConfig {
    /// Resample audio whose rate differs from `features.sample_rate`
    /// instead of rejecting it.
    pub resample: bool,
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    /// Output formats to write for each file.
    pub formats: Vec<OutputFormat>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            formats: vec![OutputFormat::Json],
        }
    }
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON document with settings and embedding rows.
    Json,
    /// One CSV row per segment.
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("json".parse::<OutputFormat>().ok(), Some(OutputFormat::Json));
        assert_eq!("CSV".parse::<OutputFormat>().ok(), Some(OutputFormat::Csv));
        assert!("npy".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Json.to_string(), "json");
        assert_eq!(OutputFormat::Csv.to_string(), "csv");
    }

    #[test]
    fn test_default_segment_and_hop_sizes() {
        let features = FeatureConfig::default();
        assert_eq!(features.segment_size(), 8000);
        assert_eq!(features.hop_size(), 4000);
    }

    #[test]
    fn test_default_server_config() {
        let server = ServerConfig::default();
        assert_eq!(server.model, "neuralfp");
        assert_eq!(server.request_id, "1");
        assert!(server.binary_data);
    }

    #[test]
    fn test_json_requests_can_be_selected() {
        let config: Config = toml::from_str("[server]\nbinary_data = false\n").unwrap_or_default();
        assert!(!config.server.binary_data);
        assert_eq!(config.server.model, "neuralfp");
    }

    #[test]
    fn test_feature_layout_serde_names() {
        let config: FeatureConfig = toml::from_str(r#"layout = "frames_first""#).unwrap_or_default();
        assert_eq!(config.layout, FeatureLayout::FramesFirst);
    }
}
