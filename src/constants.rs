//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track. Runtime values are taken from
//! [`crate::config::Config`], which falls back to these defaults.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "fpembed";

/// Feature extraction defaults.
pub mod features {
    /// Sample rate the model was trained on, in Hz.
    pub const SAMPLE_RATE: u32 = 8000;

    /// Segment duration in seconds.
    pub const SEGMENT_DURATION: f32 = 1.0;

    /// Hop between consecutive segment starts in seconds.
    pub const HOP_DURATION: f32 = 0.5;

    /// FFT size for the STFT.
    pub const N_FFT: usize = 1024;

    /// STFT hop length in samples.
    pub const HOP_LENGTH: usize = 256;

    /// Number of mel bins.
    pub const N_MELS: usize = 256;

    /// Lower edge of the mel filterbank in Hz.
    pub const F_MIN: f32 = 300.0;

    /// Upper edge of the mel filterbank in Hz.
    pub const F_MAX: f32 = 4000.0;

    /// Floor applied to mel energies before taking the natural log.
    pub const LOG_FLOOR: f32 = 1e-5;
}

/// Batching defaults.
pub mod batching {
    /// Maximum number of feature tensors sent in one inference request.
    pub const CHUNK_SIZE: usize = 1024;
}

/// Inference server defaults.
pub mod server {
    /// Default server address.
    pub const URL: &str = "http://localhost:8000";

    /// Name of the embedding model on the server.
    pub const MODEL_NAME: &str = "neuralfp";

    /// Name of the model's input tensor.
    pub const INPUT_NAME: &str = "input";

    /// Name of the model's output tensor.
    pub const OUTPUT_NAME: &str = "output";

    /// Request identifier sent with every inference call.
    ///
    /// Requests are issued one at a time, so a fixed identifier never
    /// needs to correlate concurrent responses.
    pub const REQUEST_ID: &str = "1";

    /// Default request timeout in seconds.
    pub const TIMEOUT_SECS: u64 = 60;
}

/// Output file extensions by format.
pub mod output_extensions {
    /// JSON output extension.
    pub const JSON: &str = ".embeddings.json";
    /// CSV output extension.
    pub const CSV: &str = ".embeddings.csv";
    /// Feature dump extension.
    pub const FEATURES: &str = ".features.json";
}

/// Supported audio file extensions for directory scanning.
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "flac", "mp3", "m4a", "aac"];
