//! Error types for fpembed.

use crate::inference::InferenceError;

/// Result type alias for fpembed operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for fpembed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// No valid audio files found.
    #[error("no valid audio files found in the provided paths")]
    NoValidAudioFiles,

    /// The audio decoder could not open or decode the file.
    #[error("failed to load audio from '{path}'")]
    AudioLoad {
        /// Path to the audio file.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Decoded sample rate differs from the configured feature sample rate.
    #[error(
        "sample rate mismatch in '{path}': expected {expected} Hz, got {actual} Hz (enable resampling to convert)"
    )]
    SampleRateMismatch {
        /// Path to the audio file.
        path: std::path::PathBuf,
        /// Configured sample rate.
        expected: u32,
        /// Sample rate of the decoded audio.
        actual: u32,
    },

    /// Waveform is shorter than one segment.
    #[error("audio too short: {samples} samples, at least {required} required for one segment")]
    InsufficientAudioLength {
        /// Number of samples in the waveform.
        samples: usize,
        /// Samples needed for a single segment.
        required: usize,
    },

    /// Failed to resample audio.
    #[error("failed to resample audio: {reason}")]
    Resample {
        /// Description of the resampling failure.
        reason: String,
    },

    /// Failed to build the inference client.
    #[error("failed to build inference client: {reason}")]
    ClientBuild {
        /// Description of the build failure.
        reason: String,
    },

    /// An inference request for one chunk failed.
    #[error("inference failed for chunk {chunk_index}")]
    InferenceFailure {
        /// Zero-based index of the failing chunk.
        chunk_index: usize,
        /// Underlying inference error.
        #[source]
        source: InferenceError,
    },

    /// An inference request outside the chunk loop failed (health checks, metadata).
    #[error("inference server request failed")]
    Server(#[source] InferenceError),

    /// The server or the model reported itself not ready.
    #[error("{target} is not ready")]
    NotReady {
        /// What was probed.
        target: String,
    },

    /// Some files of a batch run failed.
    #[error("{failed} of {total} file(s) failed")]
    FilesFailed {
        /// Number of failed files.
        failed: usize,
        /// Number of files attempted.
        total: usize,
    },

    /// Chunks returned embeddings of different widths.
    #[error("chunk {chunk_index} returned embeddings of dimension {actual}, expected {expected}")]
    EmbeddingDimMismatch {
        /// Zero-based index of the offending chunk.
        chunk_index: usize,
        /// Dimension of the first chunk's embeddings.
        expected: usize,
        /// Dimension of this chunk's embeddings.
        actual: usize,
    },

    /// Failed to write an output file.
    #[error("failed to write output file '{path}'")]
    OutputWrite {
        /// Path to the output file.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to create output directory.
    #[error("failed to create output directory '{path}'")]
    OutputDirCreateFailed {
        /// Path to the output directory.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Internal error (for unexpected failures).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}
