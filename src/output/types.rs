//! Output type definitions.

use crate::config::{FeatureConfig, FeatureLayout};
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings that produced a set of embeddings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Segment duration in seconds.
    pub segment_duration: f32,
    /// Hop between segments in seconds.
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
    /// Axis order of each feature tensor.
    pub layout: FeatureLayout,
    /// Maximum tensors per inference request.
    pub chunk_size: usize,
}

impl EmbeddingSettings {
    /// Capture the settings of a run.
    pub const fn new(features: &FeatureConfig, chunk_size: usize) -> Self {
        Self {
            sample_rate: features.sample_rate,
            segment_duration: features.segment_duration,
            hop_duration: features.hop_duration,
            n_fft: features.n_fft,
            hop_length: features.hop_length,
            n_mels: features.n_mels,
            f_min: features.f_min,
            f_max: features.f_max,
            layout: features.layout,
            chunk_size,
        }
    }
}

/// Per-file metadata written alongside the embeddings.
#[derive(Debug, Clone)]
pub struct EmbeddingMetadata {
    /// Source audio file.
    pub source: PathBuf,
    /// Model that produced the embeddings.
    pub model: String,
    /// Decoded audio duration in seconds.
    pub audio_duration_secs: f32,
    /// Settings of the run.
    pub settings: EmbeddingSettings,
}

/// Embedding of one segment.
#[derive(Debug, Clone)]
pub struct SegmentEmbedding<'a> {
    /// Zero-based segment index.
    pub index: usize,
    /// Segment start in seconds.
    pub start_time: f32,
    /// Segment end in seconds.
    pub end_time: f32,
    /// Embedding vector.
    pub values: ArrayView1<'a, f32>,
}

/// Iterate over the rows of `embeddings` with their segment timings.
#[allow(clippy::cast_precision_loss)]
pub fn segments<'a>(
    embeddings: &'a Array2<f32>,
    settings: &EmbeddingSettings,
) -> impl Iterator<Item = SegmentEmbedding<'a>> {
    let hop = settings.hop_duration;
    let length = settings.segment_duration;
    embeddings
        .rows()
        .into_iter()
        .enumerate()
        .map(move |(index, values)| {
            let start_time = index as f32 * hop;
            SegmentEmbedding {
                index,
                start_time,
                end_time: start_time + length,
                values,
            }
        })
}
