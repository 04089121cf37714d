//! End-to-end embedding of one audio file.

use super::assembler::assemble;
use super::chunker::Chunker;
use crate::audio::{LogMelSpectrogram, decode_audio_file, frame_waveform, resample};
use crate::config::{Config, FeatureConfig, validate_config};
use crate::error::{Error, Result};
use crate::inference::{EmbeddingClient, InferenceBackend};
use indicatif::ProgressBar;
use ndarray::{Array2, Array3, Axis};
use std::path::Path;
use tracing::{debug, info};

/// Turns audio into an ordered sequence of embeddings.
///
/// Construction validates the configuration and precomputes the spectral
/// transform; afterwards every operation is read-only, so the same
/// embedder can process any number of files one after another.
#[derive(Debug)]
pub struct Embedder<B> {
    features: FeatureConfig,
    resample: bool,
    mel: LogMelSpectrogram,
    chunker: Chunker,
    client: EmbeddingClient<B>,
}

impl<B: InferenceBackend> Embedder<B> {
    /// Build an embedder from `config`, sending requests through `backend`.
    pub fn new(config: &Config, backend: B) -> Result<Self> {
        validate_config(config)?;

        Ok(Self {
            features: config.features.clone(),
            resample: config.audio.resample,
            mel: LogMelSpectrogram::new(&config.features),
            chunker: Chunker::new(config.batching.chunk_size)?,
            client: EmbeddingClient::new(backend, &config.server),
        })
    }

    /// Feature extraction settings in use.
    pub const fn features(&self) -> &FeatureConfig {
        &self.features
    }

    /// The embedding client.
    pub const fn client(&self) -> &EmbeddingClient<B> {
        &self.client
    }

    /// The chunker.
    pub const fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    /// Decode `path` and embed it.
    ///
    /// Returns one row per segment. Any failure aborts the whole file; no
    /// partial result is returned.
    pub fn embed_file(&self, path: &Path) -> Result<Array2<f32>> {
        let features = self.extract_features(path)?;
        self.embed_features(&features, None)
    }

    /// Decode `path` and compute its feature tensors without inference.
    pub fn extract_features(&self, path: &Path) -> Result<Array3<f32>> {
        let samples = self.load_waveform(path)?;
        self.features_from_samples(&samples, self.features.sample_rate)
    }

    /// Decode `path` to a mono waveform at the configured sample rate.
    ///
    /// A different source rate is resampled when resampling is enabled and
    /// rejected with [`Error::SampleRateMismatch`] otherwise.
    pub fn load_waveform(&self, path: &Path) -> Result<Vec<f32>> {
        let decoded = decode_audio_file(path)?;
        self.conform_rate(decoded.samples, decoded.sample_rate, path)
    }

    /// Frame `samples` and compute one log-mel tensor per segment.
    pub fn features_from_samples(&self, samples: &[f32], sample_rate: u32) -> Result<Array3<f32>> {
        let converted;
        let samples = if sample_rate == self.features.sample_rate {
            samples
        } else {
            converted = self.conform_rate(samples.to_vec(), sample_rate, Path::new("<samples>"))?;
            converted.as_slice()
        };

        let segments = frame_waveform(
            samples,
            self.features.segment_size(),
            self.features.hop_size(),
        )?;
        debug!("Framed {} segments", segments.nrows());

        self.mel.compute_batch(segments.view())
    }

    /// Run inference over `features` chunk by chunk and assemble the result.
    ///
    /// Chunks are sent strictly in order. The first failing chunk aborts
    /// the run with [`Error::InferenceFailure`].
    pub fn embed_features(
        &self,
        features: &Array3<f32>,
        progress: Option<&ProgressBar>,
    ) -> Result<Array2<f32>> {
        let total = features.len_of(Axis(0));
        let chunks = self.chunker.split(features);
        debug!(
            "Embedding {} tensors in {} chunk(s) with model '{}'",
            total,
            chunks.len(),
            self.client.model()
        );

        let mut batches = Vec::with_capacity(chunks.len());
        for (chunk_index, chunk) in chunks.into_iter().enumerate() {
            let len = chunk.len_of(Axis(0));
            batches.push(self.client.embed_chunk(chunk_index, chunk)?);
            if let Some(pb) = progress {
                pb.inc(len as u64);
            }
        }

        let embeddings = assemble(&batches)?;
        if embeddings.nrows() != total {
            return Err(Error::Internal {
                message: format!(
                    "assembled {} embeddings for {} segments",
                    embeddings.nrows(),
                    total
                ),
            });
        }
        Ok(embeddings)
    }

    fn conform_rate(&self, samples: Vec<f32>, sample_rate: u32, source: &Path) -> Result<Vec<f32>> {
        let expected = self.features.sample_rate;
        if sample_rate == expected {
            return Ok(samples);
        }
        if !self.resample {
            return Err(Error::SampleRateMismatch {
                path: source.to_path_buf(),
                expected,
                actual: sample_rate,
            });
        }
        info!("Resampling {} Hz to {} Hz", sample_rate, expected);
        resample(samples, sample_rate, expected)
    }
}
