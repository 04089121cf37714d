//! Log-mel spectrogram computation.
//!
//! Centered STFT with reflect padding and a periodic Hann window, power
//! spectrum, HTK-scale triangular mel filters without area normalization,
//! then `ln(max(x, floor))`. For the default parameters (8 kHz, `n_fft`
//! 1024, hop 256, 256 mels over 300-4000 Hz) one 8000-sample segment
//! becomes 32 frames.

use crate::config::{FeatureConfig, FeatureLayout};
use crate::error::{Error, Result};
use ndarray::{Array1, Array2, Array3, ArrayView2, Axis};
use realfft::{RealFftPlanner, RealToComplex};
use std::f64::consts::PI;
use std::sync::Arc;

/// Log-mel spectrogram extractor.
///
/// All tables are built once in [`LogMelSpectrogram::new`]; after that the
/// transform is a pure function of its input.
pub struct LogMelSpectrogram {
    n_fft: usize,
    hop_length: usize,
    n_mels: usize,
    log_floor: f32,
    layout: FeatureLayout,
    window: Vec<f32>,
    /// Shape `(n_mels, n_fft / 2 + 1)`.
    filterbank: Array2<f32>,
    fft: Arc<dyn RealToComplex<f32>>,
}

impl std::fmt::Debug for LogMelSpectrogram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogMelSpectrogram")
            .field("n_fft", &self.n_fft)
            .field("hop_length", &self.hop_length)
            .field("n_mels", &self.n_mels)
            .field("log_floor", &self.log_floor)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl LogMelSpectrogram {
    /// Build an extractor from feature configuration.
    pub fn new(config: &FeatureConfig) -> Self {
        let fft = RealFftPlanner::<f32>::new().plan_fft_forward(config.n_fft);

        Self {
            n_fft: config.n_fft,
            hop_length: config.hop_length,
            n_mels: config.n_mels,
            log_floor: config.log_floor,
            layout: config.layout,
            window: periodic_hann(config.n_fft),
            filterbank: mel_filterbank(
                config.sample_rate,
                config.n_fft,
                config.n_mels,
                config.f_min,
                config.f_max,
            ),
            fft,
        }
    }

    /// Number of STFT frames produced for `num_samples` input samples.
    ///
    /// Counts full windows over the reflect-padded signal, which for even
    /// `n_fft` reduces to `1 + num_samples / hop_length`.
    pub fn num_frames(&self, num_samples: usize) -> usize {
        let padded = num_samples + 2 * (self.n_fft / 2);
        1 + padded.saturating_sub(self.n_fft) / self.hop_length
    }

    /// Shape of one feature tensor for a segment of `num_samples` samples.
    pub fn feature_shape(&self, num_samples: usize) -> (usize, usize) {
        let frames = self.num_frames(num_samples);
        match self.layout {
            FeatureLayout::MelsFirst => (self.n_mels, frames),
            FeatureLayout::FramesFirst => (frames, self.n_mels),
        }
    }

    /// Compute the log-mel spectrogram of one segment.
    ///
    /// The segment must be longer than `n_fft / 2` samples.
    pub fn compute(&self, segment: &[f32]) -> Result<Array2<f32>> {
        let pad = self.n_fft / 2;
        if segment.len() <= pad {
            return Err(Error::Internal {
                message: format!(
                    "segment of {} samples is too short for n_fft {}",
                    segment.len(),
                    self.n_fft
                ),
            });
        }

        let padded = reflect_pad(segment, pad);
        let n_frames = self.num_frames(segment.len());
        let mut features = Array2::<f32>::zeros(self.feature_shape(segment.len()));

        let mut input = self.fft.make_input_vec();
        let mut spectrum = self.fft.make_output_vec();
        let mut scratch = self.fft.make_scratch_vec();
        let mut power = Array1::<f32>::zeros(spectrum.len());

        for frame in 0..n_frames {
            let start = frame * self.hop_length;
            for ((dst, &src), &w) in input
                .iter_mut()
                .zip(&padded[start..start + self.n_fft])
                .zip(&self.window)
            {
                *dst = src * w;
            }

            self.fft
                .process_with_scratch(&mut input, &mut spectrum, &mut scratch)
                .map_err(|e| Error::Internal {
                    message: format!("FFT failed: {e}"),
                })?;

            for (p, c) in power.iter_mut().zip(&spectrum) {
                *p = c.norm_sqr();
            }

            let mel = self.filterbank.dot(&power);
            let floor = self.log_floor;
            let log_mel = mel.mapv(|v| v.max(floor).ln());

            match self.layout {
                FeatureLayout::MelsFirst => features.column_mut(frame).assign(&log_mel),
                FeatureLayout::FramesFirst => features.row_mut(frame).assign(&log_mel),
            }
        }

        Ok(features)
    }

    /// Compute log-mel spectrograms for every row of `segments`.
    ///
    /// Output shape is `(num_segments, a, b)` where `(a, b)` is
    /// [`Self::feature_shape`]. Each slice equals [`Self::compute`] on that row.
    pub fn compute_batch(&self, segments: ArrayView2<'_, f32>) -> Result<Array3<f32>> {
        let (rows, len) = segments.dim();
        let (a, b) = self.feature_shape(len);
        let mut batch = Array3::<f32>::zeros((rows, a, b));

        for (mut out, segment) in batch
            .axis_iter_mut(Axis(0))
            .zip(segments.axis_iter(Axis(0)))
        {
            let features = match segment.as_slice() {
                Some(slice) => self.compute(slice)?,
                None => self.compute(&segment.to_vec())?,
            };
            out.assign(&features);
        }

        Ok(batch)
    }
}

/// Mirror `pad` samples on each side, excluding the edge sample itself.
fn reflect_pad(samples: &[f32], pad: usize) -> Vec<f32> {
    let n = samples.len();
    let mut padded = Vec::with_capacity(n + 2 * pad);
    padded.extend((1..=pad).rev().map(|i| samples[i]));
    padded.extend_from_slice(samples);
    padded.extend((0..pad).map(|i| samples[n - 2 - i]));
    padded
}

/// Periodic Hann window of length `size`.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn periodic_hann(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| (0.5 - 0.5 * (2.0 * PI * i as f64 / size as f64).cos()) as f32)
        .collect()
}

fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10f64.powf(mel / 2595.0) - 1.0)
}

/// Triangular HTK mel filterbank of shape `(n_mels, n_fft / 2 + 1)`.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize, f_min: f32, f_max: f32) -> Array2<f32> {
    let n_freqs = n_fft / 2 + 1;
    let nyquist = f64::from(sample_rate) / 2.0;
    let bin_hz = nyquist / (n_freqs - 1) as f64;

    let m_min = hz_to_mel(f64::from(f_min));
    let m_max = hz_to_mel(f64::from(f_max));
    let f_pts: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(m_min + (m_max - m_min) * i as f64 / (n_mels + 1) as f64))
        .collect();

    Array2::from_shape_fn((n_mels, n_freqs), |(m, k)| {
        let freq = k as f64 * bin_hz;
        let down = (freq - f_pts[m]) / (f_pts[m + 1] - f_pts[m]);
        let up = (f_pts[m + 2] - freq) / (f_pts[m + 2] - f_pts[m + 1]);
        down.min(up).max(0.0) as f32
    })
}
