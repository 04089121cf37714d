//! Audio resampling using rubato.
//!
//! Only used when `audio.resample` is enabled; by default a rate mismatch
//! is reported instead.

use crate::error::{Error, Result};
use audioadapter_buffers::direct::SequentialSlice;
use rubato::{Fft, FixedSync, Resampler};
use tracing::debug;

const BLOCK_FRAMES: usize = 1024;

fn resample_error(reason: impl std::fmt::Display) -> Error {
    Error::Resample {
        reason: reason.to_string(),
    }
}

/// Resample mono audio from `from_rate` to `to_rate`.
///
/// Returns the input unchanged if the rates already match. The output
/// length is `ceil(len * to_rate / from_rate)`.
pub fn resample(samples: Vec<f32>, from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate {
        return Ok(samples);
    }
    if from_rate == 0 || to_rate == 0 {
        return Err(resample_error(format!(
            "invalid rates {from_rate} Hz -> {to_rate} Hz"
        )));
    }

    debug!(
        "Resampling {} samples from {} Hz to {} Hz",
        samples.len(),
        from_rate,
        to_rate
    );

    let mut resampler = Fft::<f32>::new(
        from_rate as usize,
        to_rate as usize,
        BLOCK_FRAMES,
        1,
        1,
        FixedSync::Both,
    )
    .map_err(resample_error)?;

    let block = resampler.input_frames_next();
    let expected = expected_output_len(samples.len(), from_rate, to_rate);
    let mut output = Vec::with_capacity(expected + BLOCK_FRAMES);

    let blocks = samples.chunks(block);
    let mut padded = Vec::with_capacity(block);
    for chunk in blocks {
        // The resampler needs full blocks; zero-pad the tail.
        let input = if chunk.len() == block {
            chunk
        } else {
            padded.clear();
            padded.extend_from_slice(chunk);
            padded.resize(block, 0.0);
            padded.as_slice()
        };

        let adapter = SequentialSlice::new(input, 1, block)
            .map_err(|e| resample_error(format!("failed to create input adapter: {e}")))?;
        let resampled = resampler
            .process(&adapter, 0, None)
            .map_err(resample_error)?;
        output.extend_from_slice(&resampled.take_data());
    }

    output.truncate(expected);
    Ok(output)
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn expected_output_len(input_len: usize, from_rate: u32, to_rate: u32) -> usize {
    ((input_len as f64) * f64::from(to_rate) / f64::from(from_rate)).ceil() as usize
}
