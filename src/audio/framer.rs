//! Overlapping segment framing with per-segment DC removal.

use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView1, Axis};

/// Number of full segments that fit in `len` samples.
///
/// Zero when `len < segment_size`. `hop_size` must be non-zero.
pub fn segment_count(len: usize, segment_size: usize, hop_size: usize) -> usize {
    if len < segment_size {
        0
    } else {
        (len - segment_size) / hop_size + 1
    }
}

/// Slice a waveform into overlapping segments, each with its own mean removed.
///
/// Row `i` of the result holds `samples[i * hop_size..i * hop_size + segment_size]`
/// minus that row's mean. A trailing partial segment is dropped, never padded.
///
/// # Errors
///
/// Returns [`Error::InsufficientAudioLength`] when the waveform is shorter
/// than one segment.
pub fn frame_waveform(samples: &[f32], segment_size: usize, hop_size: usize) -> Result<Array2<f32>> {
    if segment_size == 0 || hop_size == 0 {
        return Err(Error::Internal {
            message: format!("invalid framing: segment {segment_size}, hop {hop_size}"),
        });
    }

    let count = segment_count(samples.len(), segment_size, hop_size);
    if count == 0 {
        return Err(Error::InsufficientAudioLength {
            samples: samples.len(),
            required: segment_size,
        });
    }

    let mut segments = Array2::from_shape_fn((count, segment_size), |(row, col)| {
        samples[row * hop_size + col]
    });

    for mut segment in segments.axis_iter_mut(Axis(0)) {
        let mean = segment_mean(segment.view());
        segment.mapv_inplace(|s| s - mean);
    }

    Ok(segments)
}

/// Mean of one segment, accumulated in f64 to keep long sums stable.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn segment_mean(segment: ArrayView1<'_, f32>) -> f32 {
    let sum: f64 = segment.iter().map(|&s| f64::from(s)).sum();
    (sum / segment.len() as f64) as f32
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[allow(clippy::cast_precision_loss)]
    fn ramp(len: usize) -> Vec<f32> {
        (0..len).map(|i| (i as f32 * 0.37).sin() + 0.25).collect()
    }

    #[test]
    fn test_segment_count_matches_formula() {
        for len in [8000, 8001, 11_999, 12_000, 24_000, 80_123] {
            assert_eq!(segment_count(len, 8000, 4000), (len - 8000) / 4000 + 1);
        }
        assert_eq!(segment_count(7999, 8000, 4000), 0);
    }

    #[test]
    fn test_three_seconds_yields_five_segments() {
        let segments = frame_waveform(&ramp(24_000), 8000, 4000).unwrap();
        assert_eq!(segments.dim(), (5, 8000));
    }

    #[test]
    fn test_exactly_one_segment() {
        let segments = frame_waveform(&ramp(8000), 8000, 4000).unwrap();
        assert_eq!(segments.nrows(), 1);
    }

    #[test]
    fn test_short_waveform_is_rejected() {
        let result = frame_waveform(&ramp(7999), 8000, 4000);
        assert!(matches!(
            result,
            Err(Error::InsufficientAudioLength {
                samples: 7999,
                required: 8000
            })
        ));
    }

    #[test]
    fn test_empty_waveform_is_rejected() {
        let result = frame_waveform(&[], 8000, 4000);
        assert!(matches!(result, Err(Error::InsufficientAudioLength { .. })));
    }

    #[test]
    fn test_each_segment_has_zero_mean() {
        let segments = frame_waveform(&ramp(30_000), 8000, 4000).unwrap();
        for segment in segments.axis_iter(Axis(0)) {
            assert!(segment_mean(segment).abs() < 1e-5);
        }
    }

    #[test]
    fn test_dc_is_removed_per_segment_not_globally() {
        // First half at +1.0, second half at -1.0: each segment has its own mean.
        let mut samples = vec![1.0_f32; 8000];
        samples.extend(vec![-1.0_f32; 8000]);
        let segments = frame_waveform(&samples, 8000, 4000).unwrap();

        assert_eq!(segments.nrows(), 3);
        assert!(segments.row(0).iter().all(|&s| s.abs() < 1e-6));
        assert!(segments.row(2).iter().all(|&s| s.abs() < 1e-6));
        // Middle segment straddles the step: mean 0, values +-1.
        assert!((segments[[1, 0]] - 1.0).abs() < 1e-6);
        assert!((segments[[1, 7999]] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_segments_overlap_by_segment_minus_hop() {
        let samples = ramp(16_000);
        let segments = frame_waveform(&samples, 8000, 4000).unwrap();
        // The shared half differs only by the difference of the two segment means.
        let delta = segments[[0, 4000]] - segments[[1, 0]];
        for k in 0..4000 {
            assert!((segments[[0, 4000 + k]] - segments[[1, k]] - delta).abs() < 1e-5);
        }
    }
}
