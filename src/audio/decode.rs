//! Audio decoding using symphonia.

use crate::error::{Error, Result};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Decoded audio data.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Audio samples as mono f32 in range [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Duration in seconds.
    pub duration_secs: f32,
}

fn load_error(path: &Path, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Error {
    Error::AudioLoad {
        path: path.to_path_buf(),
        source: source.into(),
    }
}

/// Decode an audio file to mono f32 samples.
///
/// Supports WAV, FLAC, MP3, and AAC. Multi-channel audio is averaged
/// down to one channel. No resampling happens here.
pub fn decode_audio_file(path: &Path) -> Result<DecodedAudio> {
    let file = File::open(path).map_err(|e| load_error(path, e))?;
    let mss = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| load_error(path, e))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| load_error(path, "no audio tracks found"))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| load_error(path, "missing sample rate"))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| load_error(path, e))?;

    let mut samples = Vec::new();
    let mut interleaved: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(load_error(path, e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder.decode(&packet).map_err(|e| load_error(path, e))?;
        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);

        // Reallocate when a packet is larger than any seen so far.
        let needed = decoded.capacity() * channels;
        if interleaved
            .as_ref()
            .is_none_or(|buf| buf.capacity() < needed)
        {
            interleaved = None;
        }
        let capacity = decoded.capacity() as u64;
        let buffer = interleaved.get_or_insert_with(|| SampleBuffer::new(capacity, spec));
        buffer.copy_interleaved_ref(decoded);

        downmix_into(buffer.samples(), channels, &mut samples);
    }

    #[allow(clippy::cast_precision_loss)]
    let duration_secs = samples.len() as f32 / sample_rate as f32;
    debug!(
        "Decoded {} samples at {} Hz from {}",
        samples.len(),
        sample_rate,
        path.display()
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
        duration_secs,
    })
}

/// Average interleaved frames down to mono and append them to `output`.
fn downmix_into(interleaved: &[f32], channels: usize, output: &mut Vec<f32>) {
    if channels == 1 {
        output.extend_from_slice(interleaved);
        return;
    }

    #[allow(clippy::cast_precision_loss)]
    let scale = 1.0 / channels as f32;
    output.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale),
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_wav(path: &Path, channels: u16, sample_rate: u32, frames: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in frames {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_downmix_mono_passthrough() {
        let mut out = Vec::new();
        downmix_into(&[0.1, 0.2, 0.3], 1, &mut out);
        assert_eq!(out, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_downmix_stereo_averages_frames() {
        let mut out = Vec::new();
        downmix_into(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2, &mut out);
        assert_eq!(out, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_decode_mono_wav() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");
        let frames: Vec<i16> = (0..8000).map(|i| ((i % 100) * 100) as i16).collect();
        write_wav(&path, 1, 8000, &frames);

        let decoded = decode_audio_file(&path).unwrap();
        assert_eq!(decoded.sample_rate, 8000);
        assert_eq!(decoded.samples.len(), 8000);
        assert!((decoded.duration_secs - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_decode_stereo_wav_is_downmixed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stereo.wav");
        // Left at +16384, right at 0: mono mix is a quarter of full scale.
        let frames: Vec<i16> = (0..4000).flat_map(|_| [16384_i16, 0]).collect();
        write_wav(&path, 2, 8000, &frames);

        let decoded = decode_audio_file(&path).unwrap();
        assert_eq!(decoded.samples.len(), 4000);
        assert!(decoded.samples.iter().all(|s| (s - 0.25).abs() < 1e-3));
    }

    #[test]
    fn test_decode_missing_file_is_audio_load_error() {
        let result = decode_audio_file(Path::new("/nonexistent/audio.wav"));
        assert!(matches!(result, Err(Error::AudioLoad { .. })));
    }

    #[test]
    fn test_decode_garbage_is_audio_load_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"definitely not a riff header").unwrap();

        let result = decode_audio_file(&path);
        assert!(matches!(result, Err(Error::AudioLoad { .. })));
    }
}
