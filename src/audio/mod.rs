//! Audio loading, framing, and log-mel feature extraction.

mod decode;
mod framer;
mod mel;
mod resample;

pub use decode::{DecodedAudio, decode_audio_file};
pub use framer::{frame_waveform, segment_count};
pub use mel::LogMelSpectrogram;
pub use resample::resample;
