//! Single file processing pipeline.

use super::coordinator::{ProcessOptions, output_path_for};
use super::embedder::Embedder;
use crate::config::OutputFormat;
use crate::error::{Error, Result};
use crate::inference::InferenceBackend;
use crate::output::{
    CsvWriter, EmbeddingMetadata, EmbeddingSettings, JsonEmbeddingWriter, OutputWriter, progress,
    segments,
};
use indicatif::MultiProgress;
use ndarray::{Array2, Axis};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Result of processing a single file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Number of segments embedded.
    pub segments: usize,
    /// Width of each embedding.
    pub embedding_dim: usize,
    /// Number of inference requests sent.
    pub chunks: usize,
    /// Processing duration in seconds.
    pub duration_secs: f64,
    /// Audio duration in seconds.
    pub audio_duration_secs: f32,
}

/// Embed a single audio file and write every requested output format.
///
/// Outputs are written only after all chunks succeeded.
pub fn process_file<B: InferenceBackend>(
    input_path: &Path,
    output_dir: &Path,
    embedder: &Embedder<B>,
    options: &ProcessOptions,
    multi_progress: &MultiProgress,
) -> Result<ProcessResult> {
    let start_time = Instant::now();

    info!("Processing: {}", input_path.display());

    let samples = embedder.load_waveform(input_path)?;
    let sample_rate = embedder.features().sample_rate;
    #[allow(clippy::cast_precision_loss)]
    let audio_duration_secs = samples.len() as f32 / sample_rate as f32;
    debug!(
        "Decoded {} of audio ({} samples)",
        progress::format_duration(audio_duration_secs),
        samples.len()
    );

    let features = embedder.features_from_samples(&samples, sample_rate)?;
    let segment_count = features.len_of(Axis(0));
    let chunk_count = embedder.chunker().chunk_count(segment_count);

    let file_name = input_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");
    let segment_progress =
        progress::create_segment_progress(segment_count, file_name, options.progress)
            .map(|pb| multi_progress.add(pb));

    let result = embedder.embed_features(&features, segment_progress.as_ref());
    if let Some(pb) = &segment_progress {
        multi_progress.remove(pb);
    }
    progress::finish_progress(segment_progress, "Embedded");
    let embeddings = result?;

    let metadata = EmbeddingMetadata {
        source: input_path.to_path_buf(),
        model: embedder.client().model().to_string(),
        audio_duration_secs,
        settings: EmbeddingSettings::new(embedder.features(), embedder.chunker().chunk_size()),
    };

    std::fs::create_dir_all(output_dir).map_err(|source| Error::OutputDirCreateFailed {
        path: output_dir.to_path_buf(),
        source,
    })?;
    for format in &options.formats {
        write_output(input_path, output_dir, *format, &metadata, &embeddings)?;
    }

    let duration_secs = start_time.elapsed().as_secs_f64();
    let realtime_factor = if duration_secs > 0.0 {
        f64::from(audio_duration_secs) / duration_secs
    } else {
        0.0
    };
    info!(
        "Embedded {} segments ({} chunk(s), dim {}) in {:.2}s ({:.1}x realtime)",
        segment_count,
        chunk_count,
        embeddings.ncols(),
        duration_secs,
        realtime_factor
    );

    Ok(ProcessResult {
        segments: segment_count,
        embedding_dim: embeddings.ncols(),
        chunks: chunk_count,
        duration_secs,
        audio_duration_secs,
    })
}

/// Write embeddings to an output file.
fn write_output(
    input_path: &Path,
    output_dir: &Path,
    format: OutputFormat,
    metadata: &EmbeddingMetadata,
    embeddings: &Array2<f32>,
) -> Result<()> {
    let output_path = output_path_for(input_path, output_dir, format);
    debug!("Writing {} output: {}", format, output_path.display());

    let mut writer: Box<dyn OutputWriter> = match format {
        OutputFormat::Json => Box::new(JsonEmbeddingWriter::new(&output_path)),
        OutputFormat::Csv => Box::new(CsvWriter::new(&output_path)?),
    };

    writer.write_header(metadata, embeddings.ncols())?;
    for segment in segments(embeddings, &metadata.settings) {
        writer.write_segment(&segment)?;
    }
    writer.finalize()
}
