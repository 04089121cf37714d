//! JSON output format writers.

use crate::error::Result;
use crate::output::writer::write_error;
use crate::output::{EmbeddingMetadata, EmbeddingSettings, OutputWriter, SegmentEmbedding};
use chrono::{DateTime, Utc};
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// JSON embedding file structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonEmbeddingFile {
    /// Source audio file name.
    pub source_file: String,
    /// Time the embeddings were produced.
    pub created: DateTime<Utc>,
    /// Model that produced the embeddings.
    pub model: String,
    /// Settings of the run.
    pub settings: EmbeddingSettings,
    /// Decoded audio duration in seconds.
    pub audio_duration_seconds: f32,
    /// `[segments, embedding_dim]`.
    pub shape: [usize; 2],
    /// One entry per segment, in order.
    pub segments: Vec<JsonSegment>,
}

/// Single segment in JSON format.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonSegment {
    /// Segment index.
    pub index: usize,
    /// Start time in seconds.
    pub start_time: f32,
    /// End time in seconds.
    pub end_time: f32,
    /// Embedding vector.
    pub embedding: Vec<f32>,
}

/// Writer for JSON embedding files.
///
/// Segments are buffered and the document is written on [`finalize`].
///
/// [`finalize`]: OutputWriter::finalize
pub struct JsonEmbeddingWriter {
    output_path: PathBuf,
    metadata: Option<EmbeddingMetadata>,
    embedding_dim: usize,
    segments: Vec<JsonSegment>,
}

impl JsonEmbeddingWriter {
    /// Create a new JSON embedding writer.
    pub fn new(output_path: &Path) -> Self {
        Self {
            output_path: output_path.to_path_buf(),
            metadata: None,
            embedding_dim: 0,
            segments: Vec::new(),
        }
    }
}

impl OutputWriter for JsonEmbeddingWriter {
    fn write_header(&mut self, metadata: &EmbeddingMetadata, embedding_dim: usize) -> Result<()> {
        self.metadata = Some(metadata.clone());
        self.embedding_dim = embedding_dim;
        Ok(())
    }

    fn write_segment(&mut self, segment: &SegmentEmbedding<'_>) -> Result<()> {
        self.segments.push(JsonSegment {
            index: segment.index,
            start_time: segment.start_time,
            end_time: segment.end_time,
            embedding: segment.values.to_vec(),
        });
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        let Some(metadata) = self.metadata.take() else {
            return Err(write_error(
                &self.output_path,
                "finalize called before write_header",
            ));
        };

        let document = JsonEmbeddingFile {
            source_file: source_name(&metadata.source),
            created: Utc::now(),
            model: metadata.model,
            settings: metadata.settings,
            audio_duration_seconds: metadata.audio_duration_secs,
            shape: [self.segments.len(), self.embedding_dim],
            segments: std::mem::take(&mut self.segments),
        };

        write_json(&self.output_path, &document)
    }
}

/// JSON feature dump structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonFeatureFile {
    /// Source audio file name.
    pub source_file: String,
    /// Time the features were computed.
    pub created: DateTime<Utc>,
    /// Settings of the run.
    pub settings: EmbeddingSettings,
    /// `[segments, rows, cols]` of the feature batch.
    pub shape: Vec<usize>,
    /// Row-major flattened feature values.
    pub data: Vec<f32>,
}

/// Write a feature batch to `output_path` as JSON.
pub fn write_features_json(
    output_path: &Path,
    source: &Path,
    settings: &EmbeddingSettings,
    features: &Array3<f32>,
) -> Result<()> {
    let document = JsonFeatureFile {
        source_file: source_name(source),
        created: Utc::now(),
        settings: settings.clone(),
        shape: features.shape().to_vec(),
        data: features.iter().copied().collect(),
    };
    write_json(output_path, &document)
}

fn write_json<T: Serialize>(path: &Path, document: &T) -> Result<()> {
    let file = File::create(path).map_err(|e| write_error(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, document).map_err(|e| write_error(path, e))?;
    writer.flush().map_err(|e| write_error(path, e))
}

fn source_name(source: &Path) -> String {
    source.file_name().map_or_else(
        || source.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::config::FeatureConfig;
    use crate::output::segments;
    use ndarray::array;
    use tempfile::tempdir;

    fn metadata() -> EmbeddingMetadata {
        EmbeddingMetadata {
            source: PathBuf::from("/recordings/take1.wav"),
            model: "neuralfp".to_string(),
            audio_duration_secs: 1.5,
            settings: EmbeddingSettings::new(&FeatureConfig::default(), 1024),
        }
    }

    #[test]
    fn test_json_writer_basic() {
        let dir = tempdir().expect("create temp dir");
        let output_path = dir.path().join("take1.embeddings.json");
        let embeddings = array![[0.25_f32, -1.0, 2.0], [0.5, 0.0, -0.5]];
        let meta = metadata();

        let mut writer = JsonEmbeddingWriter::new(&output_path);
        writer.write_header(&meta, 3).expect("write header");
        for segment in segments(&embeddings, &meta.settings) {
            writer.write_segment(&segment).expect("write segment");
        }
        writer.finalize().expect("finalize");

        let content = std::fs::read_to_string(&output_path).expect("read file");
        let result: JsonEmbeddingFile = serde_json::from_str(&content).expect("parse JSON");

        assert_eq!(result.source_file, "take1.wav");
        assert_eq!(result.model, "neuralfp");
        assert_eq!(result.shape, [2, 3]);
        assert_eq!(result.segments[1].embedding, vec![0.5, 0.0, -0.5]);
        assert_eq!(result.segments[1].start_time, 0.5);
        assert_eq!(result.settings.n_mels, 256);
    }

    #[test]
    fn test_finalize_without_header_fails() {
        let dir = tempdir().expect("create temp dir");
        let mut writer = JsonEmbeddingWriter::new(&dir.path().join("x.json"));
        assert!(writer.finalize().is_err());
    }

    #[test]
    fn test_feature_dump_is_flat_row_major() {
        let dir = tempdir().expect("create temp dir");
        let output_path = dir.path().join("take1.features.json");
        let features = Array3::from_shape_vec((1, 2, 2), vec![1.0_f32, 2.0, 3.0, 4.0]).unwrap();

        write_features_json(
            &output_path,
            Path::new("take1.wav"),
            &metadata().settings,
            &features,
        )
        .unwrap();

        let content = std::fs::read_to_string(&output_path).unwrap();
        let result: JsonFeatureFile = serde_json::from_str(&content).unwrap();
        assert_eq!(result.shape, vec![1, 2, 2]);
        assert_eq!(result.data, vec![1.0, 2.0, 3.0, 4.0]);
    }
}
