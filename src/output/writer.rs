//! Output writer trait definition.

use crate::error::{Error, Result};
use crate::output::{EmbeddingMetadata, SegmentEmbedding};
use std::path::Path;

/// Trait for writing embedding results.
pub trait OutputWriter {
    /// Write the file header (if applicable).
    fn write_header(&mut self, metadata: &EmbeddingMetadata, embedding_dim: usize) -> Result<()>;

    /// Write a single segment embedding.
    fn write_segment(&mut self, segment: &SegmentEmbedding<'_>) -> Result<()>;

    /// Finalize the output (flush, close, etc.).
    fn finalize(&mut self) -> Result<()>;
}

/// Wrap a writer failure with the output path.
pub(crate) fn write_error(
    path: &Path,
    source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> Error {
    Error::OutputWrite {
        path: path.to_path_buf(),
        source: source.into(),
    }
}
