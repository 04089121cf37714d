//! Splitting feature batches into inference-sized chunks.

use crate::error::{Error, Result};
use ndarray::{Array3, ArrayView3, Axis};

/// Positional splitter for feature tensors.
///
/// Chunk `i` covers tensors `[i * chunk_size, min((i + 1) * chunk_size, n))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
}

impl Chunker {
    /// Create a chunker. A `chunk_size` of zero is rejected.
    pub fn new(chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::ConfigValidation {
                message: "chunk_size must be at least 1".to_string(),
            });
        }
        Ok(Self { chunk_size })
    }

    /// Maximum number of tensors per chunk.
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of chunks needed for `n` tensors.
    pub const fn chunk_count(&self, n: usize) -> usize {
        n.div_ceil(self.chunk_size)
    }

    /// Split `features` along its first axis without copying.
    pub fn split<'a>(&self, features: &'a Array3<f32>) -> Vec<ArrayView3<'a, f32>> {
        features
            .axis_chunks_iter(Axis(0), self.chunk_size)
            .collect()
    }
}
