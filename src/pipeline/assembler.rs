//! Reassembly of per-chunk embedding batches.

use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView2, Axis, concatenate};

/// Concatenate embedding batches along the row axis, in chunk order.
///
/// An empty slice yields a `(0, 0)` array. Every batch must share the
/// embedding dimension of the first.
pub fn assemble(batches: &[Array2<f32>]) -> Result<Array2<f32>> {
    let Some(first) = batches.first() else {
        return Ok(Array2::zeros((0, 0)));
    };

    let expected = first.ncols();
    if let Some((chunk_index, batch)) = batches
        .iter()
        .enumerate()
        .find(|(_, b)| b.ncols() != expected)
    {
        return Err(Error::EmbeddingDimMismatch {
            chunk_index,
            expected,
            actual: batch.ncols(),
        });
    }

    let views: Vec<ArrayView2<'_, f32>> = batches.iter().map(|b| b.view()).collect();
    concatenate(Axis(0), &views).map_err(|e| Error::Internal {
        message: format!("failed to concatenate embeddings: {e}"),
    })
}
