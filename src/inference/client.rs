//! Per-chunk embedding requests.

use super::protocol::InferRequest;
use super::tensor::InferTensor;
use super::{InferenceBackend, InferenceError};
use crate::config::ServerConfig;
use crate::constants::server::{INPUT_NAME, OUTPUT_NAME};
use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView3, Axis, Ix2};
use tracing::trace;

/// Sends feature chunks to the embedding model and returns embedding batches.
///
/// Requests carry a fixed identifier. That is sound only because chunks
/// are sent one after another; responses never need to be told apart.
#[derive(Debug)]
pub struct EmbeddingClient<B> {
    backend: B,
    model: String,
    request_id: String,
}

impl<B: InferenceBackend> EmbeddingClient<B> {
    /// Wrap `backend` with the model name and request id from `server`.
    pub fn new(backend: B, server: &ServerConfig) -> Self {
        Self {
            backend,
            model: server.model.clone(),
            request_id: server.request_id.clone(),
        }
    }

    /// Model this client targets.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The wrapped backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Embed one chunk of feature tensors.
    ///
    /// Returns `(chunk_len, embedding_dim)`, one row per input tensor in
    /// input order. Any failure is reported as
    /// [`Error::InferenceFailure`] carrying `chunk_index`.
    pub fn embed_chunk(&self, chunk_index: usize, chunk: ArrayView3<'_, f32>) -> Result<Array2<f32>> {
        self.request(chunk)
            .map_err(|source| Error::InferenceFailure {
                chunk_index,
                source,
            })
    }

    fn request(&self, chunk: ArrayView3<'_, f32>) -> std::result::Result<Array2<f32>, InferenceError> {
        let batch = chunk.len_of(Axis(0));
        let request = InferRequest::single(
            &self.request_id,
            InferTensor::from_array(INPUT_NAME, chunk),
            OUTPUT_NAME,
        );
        trace!("Requesting {} embeddings from '{}'", batch, self.model);

        let mut response = self.backend.infer(&self.model, &request)?;
        let output = response.take_output(OUTPUT_NAME)?.into_array::<f32>()?;

        let shape = output.shape().to_vec();
        let embeddings = output
            .into_dimensionality::<Ix2>()
            .map_err(|_| InferenceError::ShapeMismatch {
                name: OUTPUT_NAME.to_string(),
                reason: format!("expected (batch, embedding_dim), got {shape:?}"),
            })?;

        if embeddings.nrows() != batch {
            return Err(InferenceError::ShapeMismatch {
                name: OUTPUT_NAME.to_string(),
                reason: format!(
                    "{} embeddings returned for {} inputs",
                    embeddings.nrows(),
                    batch
                ),
            });
        }

        Ok(embeddings)
    }
}
