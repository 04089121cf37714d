//! Remote embedding inference.
//!
//! [`InferenceBackend`] is the seam between the pipeline and the server:
//! [`TritonClient`] speaks the KServe v2 HTTP protocol, tests substitute
//! an in-process mock. [`EmbeddingClient`] turns one feature chunk into
//! one request and validates the returned embedding batch.

mod client;
mod protocol;
mod tensor;
mod triton;

pub use client::EmbeddingClient;
pub use protocol::{
    BinaryBody, INFERENCE_HEADER_CONTENT_LENGTH, InferRequest, InferResponse, ModelMetadata,
    RequestedOutput, TensorMetadata,
};
pub use tensor::{DataType, Element, InferTensor, TensorData};
pub use triton::TritonClient;

/// Errors raised while talking to the inference server.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    /// Connection, timeout, or other HTTP transport failure.
    #[error("transport error")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body.
        message: String,
    },

    /// The response could not be understood.
    #[error("protocol error: {reason}")]
    Protocol {
        /// Description of the problem.
        reason: String,
    },

    /// The response lacks the requested output tensor.
    #[error("response has no output tensor named '{name}'")]
    MissingOutput {
        /// Expected output name.
        name: String,
    },

    /// A datatype tag with no supported element type.
    #[error("unsupported tensor datatype '{datatype}'")]
    UnsupportedDatatype {
        /// Tag as received.
        datatype: String,
    },

    /// A tensor holds a different element type than requested.
    #[error("tensor '{name}' has datatype {actual}, expected {expected}")]
    DatatypeMismatch {
        /// Tensor name.
        name: String,
        /// Requested datatype.
        expected: DataType,
        /// Actual datatype.
        actual: DataType,
    },

    /// A tensor's shape is inconsistent with its data or the request.
    #[error("tensor '{name}' has unexpected shape: {reason}")]
    ShapeMismatch {
        /// Tensor name.
        name: String,
        /// Description of the mismatch.
        reason: String,
    },
}

/// A synchronous inference endpoint.
///
/// Each call blocks until the response arrives or fails.
pub trait InferenceBackend {
    /// Run `request` against `model`.
    fn infer(&self, model: &str, request: &InferRequest) -> Result<InferResponse, InferenceError>;
}

impl<B: InferenceBackend + ?Sized> InferenceBackend for &B {
    fn infer(&self, model: &str, request: &InferRequest) -> Result<InferResponse, InferenceError> {
        (**self).infer(model, request)
    }
}

impl<B: InferenceBackend + ?Sized> InferenceBackend for Box<B> {
    fn infer(&self, model: &str, request: &InferRequest) -> Result<InferResponse, InferenceError> {
        (**self).infer(model, request)
    }
}
