//! KServe v2 (Triton) HTTP request and response bodies.
//!
//! Requests go out either as plain JSON or with the binary tensor data
//! extension, where a JSON header is followed by the raw input bytes.

use super::InferenceError;
use super::tensor::{DataType, InferTensor, TensorData};
use serde::{Deserialize, Serialize};

/// Header giving the length of the JSON part of a binary request body.
pub const INFERENCE_HEADER_CONTENT_LENGTH: &str = "Inference-Header-Content-Length";

/// An inference request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferRequest {
    /// Request identifier echoed back by the server.
    pub id: String,
    /// Input tensors.
    pub inputs: Vec<InferTensor>,
    /// Outputs to return.
    pub outputs: Vec<RequestedOutput>,
}

/// One requested output tensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedOutput {
    /// Output name as declared by the model.
    pub name: String,
}

impl InferRequest {
    /// Request with a single input tensor and a single requested output.
    pub fn single(id: &str, input: InferTensor, output: &str) -> Self {
        Self {
            id: id.to_string(),
            inputs: vec![input],
            outputs: vec![RequestedOutput {
                name: output.to_string(),
            }],
        }
    }

    /// Encode as a binary tensor data body.
    ///
    /// Outputs are still requested as JSON.
    pub fn to_binary(&self) -> Result<BinaryBody, InferenceError> {
        let header = BinaryHeader {
            id: &self.id,
            inputs: self
                .inputs
                .iter()
                .map(|t| BinaryInput {
                    name: &t.name,
                    shape: &t.shape,
                    datatype: t.datatype,
                    parameters: BinaryInputParameters {
                        binary_data_size: t.data.byte_len(),
                    },
                })
                .collect(),
            outputs: self
                .outputs
                .iter()
                .map(|o| BinaryOutput {
                    name: &o.name,
                    parameters: BinaryOutputParameters { binary_data: false },
                })
                .collect(),
        };

        let mut body = serde_json::to_vec(&header).map_err(|e| InferenceError::Protocol {
            reason: format!("failed to encode request header: {e}"),
        })?;
        let header_len = body.len();
        for input in &self.inputs {
            input.data.write_le_bytes(&mut body);
        }

        Ok(BinaryBody { header_len, body })
    }
}

/// A request body using the binary tensor data extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryBody {
    /// Length in bytes of the leading JSON header.
    pub header_len: usize,
    /// JSON header followed by each input's raw little-endian bytes.
    pub body: Vec<u8>,
}

#[derive(Serialize)]
struct BinaryHeader<'a> {
    id: &'a str,
    inputs: Vec<BinaryInput<'a>>,
    outputs: Vec<BinaryOutput<'a>>,
}

#[derive(Serialize)]
struct BinaryInput<'a> {
    name: &'a str,
    shape: &'a [usize],
    datatype: DataType,
    parameters: BinaryInputParameters,
}

#[derive(Serialize)]
struct BinaryInputParameters {
    binary_data_size: usize,
}

#[derive(Serialize)]
struct BinaryOutput<'a> {
    name: &'a str,
    parameters: BinaryOutputParameters,
}

#[derive(Serialize)]
struct BinaryOutputParameters {
    binary_data: bool,
}

/// A decoded inference response.
#[derive(Debug, Clone, PartialEq)]
pub struct InferResponse {
    /// Model that served the request.
    pub model_name: String,
    /// Model version, if reported.
    pub model_version: Option<String>,
    /// Echoed request identifier, if any.
    pub id: Option<String>,
    /// Output tensors.
    pub outputs: Vec<InferTensor>,
}

impl InferResponse {
    /// Remove and return the output tensor named `name`.
    pub fn take_output(&mut self, name: &str) -> Result<InferTensor, InferenceError> {
        let index = self
            .outputs
            .iter()
            .position(|t| t.name == name)
            .ok_or_else(|| InferenceError::MissingOutput {
                name: name.to_string(),
            })?;
        Ok(self.outputs.swap_remove(index))
    }

    /// Parse a JSON response body.
    pub fn from_json(body: &[u8]) -> Result<Self, InferenceError> {
        let raw: RawResponse = serde_json::from_slice(body).map_err(|e| InferenceError::Protocol {
            reason: format!("malformed inference response: {e}"),
        })?;

        let outputs = raw
            .outputs
            .into_iter()
            .map(RawTensor::decode)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            model_name: raw.model_name,
            model_version: raw.model_version,
            id: raw.id,
            outputs,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    model_name: String,
    #[serde(default)]
    model_version: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    outputs: Vec<RawTensor>,
}

/// Output tensor before its datatype tag has been checked.
#[derive(Debug, Deserialize)]
struct RawTensor {
    name: String,
    datatype: String,
    shape: Vec<usize>,
    data: serde_json::Value,
}

impl RawTensor {
    fn decode(self) -> Result<InferTensor, InferenceError> {
        let datatype: DataType = self.datatype.parse()?;
        let data = TensorData::from_json(datatype, self.data).map_err(|e| {
            InferenceError::Protocol {
                reason: format!("output '{}' data is not {datatype}: {e}", self.name),
            }
        })?;

        Ok(InferTensor {
            name: self.name,
            shape: self.shape,
            datatype,
            data,
        })
    }
}

/// Error body returned with non-success status codes.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub(crate) error: String,
}

/// Model metadata from `GET /v2/models/{model}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model name.
    pub name: String,
    /// Available versions.
    #[serde(default)]
    pub versions: Vec<String>,
    /// Serving platform (e.g. `onnxruntime_onnx`).
    #[serde(default)]
    pub platform: String,
    /// Declared inputs.
    #[serde(default)]
    pub inputs: Vec<TensorMetadata>,
    /// Declared outputs.
    #[serde(default)]
    pub outputs: Vec<TensorMetadata>,
}

/// Declared tensor signature. `-1` marks a variable dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorMetadata {
    /// Tensor name.
    pub name: String,
    /// Datatype tag as reported by the server.
    pub datatype: String,
    /// Declared shape.
    pub shape: Vec<i64>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::cast_precision_loss)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_request_wire_format() {
        let chunk = Array3::<f32>::zeros((2, 3, 4));
        let request = InferRequest::single(
            "1",
            InferTensor::from_array("input", chunk.view()),
            "output",
        );
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["id"], "1");
        assert_eq!(json["inputs"][0]["name"], "input");
        assert_eq!(json["inputs"][0]["datatype"], "FP32");
        assert_eq!(json["inputs"][0]["shape"], serde_json::json!([2, 3, 4]));
        assert_eq!(json["inputs"][0]["data"].as_array().unwrap().len(), 24);
        assert_eq!(json["outputs"], serde_json::json!([{"name": "output"}]));
    }

    #[test]
    fn test_binary_body_carries_raw_tensor() {
        let chunk = Array3::from_shape_fn((2, 3, 4), |(a, b, c)| (a * 12 + b * 4 + c) as f32 * 0.5);
        let request = InferRequest::single(
            "1",
            InferTensor::from_array("input", chunk.view()),
            "output",
        );

        let BinaryBody { header_len, body } = request.to_binary().unwrap();

        let header: serde_json::Value = serde_json::from_slice(&body[..header_len]).unwrap();
        assert_eq!(header["id"], "1");
        assert_eq!(header["inputs"][0]["name"], "input");
        assert_eq!(header["inputs"][0]["datatype"], "FP32");
        assert_eq!(header["inputs"][0]["shape"], serde_json::json!([2, 3, 4]));
        assert_eq!(header["inputs"][0]["parameters"]["binary_data_size"], 96);
        assert!(header["inputs"][0].get("data").is_none());
        assert_eq!(
            header["outputs"],
            serde_json::json!([{"name": "output", "parameters": {"binary_data": false}}])
        );

        let raw = &body[header_len..];
        assert_eq!(raw.len(), 96);
        let values: Vec<f32> = raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        assert_eq!(values, chunk.iter().copied().collect::<Vec<_>>());
    }

    #[test]
    fn test_full_chunk_binary_body_is_compact() {
        let chunk = Array3::<f32>::from_elem((1024, 256, 32), -11.512_925);
        let request = InferRequest::single(
            "1",
            InferTensor::from_array("input", chunk.view()),
            "output",
        );

        let binary = request.to_binary().unwrap();

        assert_eq!(binary.body.len() - binary.header_len, 1024 * 256 * 32 * 4);
        assert!(binary.body.len() < 64_000_000);
    }

    #[test]
    fn test_parse_response() {
        let body = br#"{
            "model_name": "neuralfp",
            "model_version": "1",
            "id": "1",
            "outputs": [
                {"name": "output", "datatype": "FP32", "shape": [2, 2], "data": [0.5, 1.0, 1.5, 2.0]}
            ]
        }"#;

        let mut response = InferResponse::from_json(body).unwrap();
        assert_eq!(response.model_name, "neuralfp");
        assert_eq!(response.model_version.as_deref(), Some("1"));

        let output = response.take_output("output").unwrap();
        assert_eq!(output.shape, vec![2, 2]);
        assert_eq!(output.data, TensorData::F32(vec![0.5, 1.0, 1.5, 2.0]));
    }

    #[test]
    fn test_missing_output_is_reported() {
        let body = br#"{"model_name": "neuralfp", "outputs": []}"#;
        let mut response = InferResponse::from_json(body).unwrap();
        assert!(matches!(
            response.take_output("output"),
            Err(InferenceError::MissingOutput { .. })
        ));
    }

    #[test]
    fn test_unsupported_output_datatype() {
        let body = br#"{"model_name": "m", "outputs": [
            {"name": "output", "datatype": "FP16", "shape": [1], "data": [0.0]}
        ]}"#;
        assert!(matches!(
            InferResponse::from_json(body),
            Err(InferenceError::UnsupportedDatatype { .. })
        ));
    }

    #[test]
    fn test_malformed_body_is_protocol_error() {
        assert!(matches!(
            InferResponse::from_json(b"<html>bad gateway</html>"),
            Err(InferenceError::Protocol { .. })
        ));
    }

    #[test]
    fn test_parse_model_metadata() {
        let body = r#"{
            "name": "neuralfp",
            "versions": ["1"],
            "platform": "onnxruntime_onnx",
            "inputs": [{"name": "input", "datatype": "FP32", "shape": [-1, 256, 32]}],
            "outputs": [{"name": "output", "datatype": "FP32", "shape": [-1, 128]}]
        }"#;
        let metadata: ModelMetadata = serde_json::from_str(body).unwrap();
        assert_eq!(metadata.inputs[0].shape, vec![-1, 256, 32]);
        assert_eq!(metadata.outputs[0].name, "output");
    }
}
