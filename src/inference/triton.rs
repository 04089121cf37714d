//! HTTP backend for Triton-compatible (KServe v2) inference servers.

use super::protocol::{
    ErrorBody, INFERENCE_HEADER_CONTENT_LENGTH, InferRequest, InferResponse, ModelMetadata,
};
use super::{InferenceBackend, InferenceError};
use crate::config::ServerConfig;
use crate::error::{Error, Result};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{debug, trace};

/// Blocking client for a KServe v2 HTTP endpoint.
///
/// Holds one pooled HTTP client for its whole lifetime and drives it on a
/// private current-thread runtime, so every call returns only after the
/// server has answered. Inputs are sent with the binary tensor data
/// extension unless [`TritonClient::with_binary_data`] turns it off.
pub struct TritonClient {
    base_url: String,
    binary_data: bool,
    http: reqwest::Client,
    runtime: Runtime,
}

impl std::fmt::Debug for TritonClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TritonClient")
            .field("base_url", &self.base_url)
            .field("binary_data", &self.binary_data)
            .finish_non_exhaustive()
    }
}

impl TritonClient {
    /// Create a client for `url` (`host:port` or a full URL).
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::ClientBuild {
                reason: e.to_string(),
            })?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::ClientBuild {
                reason: format!("failed to create async runtime: {e}"),
            })?;

        let base_url = normalize_base_url(url);
        debug!("Inference server: {}", base_url);

        Ok(Self {
            base_url,
            binary_data: true,
            http,
            runtime,
        })
    }

    /// Create a client from server configuration.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        Ok(Self::new(&config.url, Duration::from_secs(config.timeout_secs))?
            .with_binary_data(config.binary_data))
    }

    /// Choose between raw binary inputs and JSON number arrays.
    #[must_use]
    pub const fn with_binary_data(mut self, enabled: bool) -> Self {
        self.binary_data = enabled;
        self
    }

    /// Normalized base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the server reports itself ready.
    pub fn server_ready(&self) -> std::result::Result<bool, InferenceError> {
        self.probe(&format!("{}/v2/health/ready", self.base_url))
    }

    /// Whether `model` is loaded and ready.
    pub fn model_ready(&self, model: &str) -> std::result::Result<bool, InferenceError> {
        self.probe(&format!("{}/v2/models/{model}/ready", self.base_url))
    }

    /// Fetch the declared signature of `model`.
    pub fn model_metadata(&self, model: &str) -> std::result::Result<ModelMetadata, InferenceError> {
        let url = format!("{}/v2/models/{model}", self.base_url);
        let body = self.runtime.block_on(async {
            let response = self.http.get(&url).send().await?;
            read_success_body(response).await
        })?;

        serde_json::from_slice(&body).map_err(|e| InferenceError::Protocol {
            reason: format!("malformed model metadata: {e}"),
        })
    }

    fn probe(&self, url: &str) -> std::result::Result<bool, InferenceError> {
        self.runtime.block_on(async {
            let response = self.http.get(url).send().await?;
            Ok::<_, InferenceError>(response.status().is_success())
        })
    }
}

impl InferenceBackend for TritonClient {
    fn infer(
        &self,
        model: &str,
        request: &InferRequest,
    ) -> std::result::Result<InferResponse, InferenceError> {
        let url = format!("{}/v2/models/{model}/infer", self.base_url);
        let builder = self.http.post(&url);
        let builder = if self.binary_data {
            let binary = request.to_binary()?;
            trace!(
                "POST {} ({} byte header, {} bytes total)",
                url,
                binary.header_len,
                binary.body.len()
            );
            builder
                .header(CONTENT_TYPE, "application/octet-stream")
                .header(INFERENCE_HEADER_CONTENT_LENGTH, binary.header_len.to_string())
                .body(binary.body)
        } else {
            let payload = serde_json::to_vec(request).map_err(|e| InferenceError::Protocol {
                reason: format!("failed to encode request: {e}"),
            })?;
            trace!("POST {} ({} bytes)", url, payload.len());
            builder
                .header(CONTENT_TYPE, "application/json")
                .body(payload)
        };

        let (body, header_len) = self.runtime.block_on(async {
            let response = builder.send().await?;
            let header_len = response
                .headers()
                .get(INFERENCE_HEADER_CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<usize>().ok());
            let body = read_success_body(response).await?;
            Ok::<_, InferenceError>((body, header_len))
        })?;

        // Any binary output data follows the JSON part.
        let json = header_len.map_or(&body[..], |n| &body[..n.min(body.len())]);
        InferResponse::from_json(json)
    }
}

/// Return the body of a 2xx response, or the server's error message.
async fn read_success_body(
    response: reqwest::Response,
) -> std::result::Result<Vec<u8>, InferenceError> {
    let status = response.status();
    let body = response.bytes().await?;

    if status.is_success() {
        return Ok(body.to_vec());
    }

    let message = serde_json::from_slice::<ErrorBody>(&body).map_or_else(
        |_| String::from_utf8_lossy(&body).trim().to_string(),
        |e| e.error,
    );
    Err(InferenceError::Server {
        status: status.as_u16(),
        message,
    })
}

/// Add `http://` when no scheme is given and drop trailing slashes.
fn normalize_base_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::cast_precision_loss)]
mod tests {
    use super::*;
    use crate::inference::InferTensor;
    use ndarray::Array3;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::thread::JoinHandle;

    const RESPONSE: &str = r#"{"model_name":"neuralfp","model_version":"1","id":"1","outputs":[{"name":"output","datatype":"FP32","shape":[2,2],"data":[1.0,2.0,3.0,4.0]}]}"#;

    /// Answer one HTTP request on loopback and hand back its head and body.
    fn serve_once() -> (String, JoinHandle<(String, Vec<u8>)>) {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let handle = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut head = String::new();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line.is_empty() || line == "\r\n" {
                    break;
                }
                head.push_str(&line);
            }

            let length = header_value(&head, "content-length")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(0);
            let mut body = vec![0_u8; length];
            reader.read_exact(&mut body).unwrap();

            let mut stream = reader.into_inner();
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                RESPONSE.len(),
                RESPONSE
            )
            .unwrap();
            stream.flush().unwrap();
            (head, body)
        });

        (addr, handle)
    }

    fn header_value(head: &str, name: &str) -> Option<String> {
        head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    }

    fn counting_request() -> InferRequest {
        let chunk = Array3::from_shape_fn((2, 3, 4), |(a, b, c)| (a * 12 + b * 4 + c) as f32);
        InferRequest::single("1", InferTensor::from_array("input", chunk.view()), "output")
    }

    #[test]
    fn test_infer_sends_raw_tensor_bytes() {
        let (addr, server) = serve_once();
        let client = TritonClient::new(&addr, Duration::from_secs(5)).unwrap();

        let mut response = client.infer("neuralfp", &counting_request()).unwrap();
        let (head, body) = server.join().unwrap();

        assert!(head.starts_with("POST /v2/models/neuralfp/infer "));
        assert_eq!(
            header_value(&head, "content-type").as_deref(),
            Some("application/octet-stream")
        );
        let header_len: usize = header_value(&head, INFERENCE_HEADER_CONTENT_LENGTH)
            .unwrap()
            .parse()
            .unwrap();

        let header: serde_json::Value = serde_json::from_slice(&body[..header_len]).unwrap();
        assert_eq!(header["inputs"][0]["shape"], serde_json::json!([2, 3, 4]));
        assert_eq!(header["inputs"][0]["parameters"]["binary_data_size"], 96);

        let raw: Vec<f32> = body[header_len..]
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        assert_eq!(raw, (0..24).map(|v| v as f32).collect::<Vec<_>>());

        assert_eq!(response.take_output("output").unwrap().shape, vec![2, 2]);
    }

    #[test]
    fn test_json_requests_when_binary_disabled() {
        let (addr, server) = serve_once();
        let client = TritonClient::new(&addr, Duration::from_secs(5))
            .unwrap()
            .with_binary_data(false);

        client.infer("neuralfp", &counting_request()).unwrap();
        let (head, body) = server.join().unwrap();

        assert!(header_value(&head, INFERENCE_HEADER_CONTENT_LENGTH).is_none());
        assert_eq!(
            header_value(&head, "content-type").as_deref(),
            Some("application/json")
        );
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["inputs"][0]["data"].as_array().unwrap().len(), 24);
    }

    #[test]
    fn test_from_config_honors_binary_setting() {
        let config = ServerConfig {
            binary_data: false,
            ..ServerConfig::default()
        };
        let client = TritonClient::from_config(&config).unwrap();
        assert!(!client.binary_data);
    }

    #[test]
    fn test_normalize_host_port() {
        assert_eq!(normalize_base_url("localhost:8000"), "http://localhost:8000");
    }

    #[test]
    fn test_normalize_keeps_scheme_and_strips_slash() {
        assert_eq!(
            normalize_base_url(" https://triton.example.com/ "),
            "https://triton.example.com"
        );
    }

    #[test]
    fn test_client_builds_from_default_config() {
        let client = TritonClient::from_config(&ServerConfig::default()).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_unreachable_server_is_transport_error() {
        // Port 1 on loopback is never served in test environments.
        let client = TritonClient::new("127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let request = InferRequest::single(
            "1",
            InferTensor::from_array(
                "input",
                ndarray::Array3::<f32>::zeros((1, 2, 2)).view(),
            ),
            "output",
        );
        assert!(matches!(
            client.infer("neuralfp", &request),
            Err(InferenceError::Transport(_))
        ));
    }
}
