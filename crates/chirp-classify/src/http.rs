//! HTTP classification backend.

use std::time::Duration;

use async_trait::async_trait;
use chirp_core::AudioClip;
use serde::Deserialize;
use tracing::debug;

use crate::{ClassifyError, Classifier, Result};

const PREDICT_PATH: &str = "/predict";

/// Bounds every submission so none is left pending indefinitely.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the remote classification service.
///
/// The contract is fixed: `POST {base_url}/predict` with a multipart body
/// carrying one part named `file`, answered with `200 OK` and a JSON body
/// whose optional `prediction` field holds the label.
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    prediction: Option<String>,
}

impl HttpClassifier {
    /// Create a client for the given base URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), PREDICT_PATH),
        })
    }

    /// The resolved prediction endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, clip: &AudioClip) -> Result<Option<String>> {
        debug!(
            endpoint = %self.endpoint,
            clip = clip.name(),
            mime = clip.mime(),
            audio_bytes = clip.len(),
            "Sending classification request"
        );

        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(clip.data().to_vec())
                .file_name(clip.name().to_string())
                .mime_str(clip.mime())
                .map_err(|e| ClassifyError::InvalidPayload(e.to_string()))?,
        );

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifyError::ApiError(format!(
                "service returned {}: {}",
                status, body
            )));
        }

        let predict: PredictResponse = response
            .json()
            .await
            .map_err(|e| ClassifyError::MalformedResponse(e.to_string()))?;

        Ok(predict.prediction)
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    use super::*;

    /// Serve exactly one canned HTTP response on a local port, consuming
    /// the whole request first so the client never sees a reset mid-send.
    fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 4096];
            let mut header_end = None;
            let mut content_length = 0usize;
            loop {
                let n = stream.read(&mut chunk).unwrap_or(0);
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
                if header_end.is_none() {
                    if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                        header_end = Some(pos + 4);
                        let headers = String::from_utf8_lossy(&request[..pos]);
                        content_length = headers
                            .lines()
                            .filter_map(|line| line.split_once(':'))
                            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                            .and_then(|(_, value)| value.trim().parse().ok())
                            .unwrap_or(0);
                    }
                }
                if let Some(end) = header_end {
                    if request.len() >= end + content_length {
                        break;
                    }
                }
            }
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
        });
        format!("http://{}", addr)
    }

    fn clip() -> AudioClip {
        AudioClip::new("clip.mp3", "audio/mpeg", vec![1, 2, 3, 4])
    }

    fn block_on<F: Future>(future: F) -> F::Output {
        tokio::runtime::Runtime::new().unwrap().block_on(future)
    }

    #[test]
    fn test_endpoint_building() {
        let classifier = HttpClassifier::new("http://127.0.0.1:8000").unwrap();
        assert_eq!(classifier.endpoint(), "http://127.0.0.1:8000/predict");

        let classifier = HttpClassifier::new("http://127.0.0.1:8000/").unwrap();
        assert_eq!(classifier.endpoint(), "http://127.0.0.1:8000/predict");
    }

    #[test]
    fn test_label_from_prediction_field() {
        let base = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 25\r\nConnection: close\r\n\r\n{\"prediction\":\"dog_bark\"}",
        );
        let classifier = HttpClassifier::new(&base).unwrap();
        let label = block_on(classifier.classify(&clip())).unwrap();
        assert_eq!(label.as_deref(), Some("dog_bark"));
    }

    #[test]
    fn test_missing_prediction_field_is_not_an_error() {
        let base = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}",
        );
        let classifier = HttpClassifier::new(&base).unwrap();
        let label = block_on(classifier.classify(&clip())).unwrap();
        assert_eq!(label, None);
    }

    #[test]
    fn test_server_error_status() {
        let base = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        let classifier = HttpClassifier::new(&base).unwrap();
        let err = block_on(classifier.classify(&clip())).unwrap_err();
        assert!(matches!(err, ClassifyError::ApiError(_)), "got {err:?}");
    }

    #[test]
    fn test_malformed_body() {
        let base = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 9\r\nConnection: close\r\n\r\nnot json!",
        );
        let classifier = HttpClassifier::new(&base).unwrap();
        let err = block_on(classifier.classify(&clip())).unwrap_err();
        assert!(
            matches!(err, ClassifyError::MalformedResponse(_)),
            "got {err:?}"
        );
    }

    #[test]
    fn test_unreachable_host() {
        // Bind and immediately drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let classifier = HttpClassifier::new(&format!("http://{}", addr)).unwrap();
        let err = block_on(classifier.classify(&clip())).unwrap_err();
        assert!(matches!(err, ClassifyError::NetworkError(_)), "got {err:?}");
    }
}
