//! Classification backend library for chirp.
//!
//! This crate provides a trait-based abstraction over the remote
//! classification service, with an HTTP implementation speaking the
//! service's multipart contract.

mod http;

use async_trait::async_trait;
use chirp_core::AudioClip;
pub use http::HttpClassifier;
use thiserror::Error;

/// Errors that can occur during classification.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("service error: {0}")]
    ApiError(String),

    #[error("invalid audio payload: {0}")]
    InvalidPayload(String),

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Result type for classification operations.
pub type Result<T> = std::result::Result<T, ClassifyError>;

/// Trait for classification backends.
///
/// Implement this trait to add new backends (e.g. a local model, another
/// service shape, a test stub).
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Submit a clip and return the predicted label.
    ///
    /// `Ok(None)` means the service answered successfully but without a
    /// prediction field; the caller decides how to render that.
    async fn classify(&self, clip: &AudioClip) -> Result<Option<String>>;

    /// Returns the name of this classifier for logging/debugging.
    fn name(&self) -> &str;
}
