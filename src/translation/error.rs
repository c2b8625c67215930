//! Backend-level translation errors

use thiserror::Error;

/// Why a backend could not produce a translation.
///
/// These never leave a backend's `translate`: they are logged and turned into
/// an absent result so the manager can move on to the next backend.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// Transport failure (DNS, connect, timeout, body read)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("request failed with status {0}")]
    Status(reqwest::StatusCode),

    /// The provider answered with an error code
    #[error("provider error {code}: {message}")]
    Provider { code: String, message: String },

    /// The response did not have the expected shape
    #[error("unexpected response: {0}")]
    Envelope(String),

    /// Local model inference failed
    #[error("model error: {0}")]
    Model(String),

    /// ONNX Runtime failure
    #[error("inference error: {0}")]
    Inference(#[from] ort::Error),
}

pub type TranslateResult<T> = std::result::Result<T, TranslateError>;
