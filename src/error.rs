use std::time::Duration;
use thiserror::Error;

/// Non-recoverable configuration problems detected while booting. The widget
/// never renders when one of these is returned.
#[derive(Debug, Error)]
pub enum BootError {
    #[error("embedding script tag not found")]
    ScriptNotFound,
    #[error("missing required widget setting `{0}`")]
    ConfigMissing(&'static str),
    #[error("invalid api base `{value}`: {source}")]
    InvalidApiBase {
        value: String,
        #[source]
        source: url::ParseError,
    },
}

/// Failure of a single outbound request. Always recovered by the caller.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("response rejected: {0}")]
    Rejected(&'static str),
    #[error("could not build endpoint url: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage contents are not valid json: {0}")]
    Format(#[from] serde_json::Error),
}
