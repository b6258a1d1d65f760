//! Error types for converge-remote.

use thiserror::Error;

/// All errors a remote call can produce.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The addressed object does not exist (HTTP 404).
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// The remote answered with a non-success status.
    #[error("remote returned status {code}: {message}")]
    Status { code: u16, message: String },

    /// The request never produced a response (DNS, TLS, connection reset, …).
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("cannot decode response: {0}")]
    Decode(String),

    /// A listing page whose pagination metadata would not terminate.
    #[error("malformed page {page}: {reason}")]
    MalformedPage { page: u32, reason: String },

    /// The collection has no primitive for the requested operation.
    #[error("{operation} is not supported for {collection}")]
    Unsupported {
        collection: &'static str,
        operation: &'static str,
    },
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound { .. })
    }
}

impl From<ureq::Error> for RemoteError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(404, response) => RemoteError::NotFound {
                resource: response.get_url().to_owned(),
            },
            ureq::Error::Status(code, response) => RemoteError::Status {
                code,
                message: response
                    .into_string()
                    .unwrap_or_else(|e| format!("<unreadable body: {e}>")),
            },
            ureq::Error::Transport(t) => RemoteError::Transport(t.to_string()),
        }
    }
}
