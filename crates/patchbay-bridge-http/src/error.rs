//! HTTP-specific failure modes, surfaced to the generic framework as
//! [`DriverError`].

use patchbay_driver::DriverError;
use thiserror::Error;

/// Failures specific to talking HTTP to the bridge peer.
#[derive(Debug, Error)]
pub enum HttpBridgeError {
    /// The request could not be sent at all (DNS, TLS, connection refused).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The peer responded with a non-2xx status.
    #[error("peer returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated if large.
        body: String,
    },

    /// The response body did not parse as the expected JSON shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<HttpBridgeError> for DriverError {
    fn from(err: HttpBridgeError) -> Self {
        match &err {
            HttpBridgeError::Status { status, .. } if (500..600).contains(status) => {
                DriverError::transient(err.to_string())
            },
            HttpBridgeError::Transport(_) => DriverError::transient(err.to_string()),
            HttpBridgeError::Status { .. } | HttpBridgeError::Malformed(_) => {
                DriverError::fatal(err.to_string())
            },
        }
    }
}
