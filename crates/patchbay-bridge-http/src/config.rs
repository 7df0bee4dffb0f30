//! Configuration for the HTTP bridge adapter.

use std::time::Duration;

/// Settings for one [`crate::HttpBridgeAdapter`] instance.
#[derive(Debug, Clone)]
pub struct HttpBridgeConfig {
    /// Base URL of the external system, e.g. `https://example.com/patchbay`.
    /// `/batch`, `/poll`, and `/health` are appended to this.
    pub base_url: String,
    /// Bearer token sent as `Authorization: Bearer <token>`, if set.
    pub bearer_token: Option<String>,
    /// Per-request timeout for `POST /batch` and `GET /health`.
    pub request_timeout: Duration,
    /// Value sent as `X-Long-Poll-Timeout` on `GET /poll`, telling the peer
    /// how long it may hold the connection open waiting for new input.
    pub long_poll_timeout: Duration,
}

impl HttpBridgeConfig {
    /// A config pointed at `base_url` with otherwise sane defaults.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            bearer_token: None,
            request_timeout: Duration::from_secs(10),
            long_poll_timeout: Duration::from_secs(25),
        }
    }

    /// Set the bearer token used for authentication.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}
