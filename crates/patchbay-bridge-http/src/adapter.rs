//! The HTTP bridge adapter: outbound `POST /batch`, inbound `GET /poll`,
//! optional `GET /health`.

use async_trait::async_trait;
use patchbay_bridge::{BridgeAdapter, PollResult};
use patchbay_core::{ContactChange, ExternalInput};
use patchbay_driver::DriverError;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::config::HttpBridgeConfig;
use crate::error::HttpBridgeError;

#[derive(Debug, Deserialize)]
struct PollResponseBody {
    #[serde(default)]
    inputs: Vec<ExternalInput>,
    #[serde(default)]
    next_sequence_id: Option<String>,
}

/// Relays contact changes to, and polls external input from, an HTTP peer.
///
/// This is the worked example of [`patchbay_bridge::BridgeAdapter`]: the
/// peer implements three endpoints under the adapter's configured base URL:
///
/// - `POST /batch` — body is a JSON array of changes; any 2xx is success.
/// - `GET /poll` — `X-Last-Sequence-Id` carries the adapter's cursor if it
///   has one; `X-Long-Poll-Timeout` tells the peer how long it may hold the
///   request open. Response body is `{"inputs": [...], "next_sequence_id": "..."}`.
/// - `GET /health` — optional; used by [`HttpBridgeAdapter::health_check`]
///   rather than by the generic framework.
pub struct HttpBridgeAdapter {
    client: Client,
    config: HttpBridgeConfig,
}

impl HttpBridgeAdapter {
    /// Build an adapter from `config`, constructing its own [`reqwest::Client`].
    ///
    /// # Errors
    /// Returns an error if the underlying TLS backend fails to initialize.
    pub fn new(config: HttpBridgeConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client, config })
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Call the peer's optional `GET /health` endpoint.
    ///
    /// # Errors
    /// Returns an error if the request fails or the peer responds with a
    /// non-2xx status.
    pub async fn health_check(&self) -> Result<(), HttpBridgeError> {
        let url = format!("{}/health", self.config.base_url);
        let response = self.authorize(self.client.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(())
    }
}

async fn status_error(response: reqwest::Response) -> HttpBridgeError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    HttpBridgeError::Status { status, body }
}

#[async_trait]
impl BridgeAdapter for HttpBridgeAdapter {
    async fn send_batch(&self, changes: &[ContactChange]) -> Result<(), DriverError> {
        let url = format!("{}/batch", self.config.base_url);
        let response = self
            .authorize(self.client.post(&url))
            .json(changes)
            .send()
            .await
            .map_err(HttpBridgeError::from)?;

        if !response.status().is_success() {
            return Err(status_error(response).await.into());
        }

        debug!(count = changes.len(), "sent batch to http bridge peer");
        Ok(())
    }

    async fn poll(&self, last_sequence_id: Option<&str>) -> Result<PollResult, DriverError> {
        let url = format!("{}/poll", self.config.base_url);
        let mut request = self
            .authorize(self.client.get(&url))
            .header(
                "X-Long-Poll-Timeout",
                self.config.long_poll_timeout.as_secs().to_string(),
            );
        if let Some(cursor) = last_sequence_id {
            request = request.header("X-Last-Sequence-Id", cursor);
        }

        let response = request.send().await.map_err(HttpBridgeError::from)?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(PollResult::default());
        }
        if !response.status().is_success() {
            return Err(status_error(response).await.into());
        }

        let body: PollResponseBody = response
            .json()
            .await
            .map_err(|e| HttpBridgeError::Malformed(e.to_string()))?;

        Ok(PollResult {
            inputs: body.inputs,
            next_sequence_id: body.next_sequence_id,
        })
    }
}
