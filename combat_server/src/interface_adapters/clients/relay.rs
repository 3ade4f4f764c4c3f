use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::domain::errors::RelayError;
use crate::domain::events::RelayEvent;
use crate::domain::ports::RelayNotifier;

pub const RELAY_SECRET_HEADER: &str = "X-Secret-Key";

// Posts game events to an external relay (e.g. a chat bridge).
#[derive(Clone)]
pub struct HttpRelayClient {
    http: reqwest::Client,
    endpoint: String,
    secret: String,
}

impl HttpRelayClient {
    pub fn new(
        base_url: &str,
        secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/game_event", base_url.trim_end_matches('/')),
            secret: secret.into(),
        })
    }
}

#[async_trait]
impl RelayNotifier for HttpRelayClient {
    async fn notify(&self, event: RelayEvent) -> Result<(), RelayError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header(RELAY_SECRET_HEADER, &self.secret)
            .json(&event)
            .send()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RelayError::Upstream {
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

// Used when no relay is configured.
#[derive(Clone, Default)]
pub struct NoopRelay;

#[async_trait]
impl RelayNotifier for NoopRelay {
    async fn notify(&self, event: RelayEvent) -> Result<(), RelayError> {
        debug!(?event, "relay not configured; event skipped");
        Ok(())
    }
}
