use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::warn;

use super::{NotificationSender, SenderError};

/// Posts notifications to a webhook URL as JSON.
pub struct WebhookSender {
    client: Client,
}

impl WebhookSender {
    /// Every request is bounded by `timeout`, so a hanging hook cannot stall an evaluation pass.
    pub fn new(timeout: Duration) -> Result<Self, SenderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl NotificationSender for WebhookSender {
    async fn send(&self, hook: &str, body: &Map<String, Value>) -> Result<u16, SenderError> {
        let url = Url::parse(hook).map_err(|_| SenderError::InvalidHook(hook.to_string()))?;

        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();

        if !status.is_success() {
            warn!(hook = %hook, status = %status, "Webhook answered with a non-success status.");
        }

        Ok(status.as_u16())
    }
}
