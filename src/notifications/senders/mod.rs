use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub mod webhook;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Invalid hook URL '{0}'")]
    InvalidHook(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// Delivers a rendered notification body to a hook.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Sends `body` as JSON to `hook` and returns the HTTP status code the hook answered with.
    async fn send(&self, hook: &str, body: &Map<String, Value>) -> Result<u16, SenderError>;
}
