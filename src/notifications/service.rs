use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use super::models::{BarkKind, BarkStatus};
use super::senders::{NotificationSender, SenderError};
use super::template::{self, TemplateError};
use crate::db::entities::watchdog_entry;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Template error: {0}")]
    TemplateError(#[from] TemplateError),
    #[error("Delivery failed: {0}")]
    DeliveryFailed(#[from] SenderError),
}

/// Renders a watchdog's dead/alive message and hands it to the sender.
///
/// Failures never escape this type: they are logged and recorded as
/// [`BarkStatus::Failed`] so the caller can keep evaluating other entries.
pub struct NotificationService {
    sender: Arc<dyn NotificationSender>,
}

impl NotificationService {
    pub fn new(sender: Arc<dyn NotificationSender>) -> Self {
        Self { sender }
    }

    pub async fn dead(&self, entry: &watchdog_entry::Model) -> BarkStatus {
        self.bark(BarkKind::Dead, entry).await
    }

    pub async fn alive(&self, entry: &watchdog_entry::Model) -> BarkStatus {
        self.bark(BarkKind::Alive, entry).await
    }

    pub async fn bark(&self, kind: BarkKind, entry: &watchdog_entry::Model) -> BarkStatus {
        match self.send_notification(kind, entry).await {
            Ok(status_code) => {
                info!(entry_id = %entry.id, name = %entry.name, kind = %kind, status_code, "Hooked watchdog.");
                BarkStatus::Delivered { status_code }
            }
            Err(e) => {
                error!(entry_id = %entry.id, name = %entry.name, kind = %kind, error = %e, "Failed to notify hook.");
                BarkStatus::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn send_notification(
        &self,
        kind: BarkKind,
        entry: &watchdog_entry::Model,
    ) -> Result<u16, NotificationError> {
        let custom = match kind {
            BarkKind::Dead => entry.template_dead.as_ref(),
            BarkKind::Alive => entry.template_alive.as_ref(),
        };
        let templates = custom.cloned().unwrap_or_else(|| kind.default_template());

        let body = template::render_map(&templates, &entry.template_fields())?;
        let status_code = self.sender.send(&entry.hook, &body).await?;
        Ok(status_code)
    }
}
