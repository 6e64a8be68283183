use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::db::entities::watchdog_entry;
use crate::db::{EntryStore, StoreError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckinError {
    #[error(transparent)]
    NotFound(#[from] StoreError),
    #[error("The body must not exceed {limit} bytes in length (got {size}).")]
    PayloadTooLarge { size: usize, limit: usize },
}

/// Records check-ins. Liveness transitions are left to the evaluation service.
pub struct CheckinService {
    store: Arc<EntryStore>,
    max_payload_bytes: usize,
}

impl CheckinService {
    pub fn new(store: Arc<EntryStore>, max_payload_bytes: usize) -> Self {
        Self {
            store,
            max_payload_bytes,
        }
    }

    pub fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
    }

    pub fn check_payload_size(&self, size: usize) -> Result<(), CheckinError> {
        if size > self.max_payload_bytes {
            return Err(CheckinError::PayloadTooLarge {
                size,
                limit: self.max_payload_bytes,
            });
        }
        Ok(())
    }

    pub async fn get(
        &self,
        namespace: &str,
        id: &str,
    ) -> Result<watchdog_entry::Model, CheckinError> {
        Ok(self.store.get(namespace, id).await?)
    }

    pub async fn checkin(
        &self,
        namespace: &str,
        id: &str,
        payload: Value,
    ) -> Result<watchdog_entry::Model, CheckinError> {
        self.checkin_at(namespace, id, payload, Utc::now()).await
    }

    pub async fn checkin_at(
        &self,
        namespace: &str,
        id: &str,
        payload: Value,
        now: DateTime<Utc>,
    ) -> Result<watchdog_entry::Model, CheckinError> {
        // Serializing a Value cannot fail.
        let size = serde_json::to_vec(&payload).map(|b| b.len()).unwrap_or(0);
        self.check_payload_size(size)?;

        let entry = self
            .store
            .update(namespace, id, |entry| {
                // Never move the clock backwards, even if the wall clock does.
                let checked_in_at = match entry.last_checkin_time {
                    Some(previous) if previous > now => previous,
                    _ => now,
                };
                entry.last_checkin_time = Some(checked_in_at);
                entry.last_checkin_payload = payload;
            })
            .await?;

        debug!(namespace = %namespace, entry_id = %id, "Checked in.");
        Ok(entry)
    }
}
