use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::entities::watchdog_entry::TemplateMap;

/// The two transitions a watchdog can notify about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarkKind {
    Dead,
    Alive,
}

impl BarkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BarkKind::Dead => "dead",
            BarkKind::Alive => "alive",
        }
    }

    /// Body template used when an entry does not define its own.
    pub fn default_template(&self) -> TemplateMap {
        let message = match self {
            BarkKind::Dead => "I am probably dead. Could anyone check?",
            BarkKind::Alive => "Back to life! Thanks.",
        };
        TemplateMap::from([
            ("message".to_string(), message.to_string()),
            ("user".to_string(), "{name}".to_string()),
        ])
    }
}

impl fmt::Display for BarkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the most recent notification delivery, stored on the entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BarkStatus {
    /// The hook answered; any HTTP status counts, including errors.
    Delivered { status_code: u16 },
    /// Nothing reached the hook: the template could not be rendered or the
    /// request failed in transport.
    Failed { reason: String },
}

impl BarkStatus {
    pub fn is_delivered(&self) -> bool {
        matches!(self, BarkStatus::Delivered { .. })
    }
}

impl fmt::Display for BarkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BarkStatus::Delivered { status_code } => write!(f, "{status_code}"),
            BarkStatus::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}
