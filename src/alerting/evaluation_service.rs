use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::db::EntryStore;
use crate::db::entities::watchdog_entry;
use crate::notifications::models::BarkKind;
use crate::notifications::service::NotificationService;

/// What a single evaluation pass changed and which entries are now dead.
#[derive(Debug, Default)]
pub struct EvaluationReport {
    pub overdue: BTreeMap<String, watchdog_entry::Model>,
    pub died: usize,
    pub revived: usize,
}

/// Derives liveness from check-in age and notifies on every transition.
///
/// This is the only writer of `alive`. The state persists between passes, so a
/// watchdog that stays overdue is only reported once.
pub struct EvaluationService {
    store: Arc<EntryStore>,
    notification_service: Arc<NotificationService>,
    namespace: String,
}

impl EvaluationService {
    pub fn new(
        store: Arc<EntryStore>,
        notification_service: Arc<NotificationService>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            store,
            notification_service,
            namespace: namespace.into(),
        }
    }

    pub async fn run_evaluation_cycle(&self) -> EvaluationReport {
        self.run_evaluation_cycle_at(Utc::now()).await
    }

    pub async fn run_evaluation_cycle_at(&self, now: DateTime<Utc>) -> EvaluationReport {
        let entries = self.store.snapshot(&self.namespace).await;
        debug!(count = entries.len(), namespace = %self.namespace, "Evaluating watchdogs...");

        let mut report = EvaluationReport::default();
        for (id, entry) in entries {
            let current = match transition_for(&entry, now) {
                Some(kind) => match self.apply_transition(kind, &entry).await {
                    Some(updated) => {
                        match kind {
                            BarkKind::Dead => report.died += 1,
                            BarkKind::Alive => report.revived += 1,
                        }
                        updated
                    }
                    None => continue,
                },
                None => entry,
            };
            if !current.alive {
                report.overdue.insert(id, current);
            }
        }

        info!(
            dead = report.overdue.len(),
            died = report.died,
            revived = report.revived,
            "{} watchdogs are dead.",
            report.overdue.len()
        );
        report
    }

    /// Notifies, then records the new state. Only `alive` and `bark_status` are
    /// written so a check-in landing during the notification is kept.
    async fn apply_transition(
        &self,
        kind: BarkKind,
        entry: &watchdog_entry::Model,
    ) -> Option<watchdog_entry::Model> {
        let bark_status = match kind {
            BarkKind::Dead => self.notification_service.dead(entry).await,
            BarkKind::Alive => self.notification_service.alive(entry).await,
        };
        let alive = kind == BarkKind::Alive;

        match self
            .store
            .update(&self.namespace, &entry.id, |stored| {
                stored.alive = alive;
                stored.bark_status = Some(bark_status);
            })
            .await
        {
            Ok(updated) => Some(updated),
            Err(e) => {
                error!(entry_id = %entry.id, error = %e, "Failed to persist watchdog state.");
                None
            }
        }
    }
}

/// The transition an entry is due for, if any.
///
/// Entries that never checked in are not evaluated. An elapsed time exactly
/// equal to the interval never triggers anything.
pub fn transition_for(entry: &watchdog_entry::Model, now: DateTime<Utc>) -> Option<BarkKind> {
    let elapsed = entry.elapsed_minutes(now)?;
    if elapsed > entry.interval && entry.alive {
        Some(BarkKind::Dead)
    } else if elapsed < entry.interval && !entry.alive {
        Some(BarkKind::Alive)
    } else {
        None
    }
}
