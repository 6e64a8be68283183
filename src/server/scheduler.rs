use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::alerting::evaluation_service::EvaluationService;

/// Runs evaluation passes on a fixed period, at most one at a time.
pub struct Scheduler {
    evaluation_service: Arc<EvaluationService>,
    period: Duration,
    in_flight: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(evaluation_service: Arc<EvaluationService>, period: Duration) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            evaluation_service,
            period,
            in_flight: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            handle: Mutex::new(None),
        }
    }

    /// Spawns the tick loop. Calling it again while running does nothing.
    pub async fn start(self: Arc<Self>) {
        let mut handle = self.handle.lock().await;
        if handle.is_some() {
            return;
        }
        let _ = self.shutdown_tx.send(false);

        let scheduler = self.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        *handle = Some(tokio::spawn(async move {
            info!(interval_seconds = scheduler.period.as_secs(), "Watchdog scheduler started.");
            let mut ticker = interval(scheduler.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        scheduler.trigger();
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
            info!("Watchdog scheduler stopped.");
        }));
    }

    /// Stops the tick loop. A pass already running is left to finish on its own.
    pub async fn stop(&self) {
        let handle = self.handle.lock().await.take();
        if let Some(handle) = handle {
            let _ = self.shutdown_tx.send(true);
            let _ = handle.await;
        }
    }

    pub fn is_evaluating(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Starts an evaluation pass in the background unless one is already
    /// running. Returns whether a pass was started.
    pub fn trigger(&self) -> bool {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Previous evaluation pass still running, skipping this tick.");
            return false;
        }

        let service = self.evaluation_service.clone();
        let guard = InFlightGuard(self.in_flight.clone());
        tokio::spawn(async move {
            let _guard = guard;
            debug!("Running watchdog evaluation pass...");
            service.run_evaluation_cycle().await;
        });
        true
    }
}

/// Clears the in-flight flag when the pass ends, even if it panicked.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::EntryStore;
    use crate::db::entities::watchdog_entry::{Definition, Model};
    use crate::notifications::senders::{NotificationSender, SenderError};
    use crate::notifications::service::NotificationService;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::{Map, Value, json};
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    /// Blocks every send until released.
    struct GatedSender {
        calls: AtomicUsize,
        gate: Notify,
    }

    #[async_trait]
    impl NotificationSender for GatedSender {
        async fn send(&self, _hook: &str, _body: &Map<String, Value>) -> Result<u16, SenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok(200)
        }
    }

    async fn scheduler_with_overdue_entry(
        period: Duration,
    ) -> (Arc<Scheduler>, Arc<GatedSender>, Arc<EntryStore>) {
        let store = Arc::new(EntryStore::new());
        let definition: Definition =
            serde_json::from_value(json!({"name": "a", "interval": 1, "hook": "http://h"})).unwrap();
        let (mut entry, _) = Model::from_definition("a", definition);
        entry.last_checkin_time = Some(Utc::now() - chrono::Duration::minutes(10));
        store.set("dog", "a", entry).await;

        let sender = Arc::new(GatedSender {
            calls: AtomicUsize::new(0),
            gate: Notify::new(),
        });
        let notifications = Arc::new(NotificationService::new(sender.clone()));
        let evaluation = Arc::new(EvaluationService::new(store.clone(), notifications, "dog"));
        (Arc::new(Scheduler::new(evaluation, period)), sender, store)
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_trigger_is_a_noop_while_a_pass_is_running() {
        let (scheduler, sender, store) = scheduler_with_overdue_entry(Duration::from_secs(60)).await;

        assert!(scheduler.trigger());
        wait_until(|| sender.calls.load(Ordering::SeqCst) == 1).await;
        assert!(scheduler.is_evaluating());
        assert!(!scheduler.trigger());

        sender.gate.notify_one();
        wait_until(|| !scheduler.is_evaluating()).await;
        assert!(!store.get("dog", "a").await.unwrap().alive);
        assert!(scheduler.trigger());
    }

    #[tokio::test]
    async fn test_start_runs_a_pass_and_stop_ends_the_loop() {
        let (scheduler, sender, _) = scheduler_with_overdue_entry(Duration::from_millis(20)).await;

        scheduler.clone().start().await;
        wait_until(|| sender.calls.load(Ordering::SeqCst) == 1).await;

        // Ticks keep firing while the first pass is blocked, none of them start a new pass.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sender.calls.load(Ordering::SeqCst), 1);

        sender.gate.notify_one();
        scheduler.stop().await;
        assert!(scheduler.handle.lock().await.is_none());
    }
}
