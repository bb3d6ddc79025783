//! Registry of active alerts and their channel message counters

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::models::{Alert, AlertHandle, AlertRequest};

use super::delivery::MessageDelivery;
use super::report::Report;
use super::scheduler::{DeadlineScheduler, Finalizer};

/// Everything guarded by the registry lock.
///
/// Counters are pooled per channel: every alert watching a channel sees the
/// same counts, and the first alert on that channel to finalize or cancel
/// clears them for the others.
#[derive(Default)]
struct State {
    /// requester id -> active alert
    alerts: HashMap<String, Alert>,
    /// channel id -> requesters watching it
    watchers: HashMap<String, HashSet<String>>,
    /// channel id -> sender id -> message count
    counters: HashMap<String, HashMap<String, u64>>,
}

impl State {
    /// Remove the requester's alert together with its channel's counters
    fn take(&mut self, requester_id: &str) -> Option<(Alert, HashMap<String, u64>)> {
        let alert = self.alerts.remove(requester_id)?;
        self.unwatch(&alert.channel_id, requester_id);
        let counts = self.counters.remove(&alert.channel_id).unwrap_or_default();
        Some((alert, counts))
    }

    fn unwatch(&mut self, channel_id: &str, requester_id: &str) {
        if let Some(requesters) = self.watchers.get_mut(channel_id) {
            requesters.remove(requester_id);
            if requesters.is_empty() {
                self.watchers.remove(channel_id);
            }
        }
    }
}

/// In-memory registry of activity alerts
pub struct AlertRegistry {
    state: Mutex<State>,
    window: Duration,
    scheduler: DeadlineScheduler,
    delivery: Arc<dyn MessageDelivery>,
}

impl AlertRegistry {
    /// Create a registry whose alerts run for `window`
    pub fn new(window: Duration, scheduler: DeadlineScheduler, delivery: Arc<dyn MessageDelivery>) -> Self {
        Self {
            state: Mutex::new(State::default()),
            window,
            scheduler,
            delivery,
        }
    }

    /// Tracking window of every alert
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Start tracking a channel for the requester.
    ///
    /// An existing alert for the same requester is superseded; its deadline
    /// stays queued but no longer matches and fires as a no-op. The channel's
    /// counters are reset.
    pub fn create(&self, request: AlertRequest) -> AlertHandle {
        let alert = Alert::start(request, self.window);
        let handle = alert.handle();

        {
            let mut state = self.state.lock();

            if let Some(previous) = state.alerts.remove(&alert.requester_id) {
                state.unwatch(&previous.channel_id, &previous.requester_id);
                if previous.channel_id != alert.channel_id && !state.watchers.contains_key(&previous.channel_id) {
                    state.counters.remove(&previous.channel_id);
                }
                debug!(
                    requester_id = %previous.requester_id,
                    alert_id = %previous.id,
                    "Superseding active alert"
                );
            }

            state
                .watchers
                .entry(alert.channel_id.clone())
                .or_default()
                .insert(alert.requester_id.clone());
            state.counters.insert(alert.channel_id.clone(), HashMap::new());

            self.scheduler.schedule(&alert.requester_id, alert.id, alert.deadline);
            state.alerts.insert(alert.requester_id.clone(), alert);
        }

        info!(
            requester_id = %handle.requester_id,
            channel_id = %handle.channel_id,
            alert_id = %handle.alert_id,
            window = %humantime::format_duration(handle.window),
            "Alert created"
        );

        handle
    }

    /// Count one message from `sender_id` in `channel_id`.
    ///
    /// Returns false, touching nothing, when no alert watches the channel.
    pub fn record_message(&self, channel_id: &str, sender_id: &str) -> bool {
        let mut state = self.state.lock();

        if !state.watchers.contains_key(channel_id) {
            return false;
        }

        let counts = state.counters.entry(channel_id.to_string()).or_default();
        let count = counts.entry(sender_id.to_string()).or_insert(0);
        *count += 1;

        debug!(
            channel_id = %channel_id,
            sender_id = %sender_id,
            count = *count,
            "Tracked message"
        );
        true
    }

    /// Consume the alert and deliver its report to the requester.
    ///
    /// A no-op returning `None` unless the requester's live alert is
    /// `alert_id`, which makes stale deadlines (after a cancel or a
    /// superseding create) and repeated calls harmless. Delivery happens after
    /// the lock is released; a failed delivery is logged and the alert stays
    /// consumed.
    pub async fn finalize(&self, requester_id: &str, alert_id: Uuid) -> Option<Report> {
        let (alert, counts) = {
            let mut state = self.state.lock();
            let live = state
                .alerts
                .get(requester_id)
                .is_some_and(|alert| alert.id == alert_id);
            if !live {
                debug!(requester_id = %requester_id, alert_id = %alert_id, "Stale deadline ignored");
                return None;
            }
            state.take(requester_id)?
        };

        let report = Report::from_counts(alert.channel_name, alert.window, alert.note, counts);

        match self.delivery.deliver(&alert.requester_id, &report.to_string()).await {
            Ok(()) => info!(
                requester_id = %alert.requester_id,
                alert_id = %alert.id,
                messages = report.total_messages,
                users = report.total_users,
                "Report sent"
            ),
            Err(e) => error!(
                requester_id = %alert.requester_id,
                alert_id = %alert.id,
                error = %e,
                "Failed to send report"
            ),
        }

        Some(report)
    }

    /// Drop the requester's alert and its channel's counters.
    ///
    /// Returns whether anything was removed; cancelling twice is fine.
    pub fn cancel(&self, requester_id: &str) -> bool {
        let removed = self.state.lock().take(requester_id);

        match removed {
            Some((alert, _)) => {
                info!(requester_id = %requester_id, alert_id = %alert.id, "Alert cancelled");
                true
            }
            None => false,
        }
    }

    /// Copy of every active alert
    pub fn list_active(&self) -> Vec<Alert> {
        self.state.lock().alerts.values().cloned().collect()
    }

    /// Copy of the requester's active alerts
    pub fn alerts_for(&self, requester_id: &str) -> Vec<Alert> {
        self.state.lock().alerts.get(requester_id).cloned().into_iter().collect()
    }

    /// Number of active alerts
    pub fn active_count(&self) -> usize {
        self.state.lock().alerts.len()
    }

    /// Copy of a channel's counters, if it has any
    pub fn channel_counts(&self, channel_id: &str) -> Option<HashMap<String, u64>> {
        self.state.lock().counters.get(channel_id).cloned()
    }

    /// Deadlines the scheduler still holds
    pub fn pending_deadlines(&self) -> usize {
        self.scheduler.pending()
    }
}

#[async_trait]
impl Finalizer for AlertRegistry {
    async fn finalize_due(&self, requester_id: &str, alert_id: Uuid) {
        self.finalize(requester_id, alert_id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerting::delivery::testing::RecordingDelivery;
    use crate::alerting::scheduler::DeadlineDispatcher;
    use proptest::prelude::*;
    use tokio::sync::watch;

    const WINDOW: Duration = Duration::from_secs(300);

    fn registry() -> (Arc<AlertRegistry>, Arc<RecordingDelivery>, DeadlineDispatcher) {
        let delivery = Arc::new(RecordingDelivery::default());
        let (scheduler, dispatcher) = DeadlineScheduler::new();
        let registry = Arc::new(AlertRegistry::new(WINDOW, scheduler, delivery.clone()));
        (registry, delivery, dispatcher)
    }

    fn running_registry() -> (Arc<AlertRegistry>, Arc<RecordingDelivery>, watch::Sender<bool>) {
        let (registry, delivery, dispatcher) = registry();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(dispatcher.run(registry.clone(), shutdown_rx));
        (registry, delivery, shutdown_tx)
    }

    #[tokio::test]
    async fn test_counts_messages_for_watched_channel() {
        let (registry, _, _dispatcher) = registry();
        registry.create(AlertRequest::new("U1", "C1"));

        for _ in 0..3 {
            assert!(registry.record_message("C1", "U2"));
        }
        assert!(registry.record_message("C1", "U3"));

        let counts = registry.channel_counts("C1").unwrap();
        assert_eq!(counts.get("U2"), Some(&3));
        assert_eq!(counts.get("U3"), Some(&1));
    }

    #[tokio::test]
    async fn test_unwatched_channel_untouched() {
        let (registry, _, _dispatcher) = registry();
        registry.create(AlertRequest::new("U1", "C1"));

        assert!(!registry.record_message("C2", "U2"));
        assert_eq!(registry.channel_counts("C2"), None);
    }

    #[tokio::test]
    async fn test_finalize_delivers_sorted_report() {
        let (registry, delivery, _dispatcher) = registry();
        let handle = registry.create(AlertRequest::new("U1", "C1").with_channel_name("general"));

        for (sender, n) in [("alice", 3), ("bob", 5), ("carol", 5)] {
            for _ in 0..n {
                registry.record_message("C1", sender);
            }
        }

        let report = registry.finalize("U1", handle.alert_id).await.unwrap();
        assert_eq!(report.total_messages, 13);

        let sent = delivery.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "U1");
        let text = &sent[0].1;
        assert!(text.starts_with("5m Activity Report for #general"));
        let bob = text.find("bob").unwrap();
        let carol = text.find("carol").unwrap();
        let alice = text.find("alice").unwrap();
        assert!(bob < carol && carol < alice);
        assert!(text.ends_with("Total: 13 messages from 3 users"));

        assert_eq!(registry.active_count(), 0);
        assert_eq!(registry.channel_counts("C1"), None);
    }

    #[tokio::test]
    async fn test_finalize_is_idempotent() {
        let (registry, delivery, _dispatcher) = registry();
        let handle = registry.create(AlertRequest::new("U1", "C1"));

        assert!(registry.finalize("U1", handle.alert_id).await.is_some());
        assert!(registry.finalize("U1", handle.alert_id).await.is_none());
        assert_eq!(delivery.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_then_finalize_sends_nothing() {
        let (registry, delivery, _dispatcher) = registry();
        let handle = registry.create(AlertRequest::new("U1", "C1"));
        registry.record_message("C1", "U2");

        assert!(registry.cancel("U1"));
        assert!(!registry.cancel("U1"));
        assert_eq!(registry.channel_counts("C1"), None);

        assert!(registry.finalize("U1", handle.alert_id).await.is_none());
        assert!(delivery.sent().is_empty());
    }

    #[tokio::test]
    async fn test_failed_delivery_still_consumes_alert() {
        let delivery = Arc::new(RecordingDelivery::failing());
        let (scheduler, _dispatcher) = DeadlineScheduler::new();
        let registry = AlertRegistry::new(WINDOW, scheduler, delivery.clone());

        let handle = registry.create(AlertRequest::new("U1", "C1"));
        assert!(registry.finalize("U1", handle.alert_id).await.is_some());

        assert_eq!(registry.active_count(), 0);
        assert!(registry.finalize("U1", handle.alert_id).await.is_none());
        assert_eq!(delivery.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_superseding_on_other_channel_drops_old_counters() {
        let (registry, _, _dispatcher) = registry();
        registry.create(AlertRequest::new("U1", "C1"));
        registry.record_message("C1", "U2");

        registry.create(AlertRequest::new("U1", "C2"));

        assert_eq!(registry.active_count(), 1);
        assert!(!registry.record_message("C1", "U2"));
        assert_eq!(registry.channel_counts("C1"), None);
        assert_eq!(registry.alerts_for("U1")[0].channel_id, "C2");
    }

    #[tokio::test]
    async fn test_alerts_on_same_channel_share_counters() {
        let (registry, delivery, _dispatcher) = registry();
        let first = registry.create(AlertRequest::new("U1", "C1"));
        let second = registry.create(AlertRequest::new("U2", "C1"));

        registry.record_message("C1", "U3");
        registry.record_message("C1", "U3");

        let report = registry.finalize("U1", first.alert_id).await.unwrap();
        assert_eq!(report.total_messages, 2);

        // The first finalize cleared the pooled counters
        let report = registry.finalize("U2", second.alert_id).await.unwrap();
        assert!(report.is_empty());
        assert_eq!(delivery.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_list_active_is_a_snapshot() {
        let (registry, _, _dispatcher) = registry();
        registry.create(AlertRequest::new("U1", "C1"));
        registry.create(AlertRequest::new("U2", "C2"));

        let snapshot = registry.list_active();
        registry.cancel("U1");

        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.list_active().len(), 1);
        assert!(registry.alerts_for("U1").is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_recording_loses_nothing() {
        let (registry, _, _dispatcher) = registry();
        registry.create(AlertRequest::new("U1", "C1"));

        let tasks: Vec<_> = (0..8)
            .map(|worker| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    for _ in 0..250 {
                        registry.record_message("C1", &format!("S{}", worker % 4));
                    }
                })
            })
            .collect();
        futures::future::join_all(tasks).await;

        let counts = registry.channel_counts("C1").unwrap();
        assert_eq!(counts.len(), 4);
        assert!(counts.values().all(|&c| c == 500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_excludes_later_messages() {
        let (registry, delivery, _shutdown) = running_registry();
        registry.create(AlertRequest::new("u1", "c1").with_requester_name("Alice"));

        for _ in 0..3 {
            registry.record_message("c1", "u2");
        }

        tokio::time::sleep(WINDOW + Duration::from_secs(1)).await;

        for _ in 0..2 {
            assert!(!registry.record_message("c1", "u2"));
        }

        let sent = delivery.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("• u2: 3 messages"));
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_deadline_is_a_noop() {
        let (registry, delivery, _shutdown) = running_registry();
        registry.create(AlertRequest::new("U1", "C1"));

        tokio::time::sleep(Duration::from_secs(100)).await;
        let second = registry.create(AlertRequest::new("U1", "C1"));
        registry.record_message("C1", "U2");

        // First deadline passes: nothing delivered, second alert still live
        tokio::time::sleep(Duration::from_secs(201)).await;
        assert!(delivery.sent().is_empty());
        assert_eq!(registry.alerts_for("U1")[0].id, second.alert_id);

        tokio::time::sleep(Duration::from_secs(100)).await;
        let sent = delivery.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("U2: 1 message"));
        assert_eq!(registry.pending_deadlines(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_alert_deadline_delivers_nothing() {
        let (registry, delivery, _shutdown) = running_registry();
        registry.create(AlertRequest::new("U1", "C1"));
        registry.record_message("C1", "U2");
        assert!(registry.cancel("U1"));

        tokio::time::sleep(WINDOW * 2).await;

        assert!(delivery.sent().is_empty());
        assert_eq!(registry.pending_deadlines(), 0);
    }

    proptest! {
        #[test]
        fn prop_counts_match_recorded_messages(
            events in proptest::collection::vec((0usize..3, 0usize..5), 0..200)
        ) {
            let (registry, _, _dispatcher) = registry();
            registry.create(AlertRequest::new("U0", "C0"));
            registry.create(AlertRequest::new("U1", "C1"));

            let mut expected: HashMap<(String, String), u64> = HashMap::new();
            for (channel, sender) in &events {
                let channel = format!("C{channel}");
                let sender = format!("S{sender}");
                let counted = registry.record_message(&channel, &sender);
                // C2 has no alert
                prop_assert_eq!(counted, channel != "C2");
                if counted {
                    *expected.entry((channel, sender)).or_insert(0) += 1;
                }
            }

            prop_assert_eq!(registry.channel_counts("C2"), None);
            for channel in ["C0", "C1"] {
                let counts = registry.channel_counts(channel).unwrap();
                let expected_senders = expected.keys().filter(|(c, _)| c == channel).count();
                prop_assert_eq!(counts.len(), expected_senders);
                for (sender, count) in counts {
                    prop_assert_eq!(Some(&count), expected.get(&(channel.to_string(), sender)));
                }
            }
        }
    }
}
