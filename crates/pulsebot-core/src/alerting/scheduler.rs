//! One-shot deadline scheduling for alert reports
//!
//! A single dispatcher task owns a min-heap of deadlines and sleeps until the
//! earliest one. Deadlines are never cancelled: whatever they fire into must
//! treat a stale deadline as a no-op.

use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Receives fired deadlines
#[async_trait]
pub trait Finalizer: Send + Sync + 'static {
    /// Called once at or after the deadline of `(requester_id, alert_id)`
    async fn finalize_due(&self, requester_id: &str, alert_id: Uuid);
}

/// A pending report deadline
#[derive(Debug, Clone)]
pub struct Deadline {
    /// When to fire
    pub fire_at: Instant,
    /// Requester whose alert is due
    pub requester_id: String,
    /// Generation of the alert the deadline was scheduled for
    pub alert_id: Uuid,
}

impl Eq for Deadline {}

impl PartialEq for Deadline {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.alert_id == other.alert_id
    }
}

impl Ord for Deadline {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the BinaryHeap pops the earliest deadline first
        other
            .fire_at
            .cmp(&self.fire_at)
            .then_with(|| other.alert_id.cmp(&self.alert_id))
    }
}

impl PartialOrd for Deadline {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Cloneable handle used to queue deadlines
#[derive(Clone)]
pub struct DeadlineScheduler {
    tx: mpsc::UnboundedSender<Deadline>,
    pending: Arc<AtomicUsize>,
}

impl DeadlineScheduler {
    /// Create a scheduler handle and the dispatcher that serves it.
    ///
    /// Nothing fires until [`DeadlineDispatcher::run`] is spawned.
    pub fn new() -> (Self, DeadlineDispatcher) {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));

        let scheduler = Self {
            tx,
            pending: pending.clone(),
        };
        let dispatcher = DeadlineDispatcher { rx, pending };

        (scheduler, dispatcher)
    }

    /// Queue a finalize for `(requester_id, alert_id)` at `fire_at`.
    ///
    /// Returns false if the dispatcher has shut down.
    pub fn schedule(&self, requester_id: &str, alert_id: Uuid, fire_at: Instant) -> bool {
        let deadline = Deadline {
            fire_at,
            requester_id: requester_id.to_string(),
            alert_id,
        };

        self.pending.fetch_add(1, AtomicOrdering::SeqCst);
        if self.tx.send(deadline).is_err() {
            self.pending.fetch_sub(1, AtomicOrdering::SeqCst);
            warn!(requester_id = %requester_id, alert_id = %alert_id, "Deadline dispatcher is gone, deadline dropped");
            return false;
        }
        true
    }

    /// Deadlines queued but not fired yet, stale ones included
    pub fn pending(&self) -> usize {
        self.pending.load(AtomicOrdering::SeqCst)
    }
}

/// Owns the deadline heap and fires due entries
pub struct DeadlineDispatcher {
    rx: mpsc::UnboundedReceiver<Deadline>,
    pending: Arc<AtomicUsize>,
}

impl DeadlineDispatcher {
    /// Run until `shutdown` flips to true (or its sender drops), or until every
    /// scheduler handle is gone and no deadline is left.
    pub async fn run<F: Finalizer>(mut self, finalizer: Arc<F>, mut shutdown: watch::Receiver<bool>) {
        info!("Deadline dispatcher started");

        let mut heap: BinaryHeap<Deadline> = BinaryHeap::new();
        let mut open = true;

        loop {
            let now = Instant::now();
            while heap.peek().is_some_and(|d| d.fire_at <= now) {
                let Some(due) = heap.pop() else { break };
                self.pending.fetch_sub(1, AtomicOrdering::SeqCst);

                debug!(requester_id = %due.requester_id, alert_id = %due.alert_id, "Deadline fired");

                // Each finalize runs on its own task so a slow delivery
                // cannot hold up later deadlines.
                let finalizer = finalizer.clone();
                tokio::spawn(async move {
                    finalizer.finalize_due(&due.requester_id, due.alert_id).await;
                });
            }

            if !open && heap.is_empty() {
                break;
            }

            let next = heap.peek().map(|d| d.fire_at);

            tokio::select! {
                received = self.rx.recv(), if open => match received {
                    Some(deadline) => heap.push(deadline),
                    None => open = false,
                },
                () = sleep_until_next(next) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(abandoned = heap.len(), "Deadline dispatcher stopped");
    }
}

async fn sleep_until_next(next: Option<Instant>) {
    match next {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
