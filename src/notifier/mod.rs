//! Refresh notifications
//!
//! The notifier keeps a set of subscribers and, while at least one is
//! present, publishes a payload-free [`RefreshSignal`] on a fixed period.
//! Subscribers re-run whatever aggregations they care about on receipt.
//!
//! Delivery is fire-and-forget: each subscriber has a bounded queue and a
//! full queue simply misses that signal, so a slow consumer never delays the
//! timer or anyone else.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{watch, Notify};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

pub type SubscriberId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefreshCause {
    Periodic,
    ReportGenerated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSignal {
    pub timestamp: DateTime<Utc>,
    pub cause: RefreshCause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierState {
    /// No subscribers; the timer is parked.
    Idle,
    /// At least one subscriber; the timer is running.
    Broadcasting,
}

pub struct ChangeNotifier {
    subscribers: DashMap<SubscriberId, mpsc::Sender<RefreshSignal>>,
    next_id: AtomicU64,
    wake: Notify,
    interval: Duration,
    channel_capacity: usize,
    shutdown_tx: watch::Sender<bool>,
}

impl ChangeNotifier {
    pub fn new(interval: Duration, channel_capacity: usize) -> Arc<Self> {
        let (shutdown_tx, _) = watch::channel(false);

        Arc::new(Self {
            subscribers: DashMap::new(),
            next_id: AtomicU64::new(1),
            wake: Notify::new(),
            interval,
            channel_capacity: channel_capacity.max(1),
            shutdown_tx,
        })
    }

    pub fn state(&self) -> NotifierState {
        if self.subscribers.is_empty() {
            NotifierState::Idle
        } else {
            NotifierState::Broadcasting
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Register a subscriber. Dropping the returned handle unsubscribes.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.channel_capacity);

        let was_idle = self.subscribers.is_empty();
        self.subscribers.insert(id, tx);
        if was_idle {
            info!(subscriber = id, "first subscriber, broadcasting refresh signals");
        } else {
            debug!(subscriber = id, "subscriber added");
        }
        self.wake.notify_one();

        Subscription {
            id,
            receiver: rx,
            notifier: Arc::downgrade(self),
        }
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers.remove(&id).is_some();
        if removed {
            if self.subscribers.is_empty() {
                info!(subscriber = id, "last subscriber left, notifier idle");
            } else {
                debug!(subscriber = id, "subscriber removed");
            }
        }
        removed
    }

    /// Send a signal to every current subscriber without waiting on any of
    /// them. Returns how many queues accepted it.
    pub fn publish(&self, cause: RefreshCause) -> usize {
        let signal = RefreshSignal {
            timestamp: Utc::now(),
            cause,
        };

        let mut delivered = 0;
        let mut closed = Vec::new();

        for entry in self.subscribers.iter() {
            match entry.value().try_send(signal.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    debug!(subscriber = *entry.key(), "subscriber lagging, dropped refresh signal");
                }
                Err(TrySendError::Closed(_)) => closed.push(*entry.key()),
            }
        }

        // Removal must happen after the iterator's shard locks are released.
        for id in closed {
            self.unsubscribe(id);
        }

        debug!(?cause, delivered, "published refresh signal");
        delivered
    }

    /// Spawn the periodic task.
    ///
    /// The task parks while idle and restarts its period each time the first
    /// subscriber arrives, so the first signal comes one full period later.
    pub fn start(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let notifier = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            loop {
                if notifier.subscribers.is_empty() {
                    tokio::select! {
                        _ = notifier.wake.notified() => continue,
                        _ = shutdown_rx.changed() => break,
                    }
                }

                let period = notifier.interval;
                let mut ticker = time::interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            if notifier.subscribers.is_empty() {
                                break;
                            }
                            notifier.publish(RefreshCause::Periodic);
                        }
                        _ = shutdown_rx.changed() => {
                            info!("Change notifier shutting down");
                            return;
                        }
                    }
                }
            }
            info!("Change notifier shutting down");
        })
    }

    /// Stop the periodic task. Subscribers stay registered.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Receiving end of a subscription.
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<RefreshSignal>,
    notifier: Weak<ChangeNotifier>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next signal; `None` once the notifier is gone.
    pub async fn recv(&mut self) -> Option<RefreshSignal> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(notifier) = self.notifier.upgrade() {
            notifier.unsubscribe(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn next_signal(sub: &mut Subscription) -> RefreshSignal {
        time::timeout(Duration::from_secs(2), sub.recv())
            .await
            .expect("no signal within deadline")
            .expect("notifier dropped")
    }

    #[tokio::test]
    async fn test_state_follows_subscribers() {
        let notifier = ChangeNotifier::new(DEFAULT_INTERVAL, 4);
        assert_eq!(notifier.state(), NotifierState::Idle);

        let first = notifier.subscribe();
        let second = notifier.subscribe();
        assert_eq!(notifier.state(), NotifierState::Broadcasting);
        assert_eq!(notifier.subscriber_count(), 2);

        assert!(notifier.unsubscribe(first.id()));
        assert!(!notifier.unsubscribe(first.id()));
        assert_eq!(notifier.state(), NotifierState::Broadcasting);

        drop(second);
        assert_eq!(notifier.state(), NotifierState::Idle);
    }

    #[tokio::test]
    async fn test_periodic_signal_reaches_subscriber() {
        let notifier = ChangeNotifier::new(Duration::from_millis(20), 4);
        let task = notifier.start();

        let mut sub = notifier.subscribe();
        let signal = next_signal(&mut sub).await;
        assert_eq!(signal.cause, RefreshCause::Periodic);

        notifier.shutdown();
        time::timeout(Duration::from_secs(2), task)
            .await
            .expect("task did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_lagging_subscriber_does_not_block_others() {
        let notifier = ChangeNotifier::new(Duration::from_millis(10), 1);
        let task = notifier.start();

        let _stalled = notifier.subscribe();
        let mut active = notifier.subscribe();

        for _ in 0..3 {
            assert_eq!(next_signal(&mut active).await.cause, RefreshCause::Periodic);
        }
        assert_eq!(notifier.subscriber_count(), 2);

        notifier.shutdown();
        let _ = task.await;
    }

    #[tokio::test]
    async fn test_publish_prunes_closed_subscribers() {
        let notifier = ChangeNotifier::new(DEFAULT_INTERVAL, 4);
        let mut live = notifier.subscribe();

        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        notifier.subscribers.insert(999, tx);
        assert_eq!(notifier.subscriber_count(), 2);

        let delivered = notifier.publish(RefreshCause::ReportGenerated);
        assert_eq!(delivered, 1);
        assert_eq!(notifier.subscriber_count(), 1);
        assert_eq!(next_signal(&mut live).await.cause, RefreshCause::ReportGenerated);
    }

    #[tokio::test]
    async fn test_idle_notifier_sends_nothing() {
        let notifier = ChangeNotifier::new(Duration::from_millis(10), 4);
        let task = notifier.start();

        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(notifier.publish(RefreshCause::Periodic), 0);

        notifier.shutdown();
        let _ = task.await;
    }

    #[test]
    fn test_signal_wire_shape() {
        let signal = RefreshSignal {
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            cause: RefreshCause::Periodic,
        };
        let value = serde_json::to_value(&signal).unwrap();
        assert_eq!(value["cause"], "periodic");
        assert_eq!(value["timestamp"], "2023-11-14T22:13:20Z");
        assert_eq!(value.as_object().unwrap().len(), 2);
    }
}
