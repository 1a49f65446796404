//! Subscription hub: one bounded channel per connected observer.
//!
//! # Architecture
//!
//! ```text
//!                    ┌──> [buffer] ──> Subscription sub-0 ──> SSE stream
//! Notifier ──> hub ──┼──> [buffer] ──> Subscription sub-1 ──> SSE stream
//!                    └──> [buffer] ──> Subscription sub-2 ──> (stalled, evicted)
//! ```
//!
//! Deliveries to different subscribers run concurrently. Each delivery first
//! tries the buffer without waiting, then waits at most `send_timeout` for
//! space; a subscriber that does not make room in time is torn down. Other
//! subscribers are never affected.
//!
//! Dropping a [`Subscription`] unsubscribes it, which is how a transport that
//! closes (the HTTP response stream being dropped) cancels its observer.

use crate::metrics::HubMetrics;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::task::{Context, Poll};
use std::time::Duration;
use stockwatch_core::{ChangeEvent, StockError, SubscriberId};
use tokio::sync::mpsc::{self, error::TrySendError};

/// Delivery bounds for every subscriber.
#[derive(Debug, Clone, Copy)]
pub struct HubConfig {
    /// Events buffered per subscriber before sends start waiting
    pub buffer: usize,
    /// Longest a single delivery may wait for buffer space
    pub send_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            buffer: 16,
            send_timeout: Duration::from_millis(500),
        }
    }
}

struct HubInner {
    config: HubConfig,
    next_id: AtomicU64,
    /// The active-subscriber gauge is only written while this is held
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<ChangeEvent>>>,
}

impl HubInner {
    fn remove(&self, id: SubscriberId) -> bool {
        let (removed, remaining) = {
            let mut subscribers = self
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let removed = subscribers.remove(&id).is_some();
            if removed {
                HubMetrics::set_active(subscribers.len());
            }
            (removed, subscribers.len())
        };

        if removed {
            tracing::info!(subscriber = %id, active = remaining, "Subscriber removed");
        }
        removed
    }
}

/// Registry of live subscribers.
///
/// Cheap to clone; all clones share the same registry.
#[derive(Clone)]
pub struct SubscriptionHub {
    inner: Arc<HubInner>,
}

impl SubscriptionHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new(config: HubConfig) -> Self {
        Self {
            inner: Arc::new(HubInner {
                config: HubConfig {
                    buffer: config.buffer.max(1),
                    ..config
                },
                next_id: AtomicU64::new(0),
                subscribers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Register a new subscriber and return its receiving end.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        let id = SubscriberId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(self.inner.config.buffer);

        let active = {
            let mut subscribers = self
                .inner
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            subscribers.insert(id, sender);
            HubMetrics::set_active(subscribers.len());
            subscribers.len()
        };

        tracing::info!(subscriber = %id, active, "Subscriber connected");

        Subscription {
            id,
            receiver,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Remove a subscriber and close its channel.
    ///
    /// Returns whether it was still registered; calling it again is a no-op.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.inner.remove(id)
    }

    /// Remove every subscriber, ending all their streams once drained.
    ///
    /// Used at shutdown so open transports can finish.
    pub fn close_all(&self) -> usize {
        let closed = {
            let mut subscribers = self
                .inner
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let closed = subscribers.len();
            subscribers.clear();
            HubMetrics::set_active(0);
            closed
        };

        tracing::info!(closed, "All subscribers closed");
        closed
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether `id` is still registered.
    #[must_use]
    pub fn is_subscribed(&self, id: SubscriberId) -> bool {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    /// Deliver `event` to every live subscriber.
    ///
    /// Returns the number of subscribers that accepted it. Subscribers that
    /// time out or have gone away are removed before this returns.
    pub async fn broadcast(&self, event: &ChangeEvent) -> usize {
        let targets: Vec<(SubscriberId, mpsc::Sender<ChangeEvent>)> = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, sender)| (*id, sender.clone()))
            .collect();

        if targets.is_empty() {
            return 0;
        }

        let send_timeout = self.inner.config.send_timeout;
        let deliveries = targets.into_iter().map(|(id, sender)| {
            let event = event.clone();
            async move { (id, deliver(id, &sender, event, send_timeout).await) }
        });

        let mut delivered = 0;
        for (id, result) in futures::future::join_all(deliveries).await {
            match result {
                Ok(()) => delivered += 1,
                Err(error) => {
                    tracing::warn!(subscriber = %id, error = %error, "Evicting subscriber");
                    HubMetrics::record_eviction();
                    self.inner.remove(id);
                }
            }
        }

        tracing::trace!(kind = event.kind().as_str(), delivered, "Event broadcast");
        delivered
    }
}

impl std::fmt::Debug for SubscriptionHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHub")
            .field("config", &self.inner.config)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

async fn deliver(
    id: SubscriberId,
    sender: &mpsc::Sender<ChangeEvent>,
    event: ChangeEvent,
    send_timeout: Duration,
) -> Result<(), StockError> {
    match sender.try_send(event) {
        Ok(()) => Ok(()),
        Err(TrySendError::Full(event)) => {
            match tokio::time::timeout(send_timeout, sender.send(event)).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(_)) | Err(_) => Err(StockError::SubscriberUnresponsive(id)),
            }
        }
        Err(TrySendError::Closed(_)) => Err(StockError::SubscriberUnresponsive(id)),
    }
}

/// Receiving end of one subscriber.
///
/// Yields events in emission order. Ends (`None`) once the hub has removed the
/// subscriber and the buffer is drained. Dropping it unsubscribes.
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<ChangeEvent>,
    hub: Weak<HubInner>,
}

impl Subscription {
    /// Handle of this subscriber.
    #[must_use]
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next event.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.receiver.recv().await
    }
}

impl Stream for Subscription {
    type Item = ChangeEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish_non_exhaustive()
    }
}
