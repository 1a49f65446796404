//! Periodic change notification.
//!
//! ```text
//!        ┌──────── tick / wake ────────┐
//!        │                             ▼
//!      IDLE <──── broadcast ──── EVALUATING
//! ```
//!
//! Every tick broadcasts a `time` event, then a stock event built from the
//! cache. The stock text is rebuilt only when the cache has reloaded since the
//! previous tick (a new snapshot revision) and is re-sent unchanged otherwise,
//! so observers get a constant heartbeat. A failed stock read skips the stock
//! event for that tick only.

use crate::cache::StockCache;
use crate::hub::SubscriptionHub;
use crate::metrics::NotifierMetrics;
use chrono::{DateTime, FixedOffset, Local, Offset, Utc};
use std::sync::Arc;
use std::time::Duration;
use stockwatch_core::environment::Clock;
use stockwatch_core::{stock_message, ChangeEvent};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Notifier settings.
#[derive(Debug, Clone, Copy)]
pub struct NotifierConfig {
    /// Time between ticks
    pub interval: Duration,
    /// Offset used to render the `time` event; the host's local time zone,
    /// re-read on every tick, when `None`
    pub display_offset: Option<FixedOffset>,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            display_offset: Some(Utc.fix()),
        }
    }
}

/// The global tick loop.
pub struct Notifier {
    cache: Arc<StockCache>,
    hub: SubscriptionHub,
    clock: Arc<dyn Clock>,
    config: NotifierConfig,
    wake: Option<Arc<Notify>>,
    /// Revision and text of the last stock message built
    last_stock: Option<(u64, String)>,
}

impl Notifier {
    /// Create a notifier reading from `cache` and publishing to `hub`.
    #[must_use]
    pub fn new(
        cache: Arc<StockCache>,
        hub: SubscriptionHub,
        clock: Arc<dyn Clock>,
        config: NotifierConfig,
    ) -> Self {
        Self {
            cache,
            hub,
            clock,
            config,
            wake: None,
            last_stock: None,
        }
    }

    /// Also tick as soon as `wake` is notified, without waiting for the period.
    #[must_use]
    pub fn with_wake(mut self, wake: Arc<Notify>) -> Self {
        self.wake = Some(wake);
        self
    }

    /// Run one tick and return the events broadcast, in order.
    pub async fn tick(&mut self) -> Vec<ChangeEvent> {
        let time = ChangeEvent::time(wall_clock(self.clock.now(), self.config.display_offset));
        self.hub.broadcast(&time).await;

        let mut emitted = vec![time];
        match self.stock_event().await {
            Some(stock) => {
                self.hub.broadcast(&stock).await;
                emitted.push(stock);
                NotifierMetrics::record_tick(true);
            }
            None => NotifierMetrics::record_tick(false),
        }
        emitted
    }

    async fn stock_event(&mut self) -> Option<ChangeEvent> {
        let snapshot = match self.cache.get_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::warn!(error = %error, "Stock read failed, skipping stock event this tick");
                return None;
            }
        };

        let message = match &self.last_stock {
            Some((revision, message)) if *revision == snapshot.revision => message.clone(),
            _ => {
                let message = stock_message(snapshot.quantity);
                tracing::debug!(revision = snapshot.revision, %message, "Stock message rebuilt");
                self.last_stock = Some((snapshot.revision, message.clone()));
                message
            }
        };

        Some(ChangeEvent::stock(message))
    }

    /// Tick until `shutdown` turns `true` or its sender is dropped.
    ///
    /// The first tick fires one interval after start.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let period = self.config.interval;
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_ms = period.as_millis(), "Notifier started");

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                () = woken(self.wake.as_deref()) => {
                    interval.reset();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            self.tick().await;
        }

        tracing::info!("Notifier stopped");
    }

    /// Spawn [`run`](Self::run) on the current runtime.
    #[must_use]
    pub fn spawn(self) -> NotifierHandle {
        let (shutdown, receiver) = watch::channel(false);
        let task = tokio::spawn(self.run(receiver));
        NotifierHandle { shutdown, task }
    }
}

/// `now` in `offset`, or in the local time zone in effect at `now`.
fn wall_clock(now: DateTime<Utc>, offset: Option<FixedOffset>) -> DateTime<FixedOffset> {
    let offset = offset.unwrap_or_else(|| now.with_timezone(&Local).offset().fix());
    now.with_timezone(&offset)
}

async fn woken(wake: Option<&Notify>) {
    match wake {
        Some(notify) => notify.notified().await,
        None => std::future::pending().await,
    }
}

/// Handle to a spawned notifier.
#[derive(Debug)]
pub struct NotifierHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl NotifierHandle {
    /// Stop ticking and wait for the loop to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Notifier task failed");
        }
    }
}
