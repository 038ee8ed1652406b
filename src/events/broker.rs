//! EventBroker - in-process fan-out of progress events keyed by run id.
//!
//! The broker has no replay buffer: a subscriber only sees events published
//! after it registered. Observers that attach late rebuild earlier state from
//! the durable run snapshot.

use super::ProgressEvent;
use crate::types::{AppError, Result};
use crate::utils::toml_config::TransportConfig;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::SendTimeoutError, error::TrySendError};

/// Callback invoked for every event published to a subscribed run.
///
/// Sinks are called outside the broker lock but must not block: a slow sink
/// delays every later subscriber of the same run.
pub type EventSink = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

struct Subscriber {
    id: u64,
    sink: EventSink,
}

#[derive(Default)]
struct Registry {
    runs: Mutex<HashMap<String, Vec<Subscriber>>>,
    /// Runs whose producer is still publishing
    live: Mutex<HashSet<String>>,
    next_id: AtomicU64,
}

impl Registry {
    fn remove(&self, run_id: &str, subscriber_id: u64) -> bool {
        let mut runs = self.runs.lock();
        let Some(subscribers) = runs.get_mut(run_id) else {
            return false;
        };

        let before = subscribers.len();
        subscribers.retain(|s| s.id != subscriber_id);
        let removed = subscribers.len() != before;

        if subscribers.is_empty() {
            runs.remove(run_id);
        }
        removed
    }
}

/// Buffering for [`EventBroker::subscribe_channel`].
///
/// The retry settings apply to every event that may not be dropped, not only
/// terminal ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelOptions {
    pub capacity: usize,
    pub terminal_retry_attempts: u32,
    pub terminal_retry_timeout: Duration,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self::from(&TransportConfig::default())
    }
}

impl From<&TransportConfig> for ChannelOptions {
    fn from(config: &TransportConfig) -> Self {
        Self {
            capacity: config.channel_capacity.max(1),
            terminal_retry_attempts: config.terminal_retry_attempts.max(1),
            terminal_retry_timeout: Duration::from_millis(config.terminal_retry_timeout_ms),
        }
    }
}

async fn deliver_with_retry(
    tx: &mpsc::Sender<ProgressEvent>,
    event: ProgressEvent,
    options: ChannelOptions,
) -> Result<()> {
    for attempt in 1..=options.terminal_retry_attempts {
        match tx
            .send_timeout(event.clone(), options.terminal_retry_timeout)
            .await
        {
            Ok(()) | Err(SendTimeoutError::Closed(_)) => return Ok(()),
            Err(SendTimeoutError::Timeout(_)) => {
                tracing::warn!(attempt, kind = event.kind(), "event delivery timed out");
            }
        }
    }
    Err(AppError::Transport(format!(
        "gave up delivering {} event after {} attempts",
        event.kind(),
        options.terminal_retry_attempts
    )))
}

struct FeedState {
    /// `None` once the receiver is gone or delivery gave up
    tx: Option<mpsc::Sender<ProgressEvent>>,
    backlog: VecDeque<ProgressEvent>,
    pumping: bool,
}

impl FeedState {
    fn close(&mut self) {
        self.tx = None;
        self.backlog.clear();
        self.pumping = false;
    }
}

/// Sending half of a channel subscription.
///
/// Events go straight into the channel while it has room. Once it is full,
/// droppable events are discarded and the rest queue in `backlog`, which a
/// single task drains in publish order.
struct ChannelFeed {
    run_id: String,
    options: ChannelOptions,
    state: Mutex<FeedState>,
}

impl ChannelFeed {
    fn offer(self: &Arc<Self>, event: &ProgressEvent) {
        let mut state = self.state.lock();
        let Some(tx) = state.tx.clone() else {
            return;
        };

        // Nothing may overtake a queued event
        if !state.pumping {
            match tx.try_send(event.clone()) {
                Ok(()) => return,
                Err(TrySendError::Closed(_)) => {
                    state.close();
                    return;
                }
                Err(TrySendError::Full(_)) => {}
            }
        }

        if event.is_droppable() {
            tracing::warn!(
                run_id = %self.run_id,
                kind = event.kind(),
                "subscriber lagging, event dropped"
            );
            return;
        }

        state.backlog.push_back(event.clone());
        if state.pumping {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                state.pumping = true;
                let feed = Arc::clone(self);
                handle.spawn(async move { feed.pump(tx).await });
            }
            Err(_) => {
                tracing::error!(run_id = %self.run_id, "no runtime to deliver queued events");
                state.close();
            }
        }
    }

    async fn pump(&self, tx: mpsc::Sender<ProgressEvent>) {
        loop {
            let event = {
                let mut state = self.state.lock();
                if tx.is_closed() {
                    state.close();
                    return;
                }
                match state.backlog.pop_front() {
                    Some(event) => event,
                    None => {
                        state.pumping = false;
                        return;
                    }
                }
            };

            if let Err(e) = deliver_with_retry(&tx, event, self.options).await {
                tracing::error!(run_id = %self.run_id, "{}", e);
                self.state.lock().close();
                return;
            }
        }
    }
}

/// Per-run publish/subscribe registry.
///
/// Cloning is cheap and every clone shares the same subscriber map.
#[derive(Clone, Default)]
pub struct EventBroker {
    registry: Arc<Registry>,
}

impl EventBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `sink` for events of `run_id`.
    ///
    /// The returned [`Subscription`] unregisters the sink when dropped.
    pub fn subscribe<F>(&self, run_id: &str, sink: F) -> Subscription
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);

        self.registry
            .runs
            .lock()
            .entry(run_id.to_string())
            .or_default()
            .push(Subscriber {
                id,
                sink: Arc::new(sink),
            });

        tracing::debug!(run_id, subscriber = id, "subscriber attached");

        Subscription {
            registry: Arc::downgrade(&self.registry),
            run_id: run_id.to_string(),
            id,
            active: true,
        }
    }

    /// Subscribe through a bounded channel.
    ///
    /// The publisher never waits on the consumer. When the channel is full,
    /// `status` and `searchResult` events are dropped; every other event is
    /// queued and delivered in order by a background task that retries with
    /// a timeout. The receiver closes once the subscription is gone and the
    /// queue has drained.
    pub fn subscribe_channel(
        &self,
        run_id: &str,
        options: ChannelOptions,
    ) -> (Subscription, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(options.capacity.max(1));
        let feed = Arc::new(ChannelFeed {
            run_id: run_id.to_string(),
            options,
            state: Mutex::new(FeedState {
                tx: Some(tx),
                backlog: VecDeque::new(),
                pumping: false,
            }),
        });

        let subscription = self.subscribe(run_id, move |event: &ProgressEvent| feed.offer(event));
        (subscription, rx)
    }

    /// Deliver `event` to every subscriber currently registered for `run_id`,
    /// in registration order. Returns the number of sinks invoked.
    pub fn publish(&self, run_id: &str, event: &ProgressEvent) -> usize {
        let sinks: Vec<EventSink> = match self.registry.runs.lock().get(run_id) {
            Some(subscribers) => subscribers.iter().map(|s| Arc::clone(&s.sink)).collect(),
            None => return 0,
        };

        for sink in &sinks {
            sink(event);
        }
        sinks.len()
    }

    /// Number of live subscribers for a run.
    pub fn subscriber_count(&self, run_id: &str) -> usize {
        self.registry
            .runs
            .lock()
            .get(run_id)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Run ids that currently have at least one subscriber.
    pub fn active_runs(&self) -> Vec<String> {
        self.registry.runs.lock().keys().cloned().collect()
    }

    /// Record that a producer has started publishing for `run_id`.
    pub fn mark_live(&self, run_id: &str) {
        self.registry.live.lock().insert(run_id.to_string());
    }

    /// Record that the producer for `run_id` will publish nothing more.
    pub fn mark_ended(&self, run_id: &str) {
        self.registry.live.lock().remove(run_id);
    }

    /// Whether a producer in this process is still publishing for `run_id`.
    pub fn is_live(&self, run_id: &str) -> bool {
        self.registry.live.lock().contains(run_id)
    }
}

/// Handle binding one sink to one run id.
pub struct Subscription {
    registry: Weak<Registry>,
    run_id: String,
    id: u64,
    active: bool,
}

impl Subscription {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Unregister now. Equivalent to dropping the handle.
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        if let Some(registry) = self.registry.upgrade()
            && registry.remove(&self.run_id, self.id)
        {
            tracing::debug!(run_id = %self.run_id, subscriber = self.id, "subscriber detached");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}
