// src/util/io/bus.rs
//! Event broadcaster - three independent topics with last-value caching

use futures::Stream;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::mpsc;

use crate::link::ConnectionState;
use crate::util::io::serial::TelemetryRecord;

pub type TopicSender<T> = mpsc::UnboundedSender<T>;
pub type TopicReceiver<T> = mpsc::UnboundedReceiver<T>;

struct TopicState<T> {
    last: Option<T>,
    subscribers: Vec<(u64, TopicSender<T>)>,
}

struct TopicInner<T> {
    name: &'static str,
    /// Replay the cached value to new subscribers
    replay: bool,
    next_id: AtomicU64,
    state: Mutex<TopicState<T>>,
}

/// One subscription channel. Publishing never waits on a subscriber: every
/// subscriber owns an unbounded queue, and closed queues are pruned on the
/// next publish.
pub struct Topic<T> {
    inner: Arc<TopicInner<T>>,
}

impl<T> Clone for Topic<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T: Clone + Send + 'static> Topic<T> {
    fn new(name: &'static str, replay: bool, initial: Option<T>) -> Self {
        Self {
            inner: Arc::new(TopicInner {
                name,
                replay,
                next_id: AtomicU64::new(1),
                state: Mutex::new(TopicState {
                    last: initial,
                    subscribers: Vec::new(),
                }),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    fn lock(&self) -> MutexGuard<'_, TopicState<T>> {
        // A panicking subscriber can't leave the registry half-updated
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn subscribe(&self) -> Subscription<T> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let mut state = self.lock();
        if self.inner.replay {
            if let Some(last) = &state.last {
                let _ = sender.send(last.clone());
            }
        }
        state.subscribers.push((id, sender));

        Subscription {
            id,
            receiver,
            topic: Arc::downgrade(&self.inner),
        }
    }

    pub fn current(&self) -> Option<T> {
        self.lock().last.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    pub fn publish(&self, value: T) {
        let mut state = self.lock();
        Self::deliver(&mut *state, value);
    }

    fn deliver(state: &mut TopicState<T>, value: T) {
        state
            .subscribers
            .retain(|(_, sender)| sender.send(value.clone()).is_ok());
        state.last = Some(value);
    }
}

fn unsubscribe<T>(topic: &Weak<TopicInner<T>>, id: u64) {
    if let Some(inner) = topic.upgrade() {
        let mut state = inner.state.lock().unwrap_or_else(|e| e.into_inner());
        state.subscribers.retain(|(sub_id, _)| *sub_id != id);
    }
}

/// Receiving end of a topic. Dropping it unsubscribes.
pub struct Subscription<T> {
    id: u64,
    receiver: TopicReceiver<T>,
    topic: Weak<TopicInner<T>>,
}

impl<T> Subscription<T> {
    /// Wait for the next value; `None` once the broadcaster is gone.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    pub fn unsubscribe(self) {
        drop(self)
    }

    pub fn into_stream(self) -> impl Stream<Item = T> {
        futures::stream::unfold(self, |mut sub| async move {
            let next = sub.recv().await?;
            Some((next, sub))
        })
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        unsubscribe(&self.topic, self.id);
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Fan-out of link events to independent subscribers.
#[derive(Clone)]
pub struct EventBroadcaster {
    status: Topic<ConnectionState>,
    telemetry: Topic<TelemetryRecord>,
    relay: Topic<bool>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self {
            status: Topic::new("connection_status", true, Some(ConnectionState::Disconnected)),
            telemetry: Topic::new("telemetry", false, None),
            relay: Topic::new("relay_state", true, Some(false)),
        }
    }

    pub fn subscribe_status(&self) -> Subscription<ConnectionState> {
        self.status.subscribe()
    }

    pub fn subscribe_telemetry(&self) -> Subscription<TelemetryRecord> {
        self.telemetry.subscribe()
    }

    pub fn subscribe_relay(&self) -> Subscription<bool> {
        self.relay.subscribe()
    }

    pub fn publish_status(&self, state: ConnectionState) {
        self.status.publish(state);
    }

    pub fn publish_relay(&self, on: bool) {
        self.relay.publish(on);
    }

    /// Deliver one sensor packet. Both topics are locked for the duration so
    /// no subscriber set changes between the telemetry and relay halves.
    pub fn publish_packet(&self, telemetry: TelemetryRecord, relay_on: bool) {
        let mut telemetry_state = self.telemetry.lock();
        let mut relay_state = self.relay.lock();
        Topic::deliver(&mut *telemetry_state, telemetry);
        Topic::deliver(&mut *relay_state, relay_on);
    }

    pub fn relay_state(&self) -> bool {
        self.relay.current().unwrap_or(false)
    }

    pub fn latest_telemetry(&self) -> Option<TelemetryRecord> {
        self.telemetry.current()
    }

    pub fn subscriber_counts(&self) -> (usize, usize, usize) {
        (
            self.status.subscriber_count(),
            self.telemetry.subscriber_count(),
            self.relay.subscriber_count(),
        )
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBroadcaster")
            .field(self.status.name(), &self.status.current())
            .field(self.relay.name(), &self.relay.current())
            .field(self.telemetry.name(), &self.telemetry.current())
            .finish()
    }
}
