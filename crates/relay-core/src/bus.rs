//! Replay-1 event bus.
//!
//! A keyed multicast primitive: any subsystem can publish under a named
//! channel and any number of subscribers can observe "the latest and all
//! future values" of that name. A new subscriber immediately receives the
//! channel's most recent value - or the explicit "no value yet" sentinel
//! (`None`) - before any further publication.
//!
//! Channels are created lazily on first use and live for the lifetime of
//! the bus. Nothing garbage-collects them: a host that derives channel
//! names from unbounded user input must bound that set itself.

use dashmap::DashMap;
use futures_util::Stream;
use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::trace;

struct ChannelInner<T> {
    last: Option<T>,
    subscribers: Vec<mpsc::UnboundedSender<Option<T>>>,
}

struct EventChannel<T> {
    inner: Mutex<ChannelInner<T>>,
}

impl<T> Default for EventChannel<T> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(ChannelInner {
                last: None,
                subscribers: Vec::new(),
            }),
        }
    }
}

/// Keyed replay-1 multicast bus.
pub struct EventBus<T> {
    channels: DashMap<String, EventChannel<T>>,
}

impl<T: Clone + Send + 'static> EventBus<T> {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Publish a value on a named channel.
    ///
    /// Stores the value as the channel's latest, delivers it to every
    /// current subscriber in registration order, and returns a fresh
    /// subscription to the same channel so the caller can observe
    /// subsequent values (starting with the value just published).
    pub fn publish(&self, name: &str, value: T) -> EventStream<T> {
        let channel = self.channels.entry(name.to_string()).or_default();
        let mut inner = channel.inner.lock().expect("event channel lock poisoned");

        inner.last = Some(value.clone());
        // Delivery also prunes subscribers whose stream was dropped.
        inner
            .subscribers
            .retain(|tx| tx.send(Some(value.clone())).is_ok());
        trace!(channel = %name, subscribers = inner.subscribers.len(), "Published");

        Self::attach(&mut inner)
    }

    /// Subscribe to a named channel.
    ///
    /// The stream immediately yields the channel's latest value - `None`
    /// if nothing has been published yet - then every subsequent value in
    /// publish order. It never completes on its own; drop it to cancel.
    pub fn subscribe(&self, name: &str) -> EventStream<T> {
        let channel = self.channels.entry(name.to_string()).or_default();
        let mut inner = channel.inner.lock().expect("event channel lock poisoned");
        trace!(channel = %name, "Subscribed");
        Self::attach(&mut inner)
    }

    fn attach(inner: &mut ChannelInner<T>) -> EventStream<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        // Replay-1: the receiver sees the current value before anything else.
        let _ = tx.send(inner.last.clone());
        inner.subscribers.push(tx);
        EventStream { rx }
    }

    /// Number of channels that have ever been used.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of live subscribers on a channel.
    #[must_use]
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.channels.get(name).map_or(0, |channel| {
            let inner = channel.inner.lock().expect("event channel lock poisoned");
            inner.subscribers.iter().filter(|tx| !tx.is_closed()).count()
        })
    }
}

impl<T: Clone + Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A subscription to one bus channel.
///
/// Yields `Option<T>`: `None` is the "no value yet" sentinel replayed to
/// subscribers of a never-published channel; every published value arrives
/// as `Some`. Dropping the stream cancels only this subscription.
#[derive(Debug)]
pub struct EventStream<T> {
    rx: mpsc::UnboundedReceiver<Option<T>>,
}

impl<T> EventStream<T> {
    /// Receive the next value.
    ///
    /// Returns `None` only if the bus itself was dropped.
    pub async fn recv(&mut self) -> Option<Option<T>> {
        self.rx.recv().await
    }

    /// Receive without waiting; `None` if nothing is queued.
    pub fn try_recv(&mut self) -> Option<Option<T>> {
        self.rx.try_recv().ok()
    }
}

impl<T> Stream for EventStream<T> {
    type Item = Option<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sentinel_before_first_publish() {
        let bus: EventBus<u32> = EventBus::new();

        let mut stream = bus.subscribe("counter");
        assert_eq!(stream.recv().await, Some(None));

        bus.publish("counter", 1);
        assert_eq!(stream.recv().await, Some(Some(1)));
    }

    #[tokio::test]
    async fn test_late_subscriber_replays_latest() {
        let bus: EventBus<u32> = EventBus::new();
        for n in 1..=3 {
            bus.publish("counter", n);
        }

        let mut stream = bus.subscribe("counter");
        assert_eq!(stream.recv().await, Some(Some(3)));

        bus.publish("counter", 4);
        bus.publish("counter", 5);
        assert_eq!(stream.recv().await, Some(Some(4)));
        assert_eq!(stream.recv().await, Some(Some(5)));
    }

    #[tokio::test]
    async fn test_publish_returns_observing_stream() {
        let bus: EventBus<&'static str> = EventBus::new();

        let mut stream = bus.publish("status", "ready");
        assert_eq!(stream.recv().await, Some(Some("ready")));

        bus.publish("status", "busy");
        assert_eq!(stream.recv().await, Some(Some("busy")));
    }

    #[tokio::test]
    async fn test_all_subscribers_receive_in_order() {
        let bus: EventBus<u32> = EventBus::new();

        let mut first = bus.subscribe("counter");
        let mut second = bus.subscribe("counter");
        assert_eq!(first.recv().await, Some(None));
        assert_eq!(second.recv().await, Some(None));

        bus.publish("counter", 1);
        bus.publish("counter", 2);

        for stream in [&mut first, &mut second] {
            assert_eq!(stream.recv().await, Some(Some(1)));
            assert_eq!(stream.recv().await, Some(Some(2)));
        }
    }

    #[tokio::test]
    async fn test_cancellation_is_independent() {
        let bus: EventBus<u32> = EventBus::new();

        let first = bus.subscribe("counter");
        let mut second = bus.subscribe("counter");
        assert_eq!(second.recv().await, Some(None));

        drop(first);
        bus.publish("counter", 7);

        // The survivor still receives, and the stored value is intact.
        assert_eq!(second.recv().await, Some(Some(7)));
        let mut third = bus.subscribe("counter");
        assert_eq!(third.recv().await, Some(Some(7)));
    }

    #[tokio::test]
    async fn test_channels_are_independent() {
        let bus: EventBus<u32> = EventBus::new();

        let mut counter = bus.subscribe("counter");
        bus.publish("other", 9);

        assert_eq!(counter.recv().await, Some(None));
        assert_eq!(counter.try_recv(), None);
        assert_eq!(bus.channel_count(), 2);
    }
}
