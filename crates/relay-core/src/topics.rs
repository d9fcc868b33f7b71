//! Topic subscription table.
//!
//! Maps topic names to the connections currently interested. The table does
//! not own connections; fan-out looks each subscriber up in the registry at
//! publish time, so a stale entry is harmless until cleanup removes it.
//! An empty subscriber list and an absent topic are equivalent.

use std::collections::HashMap;
use tracing::debug;

use crate::connection::ConnectionId;

/// Mapping from topic name to its ordered subscriber list.
#[derive(Debug, Default)]
pub struct TopicTable {
    topics: HashMap<String, Vec<ConnectionId>>,
}

impl TopicTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a connection to a topic.
    ///
    /// Subscribing an already-subscribed connection is a no-op; a
    /// connection appears at most once per topic. Returns `true` if the
    /// subscription was newly added.
    pub fn subscribe(&mut self, topic: &str, id: &ConnectionId) -> bool {
        let subscribers = self.topics.entry(topic.to_string()).or_default();
        if subscribers.contains(id) {
            return false;
        }
        subscribers.push(id.clone());
        debug!(topic = %topic, connection = %id, "Subscribed");
        true
    }

    /// Unsubscribe a connection from a topic.
    ///
    /// Removes at most one entry; a no-op if absent. Returns `true` if an
    /// entry was removed.
    pub fn unsubscribe(&mut self, topic: &str, id: &ConnectionId) -> bool {
        let Some(subscribers) = self.topics.get_mut(topic) else {
            return false;
        };
        let Some(position) = subscribers.iter().position(|s| s == id) else {
            return false;
        };
        subscribers.remove(position);
        if subscribers.is_empty() {
            self.topics.remove(topic);
        }
        debug!(topic = %topic, connection = %id, "Unsubscribed");
        true
    }

    /// Remove a connection from every topic it is subscribed to.
    ///
    /// Called on disconnect so no stale target survives a close. Returns
    /// the number of subscriptions dropped.
    pub fn remove_connection(&mut self, id: &ConnectionId) -> usize {
        let mut dropped = 0;
        self.topics.retain(|_, subscribers| {
            if let Some(position) = subscribers.iter().position(|s| s == id) {
                subscribers.remove(position);
                dropped += 1;
            }
            !subscribers.is_empty()
        });
        dropped
    }

    /// Subscribers of a topic, in subscription order.
    ///
    /// An unknown topic yields the empty slice.
    #[must_use]
    pub fn subscribers(&self, topic: &str) -> &[ConnectionId] {
        self.topics.get(topic).map_or(&[], Vec::as_slice)
    }

    /// Check whether a connection is subscribed to a topic.
    #[must_use]
    pub fn is_subscribed(&self, topic: &str, id: &ConnectionId) -> bool {
        self.subscribers(topic).contains(id)
    }

    /// Number of topics with at least one subscriber.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Total number of subscriptions across all topics.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.topics.values().map(Vec::len).sum()
    }

    /// Names of all topics with at least one subscriber.
    #[must_use]
    pub fn topic_names(&self) -> Vec<String> {
        self.topics.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ConnectionId {
        ConnectionId::new(s)
    }

    #[test]
    fn test_subscribe_dedup() {
        let mut table = TopicTable::new();

        assert!(table.subscribe("rooms", &id("a")));
        assert!(!table.subscribe("rooms", &id("a")));
        assert_eq!(table.subscribers("rooms"), &[id("a")]);
    }

    #[test]
    fn test_subscribers_keep_insertion_order() {
        let mut table = TopicTable::new();
        table.subscribe("rooms", &id("a"));
        table.subscribe("rooms", &id("b"));
        table.subscribe("rooms", &id("c"));

        assert_eq!(table.subscribers("rooms"), &[id("a"), id("b"), id("c")]);
    }

    #[test]
    fn test_unsubscribe_removes_one_entry() {
        let mut table = TopicTable::new();
        table.subscribe("rooms", &id("a"));
        table.subscribe("rooms", &id("b"));

        assert!(table.unsubscribe("rooms", &id("a")));
        assert!(!table.unsubscribe("rooms", &id("a")));
        assert_eq!(table.subscribers("rooms"), &[id("b")]);
    }

    #[test]
    fn test_empty_topic_equals_absent_topic() {
        let mut table = TopicTable::new();
        table.subscribe("rooms", &id("a"));
        table.unsubscribe("rooms", &id("a"));

        assert_eq!(table.topic_count(), 0);
        assert!(table.subscribers("rooms").is_empty());
        // Publishing to a topic nobody subscribed to is equivalent
        assert!(table.subscribers("never-seen").is_empty());
    }

    #[test]
    fn test_remove_connection_from_every_topic() {
        let mut table = TopicTable::new();
        table.subscribe("rooms", &id("a"));
        table.subscribe("rooms", &id("b"));
        table.subscribe("games", &id("a"));

        assert_eq!(table.remove_connection(&id("a")), 2);
        assert_eq!(table.subscribers("rooms"), &[id("b")]);
        assert!(table.subscribers("games").is_empty());
        assert_eq!(table.topic_count(), 1);
    }

    #[test]
    fn test_counts() {
        let mut table = TopicTable::new();
        table.subscribe("rooms", &id("a"));
        table.subscribe("rooms", &id("b"));
        table.subscribe("games", &id("a"));

        assert_eq!(table.topic_count(), 2);
        assert_eq!(table.subscription_count(), 3);
    }
}
