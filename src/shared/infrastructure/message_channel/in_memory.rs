// In memory implementation of the message channel ports.
//
// Purpose
// - Local development and tests without a broker.
//
// Responsibilities
// - Keep an append-only log per topic.
// - Track one cursor per consumer group; members of a group share the cursor so each
//   message is handed to a single member at a time.
// - Hand uncommitted deliveries back to the group when they are dropped.
// - Track commits as a low-water mark per group and drop messages every group has
//   committed. A group subscribed later starts at the oldest retained message.

use crate::shared::infrastructure::message_channel::{
    ChannelError, Delivery, EventPublisher, Message, MessageSubscriber, OutboundMessage,
};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

struct GroupCursor {
    next: usize,
    redeliver: BTreeSet<usize>,
    /// Every offset below this one is committed.
    committed_below: usize,
    /// Commits above the low-water mark, waiting for the gap below them to close.
    committed_ahead: BTreeSet<usize>,
}

impl GroupCursor {
    fn starting_at(offset: usize) -> Self {
        Self {
            next: offset,
            redeliver: BTreeSet::new(),
            committed_below: offset,
            committed_ahead: BTreeSet::new(),
        }
    }

    fn commit(&mut self, offset: usize) {
        if offset < self.committed_below {
            return;
        }
        self.committed_ahead.insert(offset);
        while self.committed_ahead.remove(&self.committed_below) {
            self.committed_below += 1;
        }
    }

    fn is_committed(&self, offset: usize) -> bool {
        offset < self.committed_below || self.committed_ahead.contains(&offset)
    }
}

#[derive(Default)]
struct TopicLog {
    /// Offset of `messages[0]`.
    base: usize,
    messages: VecDeque<Message>,
    groups: HashMap<String, GroupCursor>,
}

impl TopicLog {
    fn group(&mut self, group: &str) -> &mut GroupCursor {
        let base = self.base;
        self.groups
            .entry(group.to_string())
            .or_insert_with(|| GroupCursor::starting_at(base))
    }

    fn end(&self) -> usize {
        self.base + self.messages.len()
    }

    fn message(&self, offset: usize) -> Option<&Message> {
        offset.checked_sub(self.base).and_then(|index| self.messages.get(index))
    }

    fn trim(&mut self) {
        let Some(retain_from) = self.groups.values().map(|cursor| cursor.committed_below).min() else {
            return;
        };
        while self.base < retain_from && self.messages.pop_front().is_some() {
            self.base += 1;
        }
    }
}

#[derive(Default)]
struct Shared {
    topics: Mutex<HashMap<String, TopicLog>>,
    notify: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, TopicLog>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryMessageChannel {
    shared: Arc<Shared>,
    rejected_keys: HashSet<String>,
    is_offline: bool,
}

impl InMemoryMessageChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_offline(&mut self) {
        self.is_offline = !self.is_offline;
    }

    /// Refuse every publish carrying this key.
    pub fn reject_key(&mut self, key: impl Into<String>) {
        self.rejected_keys.insert(key.into());
    }

    pub fn subscribe(&self, topic: impl Into<String>, group: impl Into<String>) -> InMemorySubscription {
        let topic = topic.into();
        let group = group.into();
        self.shared.lock().entry(topic.clone()).or_default().group(&group);
        InMemorySubscription {
            shared: self.shared.clone(),
            topic,
            group,
        }
    }

    /// Messages still retained for the topic, oldest first.
    pub fn published(&self, topic: &str) -> Vec<Message> {
        self.shared
            .lock()
            .get(topic)
            .map(|log| log.messages.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_committed(&self, topic: &str, group: &str, offset: u64) -> bool {
        self.shared
            .lock()
            .get(topic)
            .and_then(|log| log.groups.get(group))
            .is_some_and(|cursor| cursor.is_committed(offset as usize))
    }
}

#[async_trait]
impl EventPublisher for InMemoryMessageChannel {
    async fn publish(&self, topic: &str, message: OutboundMessage) -> Result<(), ChannelError> {
        if self.is_offline {
            return Err(ChannelError::Backend("Message channel offline".into()));
        }
        if self.rejected_keys.contains(&message.key) {
            return Err(ChannelError::PublishRejected {
                topic: topic.to_string(),
                reason: format!("key {} rejected", message.key),
            });
        }
        {
            let mut topics = self.shared.lock();
            let log = topics.entry(topic.to_string()).or_default();
            let offset = log.end() as u64;
            log.messages.push_back(Message {
                topic: topic.to_string(),
                offset,
                key: message.key,
                headers: message.headers,
                payload: message.payload,
            });
        }
        self.shared.notify.notify_waiters();
        Ok(())
    }
}

pub struct InMemorySubscription {
    shared: Arc<Shared>,
    topic: String,
    group: String,
}

impl InMemorySubscription {
    fn try_take(&self) -> Option<InMemoryDelivery> {
        let mut topics = self.shared.lock();
        let log = topics.entry(self.topic.clone()).or_default();
        let end = log.end();
        let base = log.base;
        let cursor = log.group(&self.group);
        cursor.next = cursor.next.max(base);
        let offset = match cursor.redeliver.pop_first() {
            Some(offset) => offset,
            None if cursor.next < end => {
                cursor.next += 1;
                cursor.next - 1
            }
            None => return None,
        };
        let message = log.message(offset)?.clone();
        Some(InMemoryDelivery {
            shared: self.shared.clone(),
            group: self.group.clone(),
            message,
            committed: false,
        })
    }
}

#[async_trait]
impl MessageSubscriber for InMemorySubscription {
    async fn fetch(&self) -> Result<Box<dyn Delivery>, ChannelError> {
        loop {
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if let Some(delivery) = self.try_take() {
                return Ok(Box::new(delivery));
            }
            notified.await;
        }
    }
}

pub struct InMemoryDelivery {
    shared: Arc<Shared>,
    group: String,
    message: Message,
    committed: bool,
}

#[async_trait]
impl Delivery for InMemoryDelivery {
    fn message(&self) -> &Message {
        &self.message
    }

    async fn commit(mut self: Box<Self>) -> Result<(), ChannelError> {
        let mut topics = self.shared.lock();
        let log = topics.get_mut(&self.message.topic).ok_or(ChannelError::Closed)?;
        log.groups
            .get_mut(&self.group)
            .ok_or(ChannelError::Closed)?
            .commit(self.message.offset as usize);
        log.trim();
        drop(topics);
        self.committed = true;
        Ok(())
    }
}

impl Drop for InMemoryDelivery {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        {
            let mut topics = self.shared.lock();
            if let Some(cursor) = topics
                .get_mut(&self.message.topic)
                .and_then(|log| log.groups.get_mut(&self.group))
            {
                cursor.redeliver.insert(self.message.offset as usize);
            }
        }
        self.shared.notify.notify_waiters();
    }
}

#[cfg(test)]
mod in_memory_message_channel_tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::time::Duration;
    use tokio::time::timeout;

    const TOPIC: &str = "order-events";

    #[fixture]
    fn channel() -> InMemoryMessageChannel {
        InMemoryMessageChannel::new()
    }

    fn message(key: &str) -> OutboundMessage {
        OutboundMessage::new(key, key.as_bytes().to_vec()).with_header("event_type", "DELETE_CART")
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_deliver_published_messages_in_order(channel: InMemoryMessageChannel) {
        let subscription = channel.subscribe(TOPIC, "cart");
        channel.publish(TOPIC, message("a")).await.unwrap();
        channel.publish(TOPIC, message("b")).await.unwrap();

        let first = subscription.fetch().await.unwrap();
        assert_eq!(first.message().key, "a");
        assert_eq!(first.message().header("event_type"), Some("DELETE_CART"));
        first.commit().await.unwrap();
        let second = subscription.fetch().await.unwrap();
        assert_eq!(second.message().key, "b");
        assert_eq!(second.message().offset, 1);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_redeliver_a_message_that_was_not_committed(channel: InMemoryMessageChannel) {
        let subscription = channel.subscribe(TOPIC, "cart");
        channel.publish(TOPIC, message("a")).await.unwrap();

        let delivery = subscription.fetch().await.unwrap();
        drop(delivery);
        let again = subscription.fetch().await.unwrap();
        assert_eq!(again.message().key, "a");
        again.commit().await.unwrap();

        assert!(channel.is_committed(TOPIC, "cart", 0));
        let nothing = timeout(Duration::from_millis(50), subscription.fetch()).await;
        assert!(nothing.is_err(), "no message should be left for the group");
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_wait_for_a_message_to_be_published(channel: InMemoryMessageChannel) {
        let subscription = channel.subscribe(TOPIC, "cart");
        let publisher = channel.clone();
        let waiter = tokio::spawn(async move { subscription.fetch().await.map(|d| d.message().key.clone()) });
        tokio::time::sleep(Duration::from_millis(20)).await;
        publisher.publish(TOPIC, message("late")).await.unwrap();

        let key = timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap().unwrap();
        assert_eq!(key, "late");
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_share_a_group_and_fan_out_across_groups(channel: InMemoryMessageChannel) {
        let member_one = channel.subscribe(TOPIC, "cart");
        let member_two = channel.subscribe(TOPIC, "cart");
        let other_group = channel.subscribe(TOPIC, "audit");
        channel.publish(TOPIC, message("a")).await.unwrap();
        channel.publish(TOPIC, message("b")).await.unwrap();

        let one = member_one.fetch().await.unwrap();
        let two = member_two.fetch().await.unwrap();
        assert_ne!(one.message().offset, two.message().offset);

        let audit = other_group.fetch().await.unwrap();
        assert_eq!(audit.message().key, "a");
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_drop_messages_once_every_group_has_committed_them(channel: InMemoryMessageChannel) {
        let cart = channel.subscribe(TOPIC, "cart");
        let audit = channel.subscribe(TOPIC, "audit");
        for key in ["a", "b", "c"] {
            channel.publish(TOPIC, message(key)).await.unwrap();
        }

        let a = cart.fetch().await.unwrap();
        let b = cart.fetch().await.unwrap();
        b.commit().await.unwrap();
        assert!(channel.is_committed(TOPIC, "cart", 1));
        assert!(!channel.is_committed(TOPIC, "cart", 0));
        a.commit().await.unwrap();
        assert_eq!(channel.published(TOPIC).len(), 3, "audit has not read anything yet");

        audit.fetch().await.unwrap().commit().await.unwrap();
        audit.fetch().await.unwrap().commit().await.unwrap();
        let retained = channel.published(TOPIC);
        assert_eq!(retained.len(), 1);
        assert_eq!(retained[0].offset, 2);
        assert!(channel.is_committed(TOPIC, "cart", 0));

        let late = channel.subscribe(TOPIC, "late");
        let first = late.fetch().await.unwrap();
        assert_eq!(first.message().key, "c");
        assert_eq!(first.message().offset, 2);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_reject_configured_keys_and_fail_when_offline(mut channel: InMemoryMessageChannel) {
        channel.reject_key("bad");
        let rejected = channel.publish(TOPIC, message("bad")).await;
        assert!(matches!(rejected, Err(ChannelError::PublishRejected { .. })));

        channel.toggle_offline();
        let offline = channel.publish(TOPIC, message("good")).await;
        assert!(offline.unwrap_err().to_string().contains("Message channel offline"));
        assert!(channel.published(TOPIC).is_empty());
    }
}
