// Ports for the durable message channel between the outbox relay and its consumers.
//
// Purpose
// - Describe publishing and group-based consumption without tying the core to a broker.
//
// Delivery semantics
// - At least once. A delivery that is dropped without `commit` is handed out again
//   to the same consumer group, so consumers must be idempotent.

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

pub const HEADER_EVENT_TYPE: &str = "event_type";
pub const HEADER_AGGREGATE_TYPE: &str = "aggregate_type";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub key: String,
    pub headers: BTreeMap<String, String>,
    pub payload: Vec<u8>,
}

impl OutboundMessage {
    pub fn new(key: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            headers: BTreeMap::new(),
            payload,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub offset: u64,
    pub key: String,
    pub headers: BTreeMap<String, String>,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("publish to {topic} rejected: {reason}")]
    PublishRejected { topic: String, reason: String },

    #[error("channel closed")]
    Closed,

    #[error("backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, message: OutboundMessage) -> Result<(), ChannelError>;
}

#[async_trait]
pub trait Delivery: Send {
    fn message(&self) -> &Message;

    /// Acknowledge the message for the consumer group. Consumes the delivery.
    async fn commit(self: Box<Self>) -> Result<(), ChannelError>;
}

#[async_trait]
pub trait MessageSubscriber: Send + Sync {
    /// Wait for the next message for this subscription's consumer group.
    /// Cancel safe: dropping the future never loses a message.
    async fn fetch(&self) -> Result<Box<dyn Delivery>, ChannelError>;
}

pub mod in_memory;
pub mod postgres;
