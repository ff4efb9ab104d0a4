// Ports define what the order core needs from storage, without implementing it.
//
// Purpose
// - Database / OrderTransaction: atomic writes of orders, their items and outbox rows.
// - OrderQueries: read side for customers and admins.
// - OutboxStore: what the relay needs to move events from PENDING to SENT or FAILED.
//
// Boundaries
// - No concrete input or output here. Adapters implement these traits in the adapters layer.
//
// Transactions
// - A transaction that is dropped without `commit` is rolled back. Callers rely on that
//   for every error path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::modules::orders::core::order::{Order, OrderItem};
use crate::modules::orders::core::outbox_event::OutboxEvent;
use crate::modules::orders::core::status::OrderStatus;
use crate::shared::core::pagination::Page;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait Database: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn OrderTransaction>, PersistenceError>;
}

#[async_trait]
pub trait OrderTransaction: Send {
    async fn insert_order(&mut self, order: &Order) -> Result<(), PersistenceError>;

    async fn insert_order_items(&mut self, items: &[OrderItem]) -> Result<(), PersistenceError>;

    async fn insert_outbox_event(&mut self, event: &OutboxEvent) -> Result<(), PersistenceError>;

    /// Read the order and hold a write lock on it until the transaction ends.
    async fn lock_order(&mut self, order_id: Uuid) -> Result<Option<Order>, PersistenceError>;

    async fn update_order_status(
        &mut self,
        order_id: Uuid,
        status: OrderStatus,
        receipt_number: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError>;

    async fn commit(self: Box<Self>) -> Result<(), PersistenceError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
}

#[async_trait]
pub trait OrderQueries: Send + Sync {
    async fn get_by_id(&self, order_id: Uuid) -> anyhow::Result<Option<Order>>;
    async fn items_for_order(&self, order_id: Uuid) -> anyhow::Result<Vec<OrderItem>>;
    /// Newest first.
    async fn list_by_user(&self, user_id: Uuid, page: Page) -> anyhow::Result<Vec<Order>>;
    /// Newest first.
    async fn list_all(&self, filter: OrderFilter, page: Page) -> anyhow::Result<Vec<Order>>;
}

#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Oldest first.
    async fn list_pending(&self, limit: usize) -> Result<Vec<OutboxEvent>, PersistenceError>;
    async fn mark_sent(&self, event_id: Uuid) -> Result<(), PersistenceError>;
    /// Also bumps the attempt counter.
    async fn mark_failed(&self, event_id: Uuid, error: &str) -> Result<(), PersistenceError>;
    /// Move FAILED events with fewer than `max_attempts` attempts back to PENDING.
    async fn requeue_failed(&self, max_attempts: i32) -> Result<u64, PersistenceError>;
}
