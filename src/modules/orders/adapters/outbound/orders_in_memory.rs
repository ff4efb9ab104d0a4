// In memory implementation of the order storage ports.
//
// Purpose
// - Support use case tests and local development without a database.
//
// Responsibilities
// - Stage writes on a private copy of the tables and publish them on commit only.
// - Hold the table lock for the lifetime of a transaction, which also serialises
//   concurrent status transitions on the same order.
// - Enforce unique order numbers.
// - Expose fault toggles so tests can fail individual steps.

use crate::modules::orders::core::order::{Order, OrderItem};
use crate::modules::orders::core::outbox_event::{OutboxEvent, OutboxStatus};
use crate::modules::orders::core::ports::{
    Database, OrderFilter, OrderQueries, OrderTransaction, OutboxStore, PersistenceError,
};
use crate::modules::orders::core::status::OrderStatus;
use crate::shared::core::pagination::Page;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct Tables {
    orders: HashMap<Uuid, Order>,
    order_items: Vec<OrderItem>,
    outbox: Vec<OutboxEvent>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Faults {
    fail_order_items_insert: bool,
    fail_outbox_insert: bool,
    fail_commit: bool,
}

#[derive(Default)]
pub struct InMemoryDatabase {
    tables: Arc<Mutex<Tables>>,
    faults: Faults,
    is_offline: bool,
    fail_mark_sent: bool,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_offline(&mut self) {
        self.is_offline = !self.is_offline;
    }

    pub fn toggle_fail_order_items_insert(&mut self) {
        self.faults.fail_order_items_insert = !self.faults.fail_order_items_insert;
    }

    pub fn toggle_fail_outbox_insert(&mut self) {
        self.faults.fail_outbox_insert = !self.faults.fail_outbox_insert;
    }

    pub fn toggle_fail_commit(&mut self) {
        self.faults.fail_commit = !self.faults.fail_commit;
    }

    pub fn toggle_fail_mark_sent(&mut self) {
        self.fail_mark_sent = !self.fail_mark_sent;
    }

    pub async fn orders(&self) -> Vec<Order> {
        self.tables.lock().await.orders.values().cloned().collect()
    }

    pub async fn order_items(&self) -> Vec<OrderItem> {
        self.tables.lock().await.order_items.clone()
    }

    pub async fn outbox_events(&self) -> Vec<OutboxEvent> {
        self.tables.lock().await.outbox.clone()
    }

    fn ensure_online(&self) -> Result<(), PersistenceError> {
        if self.is_offline {
            return Err(PersistenceError::Backend("Database offline".into()));
        }
        Ok(())
    }
}

fn newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl Database for InMemoryDatabase {
    async fn begin(&self) -> Result<Box<dyn OrderTransaction>, PersistenceError> {
        self.ensure_online()?;
        let guard = self.tables.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryTransaction {
            guard,
            staged,
            faults: self.faults,
        }))
    }
}

pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
    faults: Faults,
}

#[async_trait]
impl OrderTransaction for InMemoryTransaction {
    async fn insert_order(&mut self, order: &Order) -> Result<(), PersistenceError> {
        if self.staged.orders.contains_key(&order.id) {
            return Err(PersistenceError::Conflict(format!("order {} already exists", order.id)));
        }
        if self
            .staged
            .orders
            .values()
            .any(|existing| existing.order_number == order.order_number)
        {
            return Err(PersistenceError::Conflict(format!(
                "order number {} already exists",
                order.order_number
            )));
        }
        self.staged.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn insert_order_items(&mut self, items: &[OrderItem]) -> Result<(), PersistenceError> {
        if self.faults.fail_order_items_insert {
            return Err(PersistenceError::Backend("Order items insert failed".into()));
        }
        if let Some(orphan) = items
            .iter()
            .find(|item| !self.staged.orders.contains_key(&item.order_id))
        {
            return Err(PersistenceError::NotFound {
                entity: "order",
                id: orphan.order_id,
            });
        }
        self.staged.order_items.extend_from_slice(items);
        Ok(())
    }

    async fn insert_outbox_event(&mut self, event: &OutboxEvent) -> Result<(), PersistenceError> {
        if self.faults.fail_outbox_insert {
            return Err(PersistenceError::Backend("Outbox insert failed".into()));
        }
        if self.staged.outbox.iter().any(|existing| existing.id == event.id) {
            return Err(PersistenceError::Conflict(format!("outbox event {} already exists", event.id)));
        }
        self.staged.outbox.push(event.clone());
        Ok(())
    }

    async fn lock_order(&mut self, order_id: Uuid) -> Result<Option<Order>, PersistenceError> {
        Ok(self.staged.orders.get(&order_id).cloned())
    }

    async fn update_order_status(
        &mut self,
        order_id: Uuid,
        status: OrderStatus,
        receipt_number: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        let order = self
            .staged
            .orders
            .get_mut(&order_id)
            .ok_or(PersistenceError::NotFound {
                entity: "order",
                id: order_id,
            })?;
        order.status = status;
        if let Some(receipt_number) = receipt_number {
            order.receipt_number = Some(receipt_number.to_string());
        }
        order.updated_at = updated_at;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), PersistenceError> {
        if self.faults.fail_commit {
            return Err(PersistenceError::Backend("Commit failed".into()));
        }
        let InMemoryTransaction { mut guard, staged, .. } = *self;
        *guard = staged;
        Ok(())
    }
}

#[async_trait]
impl OrderQueries for InMemoryDatabase {
    async fn get_by_id(&self, order_id: Uuid) -> anyhow::Result<Option<Order>> {
        self.ensure_online()?;
        Ok(self.tables.lock().await.orders.get(&order_id).cloned())
    }

    async fn items_for_order(&self, order_id: Uuid) -> anyhow::Result<Vec<OrderItem>> {
        self.ensure_online()?;
        Ok(self
            .tables
            .lock()
            .await
            .order_items
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn list_by_user(&self, user_id: Uuid, page: Page) -> anyhow::Result<Vec<Order>> {
        self.ensure_online()?;
        let mut orders: Vec<Order> = self
            .tables
            .lock()
            .await
            .orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut orders);
        Ok(page.apply(&orders))
    }

    async fn list_all(&self, filter: OrderFilter, page: Page) -> anyhow::Result<Vec<Order>> {
        self.ensure_online()?;
        let mut orders: Vec<Order> = self
            .tables
            .lock()
            .await
            .orders
            .values()
            .filter(|order| filter.status.is_none_or(|status| order.status == status))
            .cloned()
            .collect();
        newest_first(&mut orders);
        Ok(page.apply(&orders))
    }
}

#[async_trait]
impl OutboxStore for InMemoryDatabase {
    async fn list_pending(&self, limit: usize) -> Result<Vec<OutboxEvent>, PersistenceError> {
        self.ensure_online()?;
        let mut pending: Vec<OutboxEvent> = self
            .tables
            .lock()
            .await
            .outbox
            .iter()
            .filter(|event| event.status == OutboxStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        pending.truncate(limit);
        Ok(pending)
    }

    async fn mark_sent(&self, event_id: Uuid) -> Result<(), PersistenceError> {
        self.ensure_online()?;
        if self.fail_mark_sent {
            return Err(PersistenceError::Backend("Mark sent failed".into()));
        }
        let mut tables = self.tables.lock().await;
        let event = tables
            .outbox
            .iter_mut()
            .find(|event| event.id == event_id)
            .ok_or(PersistenceError::NotFound {
                entity: "outbox event",
                id: event_id,
            })?;
        event.status = OutboxStatus::Sent;
        event.processed_at = Some(Utc::now());
        Ok(())
    }

    async fn mark_failed(&self, event_id: Uuid, error: &str) -> Result<(), PersistenceError> {
        self.ensure_online()?;
        let mut tables = self.tables.lock().await;
        let event = tables
            .outbox
            .iter_mut()
            .find(|event| event.id == event_id)
            .ok_or(PersistenceError::NotFound {
                entity: "outbox event",
                id: event_id,
            })?;
        event.status = OutboxStatus::Failed;
        event.attempts += 1;
        event.last_error = Some(error.to_string());
        event.processed_at = Some(Utc::now());
        Ok(())
    }

    async fn requeue_failed(&self, max_attempts: i32) -> Result<u64, PersistenceError> {
        self.ensure_online()?;
        let mut tables = self.tables.lock().await;
        let mut requeued = 0;
        for event in tables
            .outbox
            .iter_mut()
            .filter(|event| event.status == OutboxStatus::Failed && event.attempts < max_attempts)
        {
            event.status = OutboxStatus::Pending;
            requeued += 1;
        }
        Ok(requeued)
    }
}
