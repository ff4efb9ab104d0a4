// PostgreSQL implementation of the order storage ports.
//
// Responsibilities
// - Run order, item and outbox writes inside one sqlx transaction.
// - Lock the order row (`FOR UPDATE`) before a status transition is validated.
// - Map unique violations to `PersistenceError::Conflict`.
//
// An sqlx transaction that is dropped without commit is rolled back by the driver.

use crate::modules::orders::core::order::{Order, OrderItem};
use crate::modules::orders::core::outbox_event::{OutboxEvent, OutboxStatus};
use crate::modules::orders::core::ports::{
    Database, OrderFilter, OrderQueries, OrderTransaction, OutboxStore, PersistenceError,
};
use crate::modules::orders::core::status::OrderStatus;
use crate::shared::core::pagination::Page;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, order_number, user_id, status, subtotal, shipping_price, total_price, \
     address_id, address_snapshot, note, receipt_number, placed_at, created_at, updated_at";

const ORDER_ITEM_COLUMNS: &str = "id, order_id, product_id, name, unit_price, quantity, line_total";

const OUTBOX_COLUMNS: &str = "id, aggregate_type, aggregate_id, event_type, payload, status, attempts, \
     last_error, created_at, processed_at";

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                PersistenceError::Conflict(db_err.message().to_string())
            }
            _ => PersistenceError::Backend(err.to_string()),
        }
    }
}

#[derive(FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    user_id: Uuid,
    status: String,
    subtotal: Decimal,
    shipping_price: Decimal,
    total_price: Decimal,
    address_id: Option<Uuid>,
    address_snapshot: Option<serde_json::Value>,
    note: Option<String>,
    receipt_number: Option<String>,
    placed_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = PersistenceError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<OrderStatus>()
            .map_err(|err| PersistenceError::Corrupt(err.to_string()))?;
        Ok(Order {
            id: row.id,
            order_number: row.order_number,
            user_id: row.user_id,
            status,
            subtotal: row.subtotal,
            shipping_price: row.shipping_price,
            total_price: row.total_price,
            address_id: row.address_id,
            address_snapshot: row.address_snapshot,
            note: row.note,
            receipt_number: row.receipt_number,
            placed_at: row.placed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    name: String,
    unit_price: Decimal,
    quantity: i32,
    line_total: Decimal,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = PersistenceError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity)
            .map_err(|_| PersistenceError::Corrupt(format!("negative quantity on order item {}", row.id)))?;
        Ok(OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            name: row.name,
            unit_price: row.unit_price,
            quantity,
            line_total: row.line_total,
        })
    }
}

#[derive(FromRow)]
struct OutboxRow {
    id: Uuid,
    aggregate_type: String,
    aggregate_id: Uuid,
    event_type: String,
    payload: Vec<u8>,
    status: String,
    attempts: i32,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
}

impl TryFrom<OutboxRow> for OutboxEvent {
    type Error = PersistenceError;

    fn try_from(row: OutboxRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<OutboxStatus>()
            .map_err(|err| PersistenceError::Corrupt(err.to_string()))?;
        Ok(OutboxEvent {
            id: row.id,
            aggregate_type: row.aggregate_type,
            aggregate_id: row.aggregate_id,
            event_type: row.event_type,
            payload: row.payload,
            status,
            attempts: row.attempts,
            last_error: row.last_error,
            created_at: row.created_at,
            processed_at: row.processed_at,
        })
    }
}

fn to_orders(rows: Vec<OrderRow>) -> Result<Vec<Order>, PersistenceError> {
    rows.into_iter().map(Order::try_from).collect()
}

fn page_bounds(page: Page) -> (i64, i64) {
    (
        i64::try_from(page.limit).unwrap_or(i64::MAX),
        i64::try_from(page.offset).unwrap_or(i64::MAX),
    )
}

#[derive(Clone)]
pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, PersistenceError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }

    pub async fn migrate(&self) -> Result<(), PersistenceError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|err| PersistenceError::Backend(err.to_string()))
    }
}

#[async_trait]
impl Database for PostgresDatabase {
    async fn begin(&self) -> Result<Box<dyn OrderTransaction>, PersistenceError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresTransaction { tx }))
    }
}

pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl OrderTransaction for PostgresTransaction {
    async fn insert_order(&mut self, order: &Order) -> Result<(), PersistenceError> {
        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        ))
        .bind(order.id)
        .bind(&order.order_number)
        .bind(order.user_id)
        .bind(order.status.as_str())
        .bind(order.subtotal)
        .bind(order.shipping_price)
        .bind(order.total_price)
        .bind(order.address_id)
        .bind(order.address_snapshot.clone())
        .bind(&order.note)
        .bind(&order.receipt_number)
        .bind(order.placed_at)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_order_items(&mut self, items: &[OrderItem]) -> Result<(), PersistenceError> {
        let statement = format!("INSERT INTO order_items ({ORDER_ITEM_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)");
        for item in items {
            let quantity = i32::try_from(item.quantity)
                .map_err(|_| PersistenceError::Conflict(format!("quantity {} out of range", item.quantity)))?;
            sqlx::query(&statement)
                .bind(item.id)
                .bind(item.order_id)
                .bind(item.product_id)
                .bind(&item.name)
                .bind(item.unit_price)
                .bind(quantity)
                .bind(item.line_total)
                .execute(&mut *self.tx)
                .await?;
        }
        Ok(())
    }

    async fn insert_outbox_event(&mut self, event: &OutboxEvent) -> Result<(), PersistenceError> {
        sqlx::query(&format!(
            "INSERT INTO outbox_events ({OUTBOX_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        ))
        .bind(event.id)
        .bind(&event.aggregate_type)
        .bind(event.aggregate_id)
        .bind(&event.event_type)
        .bind(&event.payload)
        .bind(event.status.as_str())
        .bind(event.attempts)
        .bind(&event.last_error)
        .bind(event.created_at)
        .bind(event.processed_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn lock_order(&mut self, order_id: Uuid) -> Result<Option<Order>, PersistenceError> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"))
                .bind(order_id)
                .fetch_optional(&mut *self.tx)
                .await?;
        row.map(Order::try_from).transpose()
    }

    async fn update_order_status(
        &mut self,
        order_id: Uuid,
        status: OrderStatus,
        receipt_number: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        let result = sqlx::query(
            "UPDATE orders SET status = $2, receipt_number = COALESCE($3, receipt_number), updated_at = $4 WHERE id = $1",
        )
        .bind(order_id)
        .bind(status.as_str())
        .bind(receipt_number)
        .bind(updated_at)
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(PersistenceError::NotFound {
                entity: "order",
                id: order_id,
            });
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), PersistenceError> {
        let PostgresTransaction { tx } = *self;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl OrderQueries for PostgresDatabase {
    async fn get_by_id(&self, order_id: Uuid) -> anyhow::Result<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Order::try_from).transpose()?)
    }

    async fn items_for_order(&self, order_id: Uuid) -> anyhow::Result<Vec<OrderItem>> {
        let rows: Vec<OrderItemRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(OrderItem::try_from)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn list_by_user(&self, user_id: Uuid, page: Page) -> anyhow::Result<Vec<Order>> {
        let (limit, offset) = page_bounds(page);
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(to_orders(rows)?)
    }

    async fn list_all(&self, filter: OrderFilter, page: Page) -> anyhow::Result<Vec<Order>> {
        let (limit, offset) = page_bounds(page);
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE ($1::TEXT IS NULL OR status = $1) \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(filter.status.map(|status| status.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(to_orders(rows)?)
    }
}

#[async_trait]
impl OutboxStore for PostgresDatabase {
    async fn list_pending(&self, limit: usize) -> Result<Vec<OutboxEvent>, PersistenceError> {
        let rows: Vec<OutboxRow> = sqlx::query_as(&format!(
            "SELECT {OUTBOX_COLUMNS} FROM outbox_events WHERE status = 'PENDING' ORDER BY created_at, id LIMIT $1"
        ))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(OutboxEvent::try_from).collect()
    }

    async fn mark_sent(&self, event_id: Uuid) -> Result<(), PersistenceError> {
        let result = sqlx::query("UPDATE outbox_events SET status = 'SENT', processed_at = now() WHERE id = $1")
            .bind(event_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(PersistenceError::NotFound {
                entity: "outbox event",
                id: event_id,
            });
        }
        Ok(())
    }

    async fn mark_failed(&self, event_id: Uuid, error: &str) -> Result<(), PersistenceError> {
        let result = sqlx::query(
            "UPDATE outbox_events SET status = 'FAILED', attempts = attempts + 1, last_error = $2, \
             processed_at = now() WHERE id = $1",
        )
        .bind(event_id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(PersistenceError::NotFound {
                entity: "outbox event",
                id: event_id,
            });
        }
        Ok(())
    }

    async fn requeue_failed(&self, max_attempts: i32) -> Result<u64, PersistenceError> {
        let result =
            sqlx::query("UPDATE outbox_events SET status = 'PENDING' WHERE status = 'FAILED' AND attempts < $1")
                .bind(max_attempts)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}
