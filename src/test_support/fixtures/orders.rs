// Shared test fixtures for orders, their items and outbox rows.

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::modules::orders::adapters::outbound::orders_in_memory::InMemoryDatabase;
use crate::modules::orders::core::order::{Order, OrderItem, generate_order_number};
use crate::modules::orders::core::outbox_event::{
    AGGREGATE_ORDER, DeleteCartPayload, EVENT_DELETE_CART, OutboxEvent,
};
use crate::modules::orders::core::ports::Database;
use crate::modules::orders::core::status::OrderStatus;

/// A pending order of 49.90 with no shipping cost.
pub fn make_order(user_id: Uuid) -> Order {
    let now = Utc::now();
    Order {
        id: Uuid::now_v7(),
        order_number: generate_order_number(now),
        user_id,
        status: OrderStatus::Pending,
        subtotal: Decimal::new(4990, 2),
        shipping_price: Decimal::new(0, 2),
        total_price: Decimal::new(4990, 2),
        address_id: None,
        address_snapshot: None,
        note: None,
        receipt_number: None,
        placed_at: now,
        created_at: now,
        updated_at: now,
    }
}

pub fn make_order_item(order_id: Uuid) -> OrderItem {
    OrderItem {
        id: Uuid::now_v7(),
        order_id,
        product_id: Uuid::now_v7(),
        name: "Stoneware mug".into(),
        unit_price: Decimal::new(2495, 2),
        quantity: 2,
        line_total: Decimal::new(4990, 2),
    }
}

pub fn make_outbox_event(order_id: Uuid) -> OutboxEvent {
    let payload = DeleteCartPayload {
        user_id: Uuid::now_v7(),
        order_id,
    }
    .to_bytes()
    .unwrap();
    OutboxEvent::pending(AGGREGATE_ORDER, order_id, EVENT_DELETE_CART, payload, Utc::now())
}

/// Commit a single order straight into the store.
pub async fn seed_order(db: &InMemoryDatabase, order: &Order) {
    let mut tx = db.begin().await.unwrap();
    tx.insert_order(order).await.unwrap();
    tx.commit().await.unwrap();
}
