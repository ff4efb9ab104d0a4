// Pure decision function for checkout.
//
// Purpose
// - Turn a cart snapshot into the rows a checkout writes: one order, its items and
//   exactly one DELETE_CART outbox event.
//
// Responsibilities
// - Reject an empty cart.
// - Price every line from the cart snapshot, never from the live catalog.
// - total = subtotal + shipping, all at two decimals.
// - Never perform input or output.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::modules::addresses::core::address::Address;
use crate::modules::cart::core::cart::CartSnapshot;
use crate::modules::orders::core::order::{Order, OrderItem};
use crate::modules::orders::core::outbox_event::{
    AGGREGATE_ORDER, DeleteCartPayload, EVENT_DELETE_CART, OutboxEvent,
};
use crate::modules::orders::core::status::OrderStatus;
use crate::shared::core::money;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecideError {
    #[error("cart is empty")]
    CartEmpty,

    #[error("could not serialize {0}")]
    Serialization(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub outbox_event: OutboxEvent,
}

pub struct CheckoutInput<'a> {
    pub cart: &'a CartSnapshot,
    pub address: Option<&'a Address>,
    pub note: Option<String>,
    pub shipping_price: Decimal,
    pub order_number: String,
    pub now: DateTime<Utc>,
}

pub fn decide_checkout(input: CheckoutInput<'_>) -> Result<PlacedOrder, DecideError> {
    let CheckoutInput {
        cart,
        address,
        note,
        shipping_price,
        order_number,
        now,
    } = input;

    if cart.is_empty() {
        return Err(DecideError::CartEmpty);
    }

    let order_id = Uuid::now_v7();
    let items: Vec<OrderItem> = cart
        .items
        .iter()
        .map(|line| {
            let unit_price = money::normalize(line.price);
            OrderItem {
                id: Uuid::now_v7(),
                order_id,
                product_id: line.product_id,
                name: line.name.clone(),
                unit_price,
                quantity: line.quantity,
                line_total: money::line_total(unit_price, line.quantity),
            }
        })
        .collect();

    let subtotal = money::normalize(items.iter().map(|item| item.line_total).sum());
    let shipping_price = money::normalize(shipping_price);
    let total_price = money::normalize(subtotal + shipping_price);

    let address_snapshot = address
        .map(serde_json::to_value)
        .transpose()
        .map_err(|err| DecideError::Serialization(format!("address snapshot: {err}")))?;

    let payload = DeleteCartPayload {
        user_id: cart.user_id,
        order_id,
    }
    .to_bytes()
    .map_err(|err| DecideError::Serialization(format!("outbox payload: {err}")))?;

    let order = Order {
        id: order_id,
        order_number,
        user_id: cart.user_id,
        status: OrderStatus::Pending,
        subtotal,
        shipping_price,
        total_price,
        address_id: address.map(|address| address.id),
        address_snapshot,
        note: note
            .map(|note| note.trim().to_string())
            .filter(|note| !note.is_empty()),
        receipt_number: None,
        placed_at: now,
        created_at: now,
        updated_at: now,
    };
    let outbox_event = OutboxEvent::pending(AGGREGATE_ORDER, order_id, EVENT_DELETE_CART, payload, now);

    Ok(PlacedOrder {
        order,
        items,
        outbox_event,
    })
}

#[cfg(test)]
mod checkout_decide_tests {
    use super::*;
    use crate::modules::cart::core::cart::CartLine;
    use crate::test_support::fixtures::addresses::make_address;
    use rstest::{fixture, rstest};

    #[fixture]
    fn cart() -> CartSnapshot {
        CartSnapshot {
            user_id: Uuid::now_v7(),
            items: vec![CartLine {
                product_id: Uuid::now_v7(),
                name: "Product A".into(),
                quantity: 2,
                price: Decimal::from(5000),
            }],
        }
    }

    fn input(cart: &CartSnapshot) -> CheckoutInput<'_> {
        CheckoutInput {
            cart,
            address: None,
            note: None,
            shipping_price: Decimal::ZERO,
            order_number: "ORD20260101000000000ABCDEF".into(),
            now: Utc::now(),
        }
    }

    #[rstest]
    fn it_should_decide_to_place_the_order(cart: CartSnapshot) {
        let placed = decide_checkout(input(&cart)).unwrap();

        assert_eq!(placed.order.status, OrderStatus::Pending);
        assert_eq!(placed.order.user_id, cart.user_id);
        assert_eq!(placed.order.subtotal.to_string(), "10000.00");
        assert_eq!(placed.order.shipping_price.to_string(), "0.00");
        assert_eq!(placed.order.total_price.to_string(), "10000.00");
        assert_eq!(placed.items.len(), 1);
        assert_eq!(placed.items[0].order_id, placed.order.id);
        assert_eq!(placed.items[0].unit_price.to_string(), "5000.00");
        assert_eq!(placed.items[0].line_total.to_string(), "10000.00");
    }

    #[rstest]
    fn it_should_enqueue_exactly_one_delete_cart_event(cart: CartSnapshot) {
        let placed = decide_checkout(input(&cart)).unwrap();
        let event = placed.outbox_event;

        assert_eq!(event.aggregate_type, AGGREGATE_ORDER);
        assert_eq!(event.aggregate_id, placed.order.id);
        assert_eq!(event.event_type, EVENT_DELETE_CART);
        assert_eq!(
            DeleteCartPayload::from_bytes(&event.payload).unwrap(),
            DeleteCartPayload {
                user_id: cart.user_id,
                order_id: placed.order.id
            }
        );
    }

    #[rstest]
    fn it_should_price_lines_from_the_rounded_unit_price() {
        let cart = CartSnapshot {
            user_id: Uuid::now_v7(),
            items: vec![CartLine {
                product_id: Uuid::now_v7(),
                name: "Product B".into(),
                quantity: 2,
                price: "1.005".parse().unwrap(),
            }],
        };
        let placed = decide_checkout(input(&cart)).unwrap();
        let item = &placed.items[0];

        assert_eq!(item.unit_price.to_string(), "1.01");
        assert_eq!(item.line_total.to_string(), "2.02");
        assert_eq!(item.line_total, item.unit_price * Decimal::from(item.quantity));
        assert_eq!(placed.order.subtotal.to_string(), "2.02");
    }

    #[rstest]
    fn it_should_decide_that_the_cart_is_empty() {
        let empty = CartSnapshot::empty(Uuid::now_v7());
        assert_eq!(decide_checkout(input(&empty)), Err(DecideError::CartEmpty));
    }

    #[rstest]
    fn it_should_add_the_shipping_price_to_the_total(cart: CartSnapshot) {
        let placed = decide_checkout(CheckoutInput {
            shipping_price: Decimal::new(1550, 2),
            ..input(&cart)
        })
        .unwrap();
        assert_eq!(placed.order.total_price.to_string(), "10015.50");
        assert_eq!(placed.order.total_price, placed.order.subtotal + placed.order.shipping_price);
    }

    #[rstest]
    fn it_should_snapshot_the_address_and_trim_the_note(cart: CartSnapshot) {
        let address = make_address(cart.user_id);
        let placed = decide_checkout(CheckoutInput {
            address: Some(&address),
            note: Some("  leave at the door ".into()),
            ..input(&cart)
        })
        .unwrap();

        assert_eq!(placed.order.address_id, Some(address.id));
        assert_eq!(
            placed.order.address_snapshot,
            Some(serde_json::to_value(&address).unwrap())
        );
        assert_eq!(placed.order.note.as_deref(), Some("leave at the door"));
    }

    #[rstest]
    fn it_should_drop_a_blank_note(cart: CartSnapshot) {
        let placed = decide_checkout(CheckoutInput {
            note: Some("   ".into()),
            ..input(&cart)
        })
        .unwrap();
        assert_eq!(placed.order.note, None);
    }
}
