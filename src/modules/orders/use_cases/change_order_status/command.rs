use uuid::Uuid;

use crate::modules::orders::core::status::{Actor, OrderStatus};

/// Request to move one order to `target` on behalf of `actor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeOrderStatus {
    pub order_id: Uuid,
    pub actor: Actor,
    pub target: OrderStatus,
    pub receipt_number: Option<String>,
}

impl ChangeOrderStatus {
    pub fn cancel(order_id: Uuid, user_id: Uuid) -> Self {
        Self {
            order_id,
            actor: Actor::Customer(user_id),
            target: OrderStatus::Cancelled,
            receipt_number: None,
        }
    }

    pub fn complete(order_id: Uuid, user_id: Uuid) -> Self {
        Self {
            order_id,
            actor: Actor::Customer(user_id),
            target: OrderStatus::Completed,
            receipt_number: None,
        }
    }

    pub fn admin_update(order_id: Uuid, target: OrderStatus, receipt_number: Option<String>) -> Self {
        Self {
            order_id,
            actor: Actor::Admin,
            target,
            receipt_number,
        }
    }

    pub fn confirm_payment(order_id: Uuid) -> Self {
        Self {
            order_id,
            actor: Actor::PaymentGateway,
            target: OrderStatus::Paid,
            receipt_number: None,
        }
    }
}
