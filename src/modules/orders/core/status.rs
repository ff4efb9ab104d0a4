// Order status machine.
//
// Every status change goes through `decide_transition`; callers never write a status
// that did not come out of it.
//
//   PENDING -> CANCELLED                 customer (owner)
//   PENDING -> PAID                      payment gateway
//   PAID -> PROCESSING                   admin
//   PROCESSING -> SHIPPED                admin, receipt number required
//   SHIPPED -> DELIVERED                 admin
//   SHIPPED | DELIVERED -> COMPLETED     customer (owner)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Paid => "PAID",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown order status: {0}")]
pub struct UnknownOrderStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownOrderStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| UnknownOrderStatus(value.to_string()))
    }
}

/// Who is asking for the status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Customer(Uuid),
    Admin,
    PaymentGateway,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("order does not belong to the current user")]
    Unauthorized,

    #[error("order can only be cancelled while pending, current status is {0}")]
    CannotCancel(OrderStatus),

    #[error("cannot move order from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("a receipt number is required to ship an order")]
    ReceiptRequired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub receipt_number: Option<String>,
}

pub fn decide_transition(
    owner_id: Uuid,
    current: OrderStatus,
    actor: Actor,
    target: OrderStatus,
    receipt_number: Option<&str>,
) -> Result<Transition, TransitionError> {
    use OrderStatus::*;

    let invalid = TransitionError::InvalidStatusTransition {
        from: current,
        to: target,
    };
    let accept = |receipt_number: Option<String>| Transition {
        from: current,
        to: target,
        receipt_number,
    };

    match actor {
        Actor::Customer(user_id) => {
            if user_id != owner_id {
                return Err(TransitionError::Unauthorized);
            }
            match (current, target) {
                (Pending, Cancelled) => Ok(accept(None)),
                (_, Cancelled) => Err(TransitionError::CannotCancel(current)),
                (Shipped | Delivered, Completed) => Ok(accept(None)),
                _ => Err(invalid),
            }
        }
        Actor::Admin => match (current, target) {
            (Paid, Processing) | (Shipped, Delivered) => Ok(accept(None)),
            (Processing, Shipped) => receipt_number
                .map(str::trim)
                .filter(|receipt| !receipt.is_empty())
                .map(|receipt| accept(Some(receipt.to_string())))
                .ok_or(TransitionError::ReceiptRequired),
            _ => Err(invalid),
        },
        Actor::PaymentGateway => match (current, target) {
            (Pending, Paid) => Ok(accept(None)),
            _ => Err(invalid),
        },
    }
}
