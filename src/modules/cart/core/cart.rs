use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::shared::core::money;

/// One cart line with the name and price captured when the product was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub price: Decimal,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal {
        money::line_total(money::normalize(self.price), self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub user_id: Uuid,
    pub items: Vec<CartLine>,
}

impl CartSnapshot {
    pub fn empty(user_id: Uuid) -> Self {
        Self {
            user_id,
            items: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn subtotal(&self) -> Decimal {
        money::normalize(self.items.iter().map(CartLine::line_total).sum())
    }
}

#[derive(Debug, Error)]
pub enum CartError {
    #[error("product {0} not found")]
    ProductNotFound(Uuid),

    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("backend error: {0}")]
    Backend(String),
}

#[cfg(test)]
mod cart_snapshot_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn it_should_sum_line_totals_into_the_subtotal() {
        let snapshot = CartSnapshot {
            user_id: Uuid::now_v7(),
            items: vec![
                CartLine {
                    product_id: Uuid::now_v7(),
                    name: "Mug".into(),
                    quantity: 2,
                    price: Decimal::new(5000, 0),
                },
                CartLine {
                    product_id: Uuid::now_v7(),
                    name: "Sticker".into(),
                    quantity: 3,
                    price: Decimal::new(10, 2),
                },
            ],
        };
        assert_eq!(snapshot.subtotal().to_string(), "10000.30");
    }

    #[rstest]
    fn it_should_report_an_empty_cart() {
        let snapshot = CartSnapshot::empty(Uuid::now_v7());
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.subtotal().to_string(), "0.00");
    }
}
