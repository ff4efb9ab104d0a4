use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modules::orders::core::status::OrderStatus;

const ORDER_NUMBER_PREFIX: &str = "ORD";
const ORDER_NUMBER_SUFFIX_LEN: usize = 6;
const ORDER_NUMBER_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub shipping_price: Decimal,
    pub total_price: Decimal,
    pub address_id: Option<Uuid>,
    /// Copy of the address as it was at checkout; later edits to the address book do not touch it.
    pub address_snapshot: Option<serde_json::Value>,
    pub note: Option<String>,
    pub receipt_number: Option<String>,
    pub placed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Line item with name and prices frozen at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// `ORD` + UTC timestamp to the millisecond + random uppercase suffix.
///
/// Numbers sort by creation time; the suffix keeps collisions within the same
/// millisecond unlikely. Uniqueness itself is enforced by the order store.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ORDER_NUMBER_SUFFIX_LEN)
        .map(|_| char::from(ORDER_NUMBER_CHARSET[rng.gen_range(0..ORDER_NUMBER_CHARSET.len())]))
        .collect();
    format!("{ORDER_NUMBER_PREFIX}{}{suffix}", now.format("%Y%m%d%H%M%S%3f"))
}

#[cfg(test)]
mod order_tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;
    use std::collections::HashSet;

    #[rstest]
    fn it_should_format_the_order_number() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 5, 7).unwrap() + Duration::milliseconds(42);
        let number = generate_order_number(now);
        assert!(number.starts_with("ORD20260301090507042"), "{number}");
        assert_eq!(number.len(), 3 + 17 + 6);
        assert!(number[20..].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[rstest]
    fn it_should_sort_order_numbers_by_creation_time() {
        let earlier = Utc.with_ymd_and_hms(2026, 3, 1, 9, 5, 7).unwrap();
        let later = earlier + Duration::milliseconds(1);
        assert!(generate_order_number(earlier) < generate_order_number(later));
    }

    #[rstest]
    fn it_should_draw_digits_about_as_often_as_any_letter() {
        let now = Utc::now();
        let suffixes: String = (0..2000).map(|_| generate_order_number(now)[20..].to_string()).collect();
        let digits = suffixes.chars().filter(char::is_ascii_digit).count();
        // 12000 symbols, 10 of 36 are digits: expect about 3333.
        assert!((2800..3900).contains(&digits), "{digits} digits");
    }

    #[rstest]
    fn it_should_not_collide_within_the_same_millisecond() {
        let now = Utc::now();
        let numbers: HashSet<String> = (0..200).map(|_| generate_order_number(now)).collect();
        assert_eq!(numbers.len(), 200);
    }
}
