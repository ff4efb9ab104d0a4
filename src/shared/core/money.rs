// Monetary values are exact decimals at two fractional digits. Nothing in the
// order path goes through floating point.

use rust_decimal::{Decimal, RoundingStrategy};

pub const MONEY_SCALE: u32 = 2;

/// Round half away from zero to cents and pin the scale so `10000` renders as `10000.00`.
pub fn normalize(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

pub fn line_total(unit_price: Decimal, quantity: u32) -> Decimal {
    normalize(unit_price * Decimal::from(quantity))
}
