use rust_decimal::{Decimal, RoundingStrategy};

/// Number of fractional digits a stored price carries.
pub const PRICE_SCALE: u32 = 2;

/// Price of a subscription: the service's full price less the plan discount.
///
/// Computed in decimal arithmetic and rounded half-up to [`PRICE_SCALE`]
/// digits. `discount_percent` is expected in `0..=100`; anything above is
/// clamped to a free subscription.
pub fn calculate_price(full_price: u32, discount_percent: u32) -> Decimal {
    let full_price = Decimal::from(full_price);
    let discount_percent = Decimal::from(discount_percent.min(100));
    let discount = full_price * discount_percent / Decimal::ONE_HUNDRED;

    (full_price - discount)
        .round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}
