pub mod carts;
pub mod inventory;
pub mod orders;
pub mod payments;

pub use carts::CartService;
pub use inventory::InventoryService;
pub use orders::OrderService;
pub use payments::PaymentService;

use rust_decimal::Decimal;

/// Tax on a subtotal at the configured rate, rounded to 2 decimal places.
pub(crate) fn compute_tax(subtotal: Decimal, tax_rate: f64) -> Decimal {
    let rate = Decimal::from_f64_retain(tax_rate).unwrap_or(Decimal::ZERO);
    (subtotal * rate).round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn tax_is_rounded_to_two_decimals() {
        assert_eq!(compute_tax(dec!(50.00), 0.18), dec!(9.00));
        assert_eq!(compute_tax(dec!(100.00), 0.18), dec!(18.00));
        assert_eq!(compute_tax(dec!(33.33), 0.18), dec!(6.00));
        assert_eq!(compute_tax(dec!(0.00), 0.18), dec!(0.00));
    }

    #[test]
    fn zero_rate_produces_zero_tax() {
        assert_eq!(compute_tax(dec!(99.99), 0.0), dec!(0.00));
    }
}
