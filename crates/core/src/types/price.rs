//! VAT arithmetic on decimal prices.
//!
//! Catalog prices are stored excluding tax, with an optional per-product VAT
//! percentage (e.g. `21` for 21%). The tax-inclusive figure is only computed
//! for the search document and at checkout; listings display the base price.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round a monetary amount to two decimal places, half away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Price including VAT.
///
/// Returns `price_ex_vat * (1 + vat_rate / 100)` rounded to two decimals, or
/// `price_ex_vat` unchanged when no rate is set.
///
/// # Example
///
/// ```
/// use brico_core::price_inc_vat;
/// use rust_decimal::Decimal;
///
/// let price = price_inc_vat(Decimal::new(60, 0), Some(Decimal::new(21, 0)));
/// assert_eq!(price, Decimal::new(726, 1));
/// ```
#[must_use]
pub fn price_inc_vat(price_ex_vat: Decimal, vat_rate: Option<Decimal>) -> Decimal {
    match vat_rate {
        None => price_ex_vat,
        Some(rate) => {
            let factor = Decimal::ONE + rate / Decimal::ONE_HUNDRED;
            round_money(price_ex_vat * factor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_inc_vat_with_rate() {
        let price = price_inc_vat(Decimal::new(60, 0), Some(Decimal::new(21, 0)));
        assert_eq!(price, Decimal::new(726, 1));

        let price = price_inc_vat(Decimal::new(20, 0), Some(Decimal::new(21, 0)));
        assert_eq!(price, Decimal::new(242, 1));
    }

    #[test]
    fn test_price_inc_vat_without_rate_is_unchanged() {
        let base = Decimal::new(1999, 2);
        assert_eq!(price_inc_vat(base, None), base);
    }

    #[test]
    fn test_price_inc_vat_rounds_to_cents() {
        // 9.99 * 1.21 = 12.0879
        let price = price_inc_vat(Decimal::new(999, 2), Some(Decimal::new(21, 0)));
        assert_eq!(price, Decimal::new(1209, 2));

        // 0.125 rounds half away from zero
        assert_eq!(round_money(Decimal::new(125, 3)), Decimal::new(13, 2));
    }

    #[test]
    fn test_price_inc_vat_fractional_rate() {
        // 100 * 1.055 = 105.5
        let price = price_inc_vat(Decimal::new(100, 0), Some(Decimal::new(55, 1)));
        assert_eq!(price, Decimal::new(1055, 1));
    }
}
