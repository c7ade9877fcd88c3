//! Applied price derivation.
//!
//! A discount larger than the price is not an error: the applied price is clamped at
//! zero. Money is held at two decimal places and below `MAX_MONEY`, the range of the
//! `NUMERIC(14, 2)` columns; `validate_price` and `validate_discount` round and bound
//! their input so every store returns what the core computed.

use super::{
    error::CatalogError,
    model::{Discount, DiscountType},
};
use rust_decimal::{Decimal, RoundingStrategy};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Decimal places kept for every money value.
pub const MONEY_SCALE: u32 = 2;

/// Largest amount a money column holds: `999_999_999_999.99`.
pub const MAX_MONEY: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// Rounds to `MONEY_SCALE` places, half away from zero as PostgreSQL does.
#[must_use]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Returns the sellable price for `price` after `discount`, never below zero.
///
/// # Errors
/// Returns `Validation` when the computation overflows.
pub fn applied_price(price: Decimal, discount: Option<&Discount>) -> Result<Decimal, CatalogError> {
    let discounted = match discount {
        None => Some(price),
        Some(Discount {
            amount,
            kind: DiscountType::Percentage,
        }) => price
            .checked_mul(*amount)
            .and_then(|cut| cut.checked_div(HUNDRED))
            .and_then(|cut| price.checked_sub(cut)),
        Some(Discount {
            amount,
            kind: DiscountType::Fixed,
        }) => price.checked_sub(*amount),
    };
    let discounted =
        discounted.ok_or_else(|| CatalogError::validation("Price or discount is too large"))?;
    Ok(round_money(discounted.max(Decimal::ZERO)))
}

fn bounded(value: Decimal, field: &str) -> Result<Decimal, CatalogError> {
    if value < Decimal::ZERO {
        return Err(CatalogError::validation(format!("{field} must not be negative")));
    }
    let value = round_money(value);
    if value > MAX_MONEY {
        return Err(CatalogError::validation(format!(
            "{field} must not exceed {MAX_MONEY}"
        )));
    }
    Ok(value)
}

/// Rounds the price to `MONEY_SCALE` places.
///
/// # Errors
/// Returns `Validation` when the price is negative or above `MAX_MONEY`.
pub fn validate_price(price: Decimal) -> Result<Decimal, CatalogError> {
    bounded(price, "Price")
}

/// Rounds the discount amount to `MONEY_SCALE` places.
///
/// # Errors
/// Returns `Validation` when the amount is negative or above `MAX_MONEY`.
pub fn validate_discount(discount: Discount) -> Result<Discount, CatalogError> {
    Ok(Discount {
        amount: bounded(discount.amount, "Discount amount")?,
        kind: discount.kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(value: i64) -> Decimal {
        Decimal::from(value)
    }

    fn money(text: &str) -> Decimal {
        Decimal::from_str(text).unwrap_or_default()
    }

    fn price_of(price: Decimal, discount: Option<&Discount>) -> Decimal {
        match applied_price(price, discount) {
            Ok(value) => value,
            Err(err) => panic!("applied_price failed: {err}"),
        }
    }

    fn percentage(amount: i64) -> Discount {
        Discount {
            amount: dec(amount),
            kind: DiscountType::Percentage,
        }
    }

    fn fixed(amount: i64) -> Discount {
        Discount {
            amount: dec(amount),
            kind: DiscountType::Fixed,
        }
    }

    #[test]
    fn percentage_discount() {
        assert_eq!(price_of(dec(100), Some(&percentage(10))), dec(90));
    }

    #[test]
    fn fixed_discount() {
        assert_eq!(price_of(dec(100), Some(&fixed(30))), dec(70));
    }

    #[test]
    fn no_discount_keeps_price() {
        assert_eq!(price_of(dec(100), None), dec(100));
    }

    #[test]
    fn discount_above_price_clamps_to_zero() {
        assert_eq!(price_of(dec(100), Some(&fixed(150))), Decimal::ZERO);
        assert_eq!(price_of(dec(100), Some(&percentage(250))), Decimal::ZERO);
    }

    #[test]
    fn fractional_percentage() {
        let discount = Discount {
            amount: Decimal::new(125, 1),
            kind: DiscountType::Percentage,
        };
        assert_eq!(price_of(dec(80), Some(&discount)), dec(70));
    }

    #[test]
    fn applied_price_is_rounded_to_cents() {
        let discount = Discount {
            amount: money("12.5"),
            kind: DiscountType::Percentage,
        };
        let applied = price_of(money("99.99"), Some(&discount));
        assert_eq!(applied, money("87.49"));
        assert_eq!(applied.scale(), MONEY_SCALE);
        assert_eq!(round_money(money("0.125")), money("0.13"));
    }

    #[test]
    fn overflow_is_a_validation_error() {
        for discount in [percentage(10), percentage(100)] {
            let result = applied_price(Decimal::MAX, Some(&discount));
            assert!(matches!(result, Err(CatalogError::Validation(_))), "{discount:?}");
        }
        let fixed_min = applied_price(Decimal::MIN, Some(&fixed(1)));
        assert!(matches!(fixed_min, Err(CatalogError::Validation(_))));
    }

    #[test]
    fn bounded_inputs_never_overflow() {
        let discount = Discount {
            amount: MAX_MONEY,
            kind: DiscountType::Percentage,
        };
        assert_eq!(price_of(MAX_MONEY, Some(&discount)), Decimal::ZERO);
        assert_eq!(price_of(MAX_MONEY, None), MAX_MONEY);
    }

    #[test]
    fn monotonic_in_discount_amount_and_non_negative() {
        for price in [0, 1, 99, 100, 20_000] {
            for kind in [DiscountType::Percentage, DiscountType::Fixed] {
                let mut previous = price_of(dec(price), None);
                for amount in 0..=300 {
                    let discount = Discount {
                        amount: dec(amount),
                        kind,
                    };
                    let current = price_of(dec(price), Some(&discount));
                    assert!(current <= previous, "{price} {kind:?} {amount}");
                    assert!(current >= Decimal::ZERO);
                    previous = current;
                }
            }
        }
    }

    #[test]
    fn rejects_negative_inputs() {
        assert!(validate_price(dec(-1)).is_err());
        assert!(validate_price(Decimal::ZERO).is_ok());
        assert!(validate_discount(fixed(-5)).is_err());
        assert!(validate_discount(percentage(0)).is_ok());
    }

    #[test]
    fn rejects_amounts_beyond_column_range() {
        assert_eq!(MAX_MONEY, money("999999999999.99"));
        assert!(matches!(validate_price(MAX_MONEY), Ok(p) if p == MAX_MONEY));
        assert!(matches!(
            validate_price(money("1000000000000")),
            Err(CatalogError::Validation(_))
        ));
        assert!(matches!(
            validate_price(Decimal::MAX),
            Err(CatalogError::Validation(_))
        ));
        assert!(matches!(
            validate_discount(Discount {
                amount: Decimal::MAX,
                kind: DiscountType::Fixed,
            }),
            Err(CatalogError::Validation(_))
        ));
    }

    #[test]
    fn validation_rounds_to_cents() {
        assert!(matches!(validate_price(money("10.005")), Ok(p) if p == money("10.01")));
        let discount = validate_discount(Discount {
            amount: money("2.499"),
            kind: DiscountType::Fixed,
        });
        assert!(matches!(discount, Ok(d) if d.amount == money("2.50")));
    }
}
