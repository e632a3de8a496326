//! Quote total computation.
//!
//! ```text
//! line_total = round2(quantity × unit_price)
//! subtotal   = Σ line_total
//! tax        = round2(subtotal × TAX_RATE)
//! total      = subtotal + tax − discount
//! ```

use rust_decimal::Decimal;

use crate::Money;

/// Sales tax applied to every quote (21%).
pub const TAX_RATE: Decimal = Decimal::from_parts(21, 0, 0, false, 2);

/// Errors raised for inputs that cannot produce a valid quote.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    #[error("item {index}: quantity must be at least 1")]
    ZeroQuantity { index: usize },
    #[error("item {index}: unit price cannot be negative")]
    NegativeUnitPrice { index: usize },
    #[error("discount cannot be negative")]
    NegativeDiscount,
    #[error("discount {discount} exceeds quote value {gross}")]
    DiscountExceedsTotal { discount: Money, gross: Money },
    #[error("quote amounts exceed {max}")]
    Overflow { max: Money },
}

/// One priced quote line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInput {
    pub quantity: u32,
    pub unit_price: Money,
}

impl LineInput {
    #[must_use]
    pub const fn new(quantity: u32, unit_price: Money) -> Self {
        Self {
            quantity,
            unit_price,
        }
    }
}

/// Computed totals for a quote, in the same order as the input lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteTotals {
    pub line_totals: Vec<Money>,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub discount_amount: Money,
    pub total_amount: Money,
}

/// Compute line, subtotal, tax and grand totals for a quote.
///
/// An empty item list is valid and yields all-zero totals.
///
/// # Errors
///
/// Returns [`PricingError`] when a quantity is zero, a unit price or the
/// discount is negative, the discount exceeds `subtotal + tax`, or any
/// amount would not fit a stored money column ([`Money::MAX`]).
pub fn compute_totals(items: &[LineInput], discount: Money) -> Result<QuoteTotals, PricingError> {
    if discount.is_negative() {
        return Err(PricingError::NegativeDiscount);
    }

    let mut line_totals = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        if item.quantity == 0 {
            return Err(PricingError::ZeroQuantity { index });
        }
        if item.unit_price.is_negative() {
            return Err(PricingError::NegativeUnitPrice { index });
        }
        line_totals.push(storable(item.unit_price.checked_times(item.quantity))?);
    }

    let subtotal = line_totals
        .iter()
        .try_fold(Money::ZERO, |sum, line| storable(sum.checked_add(*line)))?;
    let tax_amount = storable(subtotal.checked_scale_by(TAX_RATE))?;
    let gross = storable(subtotal.checked_add(tax_amount))?;

    if discount > gross {
        return Err(PricingError::DiscountExceedsTotal { discount, gross });
    }

    Ok(QuoteTotals {
        line_totals,
        subtotal,
        tax_amount,
        discount_amount: discount,
        total_amount: storable(gross.checked_sub(discount))?,
    })
}

fn storable(amount: Option<Money>) -> Result<Money, PricingError> {
    amount
        .filter(Money::is_storable)
        .ok_or(PricingError::Overflow { max: Money::MAX })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn money(s: &str) -> Money {
        Money::new(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_reference_example() {
        let items = [
            LineInput::new(2, money("10.00")),
            LineInput::new(1, money("5.00")),
        ];
        let totals = compute_totals(&items, Money::ZERO).unwrap();

        assert_eq!(totals.line_totals, vec![money("20.00"), money("5.00")]);
        assert_eq!(totals.subtotal.to_string(), "25.00");
        assert_eq!(totals.tax_amount.to_string(), "5.25");
        assert_eq!(totals.discount_amount.to_string(), "0.00");
        assert_eq!(totals.total_amount.to_string(), "30.25");
    }

    #[test]
    fn test_recomputation_is_identical() {
        let items = [
            LineInput::new(4, money("89.95")),
            LineInput::new(1, money("19.99")),
        ];
        let first = compute_totals(&items, money("12.50")).unwrap();
        let second = compute_totals(&items, money("12.50")).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.total_amount.to_string(), second.total_amount.to_string());
    }

    #[test]
    fn test_tax_rounds_half_away_from_zero() {
        // 0.50 × 0.21 = 0.105
        let totals = compute_totals(&[LineInput::new(1, money("0.50"))], Money::ZERO).unwrap();
        assert_eq!(totals.tax_amount.to_string(), "0.11");
        assert_eq!(totals.total_amount.to_string(), "0.61");
    }

    #[test]
    fn test_discount_is_subtracted_after_tax() {
        let totals =
            compute_totals(&[LineInput::new(1, money("100.00"))], money("21.00")).unwrap();
        assert_eq!(totals.subtotal.to_string(), "100.00");
        assert_eq!(totals.tax_amount.to_string(), "21.00");
        assert_eq!(totals.total_amount.to_string(), "100.00");
    }

    #[test]
    fn test_empty_quote_is_zero() {
        let totals = compute_totals(&[], Money::ZERO).unwrap();
        assert!(totals.line_totals.is_empty());
        assert_eq!(totals.total_amount, Money::ZERO);
    }

    #[test]
    fn test_rejects_invalid_inputs() {
        assert_eq!(
            compute_totals(&[LineInput::new(0, money("1"))], Money::ZERO),
            Err(PricingError::ZeroQuantity { index: 0 })
        );
        assert_eq!(
            compute_totals(
                &[LineInput::new(1, money("1")), LineInput::new(1, money("-1"))],
                Money::ZERO
            ),
            Err(PricingError::NegativeUnitPrice { index: 1 })
        );
        assert_eq!(
            compute_totals(&[], money("-0.01")),
            Err(PricingError::NegativeDiscount)
        );
        assert!(matches!(
            compute_totals(&[LineInput::new(1, money("10.00"))], money("12.11")),
            Err(PricingError::DiscountExceedsTotal { .. })
        ));
    }

    #[test]
    fn test_amounts_beyond_storage_are_rejected() {
        let overflow: Result<QuoteTotals, PricingError> =
            Err(PricingError::Overflow { max: Money::MAX });
        assert_eq!(
            compute_totals(&[LineInput::new(2, money("70000000000000000000000000000"))], Money::ZERO),
            overflow
        );
        // Each line fits, the subtotal does not.
        assert_eq!(
            compute_totals(
                &[
                    LineInput::new(1, money("6000000000.00")),
                    LineInput::new(1, money("6000000000.00")),
                ],
                Money::ZERO
            ),
            overflow
        );
        // Subtotal fits, subtotal plus tax does not.
        assert_eq!(
            compute_totals(&[LineInput::new(1, money("9000000000.00"))], Money::ZERO),
            overflow
        );
        assert!(compute_totals(&[LineInput::new(1, money("8000000000.00"))], Money::ZERO).is_ok());
    }

    #[test]
    fn test_discount_may_equal_gross() {
        let totals = compute_totals(&[LineInput::new(1, money("10.00"))], money("12.10")).unwrap();
        assert_eq!(totals.total_amount.to_string(), "0.00");
    }
}
