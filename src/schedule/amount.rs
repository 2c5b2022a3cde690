use rust_decimal::Decimal;

use crate::decimal::Money;
use crate::errors::{Result, ScheduleError};
use crate::rules::AmountSpec;
use crate::types::AmountType;

/// amount owed for one milestone
///
/// no rounding beyond the money type's internal precision; display rounding
/// belongs to invoicing. a percentage too large to represent is a
/// configuration error
pub fn compute_amount(
    amount_type: AmountType,
    amount: Decimal,
    total_booking_amount: Money,
) -> Result<Money> {
    match amount_type {
        AmountType::Percentage => {
            total_booking_amount.checked_percentage(amount).ok_or_else(|| {
                ScheduleError::configuration(format!(
                    "{}% of {} is out of range",
                    amount, total_booking_amount
                ))
            })
        }
        AmountType::Fixed => Ok(Money::from_decimal(amount)),
    }
}

/// `compute_amount` for a configured amount spec
pub fn amount_for(spec: &AmountSpec, total_booking_amount: Money) -> Result<Money> {
    compute_amount(spec.amount_type, spec.amount, total_booking_amount)
}
