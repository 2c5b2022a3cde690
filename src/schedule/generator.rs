use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, error, info};

use crate::decimal::Money;
use crate::errors::{Result, ScheduleError};
use crate::milestone::{Booking, PaymentScheduleMilestone};
use crate::rules::{PaymentPolicy, PaymentRule, RuleResolver};
use crate::schedule::amount::amount_for;
use crate::schedule::due_date::due_date_for;
use crate::store::{MilestoneStore, RuleStore};

pub const DEPOSIT_NAME: &str = "Deposit";
pub const BALANCE_NAME: &str = "Balance";

/// milestones produced for a booking and the rule they came from
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSchedule {
    /// `None` when no rule applied to the room
    pub rule: Option<PaymentRule>,
    pub milestones: Vec<PaymentScheduleMilestone>,
}

/// turns a booking and its room's payment rule into persisted milestones
pub struct ScheduleGenerator<'a, S: RuleStore + MilestoneStore + ?Sized> {
    store: &'a S,
    percentage_tolerance: Decimal,
}

impl<'a, S: RuleStore + MilestoneStore + ?Sized> ScheduleGenerator<'a, S> {
    pub fn new(store: &'a S, percentage_tolerance: Decimal) -> Self {
        Self {
            store,
            percentage_tolerance,
        }
    }

    /// resolve, build and persist the booking's schedule in one batch
    ///
    /// returns an empty list when no rule applies or the rule is flexible
    pub fn generate(
        &self,
        booking: &Booking,
        now: DateTime<Utc>,
    ) -> Result<Vec<PaymentScheduleMilestone>> {
        Ok(self.generate_detailed(booking, now)?.milestones)
    }

    /// `generate`, also reporting which rule was applied
    pub fn generate_detailed(
        &self,
        booking: &Booking,
        now: DateTime<Utc>,
    ) -> Result<GeneratedSchedule> {
        let resolver = RuleResolver::new(self.store);
        let Some(rule) = resolver.resolve(booking.room_id, booking.checkin_date)? else {
            debug!(booking_id = %booking.id, "no rule for room, payment is flexible");
            return Ok(GeneratedSchedule { rule: None, milestones: Vec::new() });
        };

        let milestones = build_milestones(&rule, booking, now, self.percentage_tolerance)?;
        if milestones.is_empty() {
            debug!(booking_id = %booking.id, rule_id = %rule.id, "flexible rule, no milestones");
            return Ok(GeneratedSchedule { rule: Some(rule), milestones });
        }

        if let Err(e) = self.store.insert_schedule(booking.id, &milestones) {
            error!(booking_id = %booking.id, error = %e, "failed to persist payment schedule");
            return Err(e);
        }

        info!(
            booking_id = %booking.id,
            rule_id = %rule.id,
            rule_type = %rule.rule_type(),
            milestones = milestones.len(),
            "payment schedule generated"
        );

        Ok(GeneratedSchedule { rule: Some(rule), milestones })
    }
}

/// build a booking's milestones from a rule without persisting them
///
/// all-or-nothing: any configuration error aborts before a single milestone
/// is returned
pub fn build_milestones(
    rule: &PaymentRule,
    booking: &Booking,
    now: DateTime<Utc>,
    percentage_tolerance: Decimal,
) -> Result<Vec<PaymentScheduleMilestone>> {
    rule.policy.validate(percentage_tolerance)?;

    let milestone = |sequence, name: &str, amount, due_date, due_type| {
        PaymentScheduleMilestone::pending(
            booking.id,
            sequence,
            name,
            amount,
            booking.currency.clone(),
            due_date,
            due_type,
            Some(rule.id),
            now,
        )
    };
    let (checkin, booked) = (booking.checkin_date, booking.booking_date);

    let milestones = match &rule.policy {
        PaymentPolicy::Flexible => Vec::new(),
        PaymentPolicy::Deposit(terms) => {
            let deposit_amount = amount_for(&terms.deposit, booking.total_amount)?;
            // remainder by construction, a negative balance is left visible
            let balance_amount = booking
                .total_amount
                .checked_sub(deposit_amount)
                .ok_or_else(|| out_of_range(booking))?;

            let deposit_date = due_date_for(&terms.deposit_due, checkin, booked)?;
            let balance_date = due_date_for(&terms.balance_due, checkin, booked)?;

            vec![
                milestone(1, DEPOSIT_NAME, deposit_amount, deposit_date, terms.deposit_due.due),
                milestone(2, BALANCE_NAME, balance_amount, balance_date, terms.balance_due.due),
            ]
        }
        PaymentPolicy::PaymentSchedule(configs) => {
            let mut ordered: Vec<_> = configs.iter().collect();
            ordered.sort_by_key(|c| c.sequence);

            ordered
                .into_iter()
                .map(|config| -> Result<PaymentScheduleMilestone> {
                    let amount = amount_for(&config.amount, booking.total_amount)?;
                    let due_date = due_date_for(&config.due, checkin, booked)?;
                    let name = config.name.as_str();
                    Ok(milestone(config.sequence, name, amount, due_date, config.due.due))
                })
                .collect::<Result<Vec<_>>>()?
        }
    };

    // totals are summed downstream, so they must be representable too
    milestones
        .iter()
        .try_fold(Money::ZERO, |acc, m| acc.checked_add(m.amount_due))
        .ok_or_else(|| out_of_range(booking))?;

    Ok(milestones)
}

fn out_of_range(booking: &Booking) -> ScheduleError {
    ScheduleError::configuration(format!(
        "milestone amounts for booking {} are out of range",
        booking.id
    ))
}
