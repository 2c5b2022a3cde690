use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{BookingId, DueTiming, MilestoneId, MilestoneStatus, RoomId, RuleId};

/// booking facts supplied by the booking workflow, never mutated here
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub room_id: RoomId,
    pub checkin_date: NaiveDate,
    pub booking_date: NaiveDate,
    pub total_amount: Money,
    pub currency: String,
}

impl Booking {
    pub fn new(
        room_id: RoomId,
        booking_date: NaiveDate,
        checkin_date: NaiveDate,
        total_amount: Money,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            checkin_date,
            booking_date,
            total_amount,
            currency: currency.into(),
        }
    }
}

/// one dated payment obligation of a booking
///
/// amounts and dates are copied from the rule at generation time and never
/// re-derived, so later rule edits leave existing schedules alone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentScheduleMilestone {
    pub id: MilestoneId,
    pub booking_id: BookingId,
    pub milestone_sequence: u32,
    pub milestone_name: String,
    pub amount_due: Money,
    pub currency: String,
    pub due_date: NaiveDate,
    pub due_type: DueTiming,
    pub created_from_rule_id: Option<RuleId>,

    // mutable payment tracking
    pub status: MilestoneStatus,
    pub amount_paid: Money,
    pub paid_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl PaymentScheduleMilestone {
    /// create a pending milestone
    #[allow(clippy::too_many_arguments)]
    pub fn pending(
        booking_id: BookingId,
        sequence: u32,
        name: impl Into<String>,
        amount_due: Money,
        currency: impl Into<String>,
        due_date: NaiveDate,
        due_type: DueTiming,
        created_from_rule_id: Option<RuleId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            milestone_sequence: sequence,
            milestone_name: name.into(),
            amount_due,
            currency: currency.into(),
            due_date,
            due_type,
            created_from_rule_id,
            status: MilestoneStatus::Pending,
            amount_paid: Money::ZERO,
            paid_at: None,
            created_at,
        }
    }

    /// amount still owed, never negative
    pub fn outstanding(&self) -> Money {
        (self.amount_due - self.amount_paid).max(Money::ZERO)
    }

    /// amount received beyond what was due
    pub fn overpayment(&self) -> Money {
        (self.amount_paid - self.amount_due).max(Money::ZERO)
    }

    pub fn is_settled(&self) -> bool {
        self.status == MilestoneStatus::Paid
    }

    /// due date passed while the milestone is still open
    pub fn is_past_due(&self, today: NaiveDate) -> bool {
        self.status.is_open() && self.due_date < today
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn milestone(amount_due: i64) -> PaymentScheduleMilestone {
        PaymentScheduleMilestone::pending(
            Uuid::new_v4(),
            1,
            "Deposit",
            Money::from_major(amount_due),
            "EUR",
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            DueTiming::AtBooking,
            None,
            Utc::now(),
        )
    }

    #[test]
    fn test_new_milestone_is_pending() {
        let m = milestone(500);
        assert_eq!(m.status, MilestoneStatus::Pending);
        assert_eq!(m.amount_paid, Money::ZERO);
        assert!(m.paid_at.is_none());
        assert_eq!(m.outstanding(), Money::from_major(500));
    }

    #[test]
    fn test_outstanding_and_overpayment() {
        let mut m = milestone(500);
        m.amount_paid = Money::from_major(200);
        assert_eq!(m.outstanding(), Money::from_major(300));
        assert_eq!(m.overpayment(), Money::ZERO);

        m.amount_paid = Money::from_major(650);
        assert_eq!(m.outstanding(), Money::ZERO);
        assert_eq!(m.overpayment(), Money::from_major(150));
    }

    #[test]
    fn test_past_due() {
        let mut m = milestone(500);
        let day_after = NaiveDate::from_ymd_opt(2025, 1, 11).unwrap();
        assert!(!m.is_past_due(m.due_date));
        assert!(m.is_past_due(day_after));

        m.status = MilestoneStatus::Paid;
        assert!(!m.is_past_due(day_after));
    }
}
