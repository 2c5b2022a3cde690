pub mod record;
pub mod resolver;

use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Result, ScheduleError};
use crate::types::{AmountType, DueTiming, RoomId, RuleId, RuleType};

pub use record::{MilestoneRecord, RuleRecord};
pub use resolver::RuleResolver;

/// amount specification: percentage of the booking total or a fixed sum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountSpec {
    pub amount_type: AmountType,
    pub amount: Decimal,
}

impl AmountSpec {
    pub fn percentage(amount: Decimal) -> Self {
        Self { amount_type: AmountType::Percentage, amount }
    }

    pub fn fixed(amount: Decimal) -> Self {
        Self { amount_type: AmountType::Fixed, amount }
    }
}

/// timing strategy plus the parameters some strategies need
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueSpec {
    pub due: DueTiming,
    pub days: Option<u32>,
    pub specific_date: Option<NaiveDate>,
}

impl DueSpec {
    pub fn at_booking() -> Self {
        Self { due: DueTiming::AtBooking, days: None, specific_date: None }
    }

    pub fn on_checkin() -> Self {
        Self { due: DueTiming::OnCheckin, days: None, specific_date: None }
    }

    pub fn days_before_checkin(days: u32) -> Self {
        Self { due: DueTiming::DaysBeforeCheckin, days: Some(days), specific_date: None }
    }

    pub fn days_after_booking(days: u32) -> Self {
        Self { due: DueTiming::DaysAfterBooking, days: Some(days), specific_date: None }
    }

    pub fn on_date(date: NaiveDate) -> Self {
        Self { due: DueTiming::SpecificDate, days: None, specific_date: Some(date) }
    }
}

/// deposit plus remaining balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositTerms {
    pub deposit: AmountSpec,
    pub deposit_due: DueSpec,
    pub balance_due: DueSpec,
}

/// one configured installment of a payment schedule rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleMilestoneConfig {
    /// 1-based, unique within the rule
    pub sequence: u32,
    pub name: String,
    pub amount: AmountSpec,
    pub due: DueSpec,
}

/// payment policy, one payload shape per rule type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentPolicy {
    Flexible,
    Deposit(DepositTerms),
    /// installments, sorted ascending by sequence
    PaymentSchedule(Vec<ScheduleMilestoneConfig>),
}

impl PaymentPolicy {
    pub fn rule_type(&self) -> RuleType {
        match self {
            PaymentPolicy::Flexible => RuleType::Flexible,
            PaymentPolicy::Deposit(_) => RuleType::Deposit,
            PaymentPolicy::PaymentSchedule(_) => RuleType::PaymentSchedule,
        }
    }

    /// structural checks a rule must pass before milestones are built from it
    pub fn validate(&self, percentage_tolerance: Decimal) -> Result<()> {
        self.validate_sequences()?;
        self.validate_percentages(percentage_tolerance)
    }

    /// installment sequences are 1-based and unique within the rule
    pub fn validate_sequences(&self) -> Result<()> {
        let PaymentPolicy::PaymentSchedule(milestones) = self else {
            return Ok(());
        };

        let mut seen = HashSet::new();
        for m in milestones {
            if m.sequence == 0 {
                return Err(ScheduleError::configuration(format!(
                    "milestone '{}' has sequence 0, sequences are 1-based",
                    m.name
                )));
            }
            if !seen.insert(m.sequence) {
                return Err(ScheduleError::configuration(format!(
                    "duplicate milestone sequence {}",
                    m.sequence
                )));
            }
        }

        Ok(())
    }

    /// installment percentages must total 100 when every entry is a percentage
    pub fn validate_percentages(&self, tolerance: Decimal) -> Result<()> {
        let PaymentPolicy::PaymentSchedule(milestones) = self else {
            return Ok(());
        };

        let all_percentage = milestones
            .iter()
            .all(|m| m.amount.amount_type == AmountType::Percentage);
        if !all_percentage {
            return Ok(());
        }

        // an empty list sums to zero and fails here
        let sum = milestones
            .iter()
            .try_fold(Decimal::ZERO, |acc, m| acc.checked_add(m.amount.amount))
            .ok_or_else(|| ScheduleError::configuration("installment percentages overflow"))?;
        if (sum - dec!(100)).abs() > tolerance {
            return Err(ScheduleError::ScheduleConfiguration { sum });
        }

        Ok(())
    }
}

/// room-level payment rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRule {
    pub id: RuleId,
    pub room_id: RoomId,
    pub name: String,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub policy: PaymentPolicy,
}

impl PaymentRule {
    pub fn new(room_id: RoomId, name: impl Into<String>, policy: PaymentPolicy) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            name: name.into(),
            valid_from: None,
            valid_until: None,
            policy,
        }
    }

    /// pay-when-you-like rule, produces no milestones
    pub fn flexible(room_id: RoomId) -> Self {
        Self::new(room_id, "Flexible", PaymentPolicy::Flexible)
    }

    /// deposit rule, balance is always the remainder of the booking total
    pub fn deposit(
        room_id: RoomId,
        deposit: AmountSpec,
        deposit_due: DueSpec,
        balance_due: DueSpec,
    ) -> Self {
        Self::new(
            room_id,
            "Deposit and balance",
            PaymentPolicy::Deposit(DepositTerms { deposit, deposit_due, balance_due }),
        )
    }

    /// installment rule
    pub fn installments(room_id: RoomId, mut milestones: Vec<ScheduleMilestoneConfig>) -> Self {
        milestones.sort_by_key(|m| m.sequence);
        Self::new(room_id, "Payment schedule", PaymentPolicy::PaymentSchedule(milestones))
    }

    /// restrict the validity window
    pub fn valid_between(mut self, from: Option<NaiveDate>, until: Option<NaiveDate>) -> Self {
        self.valid_from = from;
        self.valid_until = until;
        self
    }

    pub fn rule_type(&self) -> RuleType {
        self.policy.rule_type()
    }

    /// validity window check, inclusive at both ends
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        self.valid_from.map_or(true, |from| date >= from)
            && self.valid_until.map_or(true, |until| date <= until)
    }
}
