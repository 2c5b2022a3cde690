use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::ScheduleError;

/// unique identifier for a room
pub type RoomId = Uuid;

/// unique identifier for a booking
pub type BookingId = Uuid;

/// unique identifier for a payment rule
pub type RuleId = Uuid;

/// unique identifier for a schedule milestone
pub type MilestoneId = Uuid;

/// payment policy kind as stored on a rule record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// no structured schedule, owner collects at their discretion
    Flexible,
    /// one deposit plus the remaining balance
    Deposit,
    /// multi-step installments
    PaymentSchedule,
}

/// how a configured amount is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountType {
    /// share of the booking total, expressed out of 100
    Percentage,
    /// absolute amount, independent of the booking total
    Fixed,
}

/// timing strategy for deriving a due date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DueTiming {
    AtBooking,
    OnCheckin,
    DaysBeforeCheckin,
    DaysAfterBooking,
    SpecificDate,
}

impl DueTiming {
    /// strategies that cannot produce a date without `days`
    pub fn requires_days(&self) -> bool {
        matches!(self, DueTiming::DaysBeforeCheckin | DueTiming::DaysAfterBooking)
    }
}

/// milestone payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    /// awaiting payment, not yet due
    Pending,
    /// due date passed with nothing received
    Overdue,
    /// some money received, less than due
    Partial,
    /// fully paid
    Paid,
    /// booking cancelled before payment completed
    Cancelled,
}

impl MilestoneStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MilestoneStatus::Paid | MilestoneStatus::Cancelled)
    }

    /// statuses a booking cancellation moves to cancelled
    pub fn is_open(&self) -> bool {
        !self.is_terminal()
    }
}

macro_rules! storage_names {
    ($ty:ty, $what:literal, { $($variant:path => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($variant => $name,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ScheduleError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($variant),)+
                    other => Err(ScheduleError::configuration(format!(
                        concat!("unknown ", $what, ": {}"),
                        other
                    ))),
                }
            }
        }
    };
}

storage_names!(RuleType, "rule type", {
    RuleType::Flexible => "flexible",
    RuleType::Deposit => "deposit",
    RuleType::PaymentSchedule => "payment_schedule",
});

storage_names!(AmountType, "amount type", {
    AmountType::Percentage => "percentage",
    AmountType::Fixed => "fixed",
});

storage_names!(DueTiming, "timing strategy", {
    DueTiming::AtBooking => "at_booking",
    DueTiming::OnCheckin => "on_checkin",
    DueTiming::DaysBeforeCheckin => "days_before_checkin",
    DueTiming::DaysAfterBooking => "days_after_booking",
    DueTiming::SpecificDate => "specific_date",
});

storage_names!(MilestoneStatus, "milestone status", {
    MilestoneStatus::Pending => "pending",
    MilestoneStatus::Overdue => "overdue",
    MilestoneStatus::Partial => "partial",
    MilestoneStatus::Paid => "paid",
    MilestoneStatus::Cancelled => "cancelled",
});
