pub mod memory;

use chrono::{DateTime, NaiveDate, Utc};

use crate::decimal::Money;
use crate::errors::Result;
use crate::milestone::PaymentScheduleMilestone;
use crate::rules::RuleRecord;
use crate::types::{BookingId, MilestoneId, MilestoneStatus, RoomId};

pub use memory::MemoryStore;

/// read access to room payment rules
pub trait RuleStore {
    /// every active rule for the room whose validity window contains `date`
    fn active_rules(&self, room_id: RoomId, date: NaiveDate) -> Result<Vec<RuleRecord>>;
}

/// state a write expects to find, for compare-and-set updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MilestoneGuard {
    pub status: MilestoneStatus,
    pub amount_paid: Money,
}

impl MilestoneGuard {
    pub fn of(milestone: &PaymentScheduleMilestone) -> Self {
        Self {
            status: milestone.status,
            amount_paid: milestone.amount_paid,
        }
    }
}

/// payment fields written by the lifecycle manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MilestoneUpdate {
    pub status: MilestoneStatus,
    pub amount_paid: Money,
    pub paid_at: Option<DateTime<Utc>>,
}

/// booking-scoped milestone rows
///
/// every method must be atomic: bulk updates are single conditional updates
/// and `insert_schedule` is all-or-nothing under a uniqueness constraint on
/// the booking id
pub trait MilestoneStore {
    /// insert a booking's whole schedule, failing with `ScheduleAlreadyExists`
    /// if any milestone already exists for that booking
    fn insert_schedule(
        &self,
        booking_id: BookingId,
        milestones: &[PaymentScheduleMilestone],
    ) -> Result<()>;

    /// milestones of a booking, ascending by sequence
    fn schedule_for_booking(&self, booking_id: BookingId) -> Result<Vec<PaymentScheduleMilestone>>;

    fn milestone(&self, id: MilestoneId) -> Result<Option<PaymentScheduleMilestone>>;

    /// apply `update` only if the row still matches `expected`; returns whether it did
    fn compare_and_update(
        &self,
        id: MilestoneId,
        expected: MilestoneGuard,
        update: MilestoneUpdate,
    ) -> Result<bool>;

    /// `status = pending AND due_date < today` becomes overdue; returns the ids changed
    fn mark_overdue(&self, today: NaiveDate) -> Result<Vec<MilestoneId>>;

    /// open milestones of the booking become cancelled; returns the ids changed
    fn cancel_open(&self, booking_id: BookingId) -> Result<Vec<MilestoneId>>;
}
