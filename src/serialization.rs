/// serialization support for booking schedules
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::milestone::PaymentScheduleMilestone;
use crate::types::{BookingId, DueTiming, MilestoneId, MilestoneStatus};

/// serializable view of one milestone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneView {
    pub id: MilestoneId,
    pub sequence: u32,
    pub name: String,
    pub amount_due: Money,
    pub amount_paid: Money,
    pub outstanding: Money,
    pub currency: String,
    pub due_date: NaiveDate,
    pub due_type: DueTiming,
    pub status: MilestoneStatus,
    pub paid_at: Option<DateTime<Utc>>,
}

impl MilestoneView {
    pub fn from_milestone(milestone: &PaymentScheduleMilestone) -> Self {
        MilestoneView {
            id: milestone.id,
            sequence: milestone.milestone_sequence,
            name: milestone.milestone_name.clone(),
            amount_due: milestone.amount_due,
            amount_paid: milestone.amount_paid,
            outstanding: if milestone.status.is_open() {
                milestone.outstanding()
            } else {
                Money::ZERO
            },
            currency: milestone.currency.clone(),
            due_date: milestone.due_date,
            due_type: milestone.due_type,
            status: milestone.status,
            paid_at: milestone.paid_at,
        }
    }
}

/// booking schedule totals for invoicing and "amount due next" displays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub booking_id: BookingId,
    pub currency: Option<String>,
    pub total_due: Money,
    pub total_paid: Money,
    /// still owed on open milestones
    pub outstanding: Money,
    pub overdue_count: usize,
    /// first open milestone by sequence
    pub next_due: Option<MilestoneView>,
    pub fully_paid: bool,
}

/// serializable view of a booking's schedule, ascending by sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleView {
    pub summary: ScheduleSummary,
    pub milestones: Vec<MilestoneView>,
}

impl ScheduleSummary {
    pub fn from_schedule(booking_id: BookingId, schedule: &[PaymentScheduleMilestone]) -> Self {
        let mut ordered: Vec<&PaymentScheduleMilestone> = schedule.iter().collect();
        ordered.sort_by_key(|m| m.milestone_sequence);

        let open = || ordered.iter().filter(|m| m.status.is_open());

        ScheduleSummary {
            booking_id,
            currency: ordered.first().map(|m| m.currency.clone()),
            total_due: ordered.iter().map(|m| m.amount_due).sum(),
            total_paid: ordered.iter().map(|m| m.amount_paid).sum(),
            outstanding: open().map(|m| m.outstanding()).sum(),
            overdue_count: ordered
                .iter()
                .filter(|m| m.status == MilestoneStatus::Overdue)
                .count(),
            next_due: open().next().map(|m| MilestoneView::from_milestone(m)),
            fully_paid: !ordered.is_empty() && ordered.iter().all(|m| m.is_settled()),
        }
    }
}

impl ScheduleView {
    pub fn from_schedule(booking_id: BookingId, schedule: &[PaymentScheduleMilestone]) -> Self {
        let mut milestones: Vec<MilestoneView> =
            schedule.iter().map(MilestoneView::from_milestone).collect();
        milestones.sort_by_key(|m| m.sequence);

        ScheduleView {
            summary: ScheduleSummary::from_schedule(booking_id, schedule),
            milestones,
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
