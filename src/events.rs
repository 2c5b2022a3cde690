use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{BookingId, MilestoneId, MilestoneStatus, RuleId, RuleType};

/// all events that can be emitted by the schedule engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // generation events
    ScheduleGenerated {
        booking_id: BookingId,
        rule_id: Option<RuleId>,
        milestone_count: usize,
        total_due: Money,
        timestamp: DateTime<Utc>,
    },
    ScheduleSkipped {
        booking_id: BookingId,
        rule_type: Option<RuleType>,
        timestamp: DateTime<Utc>,
    },

    // payment events
    MilestonePaymentRecorded {
        booking_id: BookingId,
        milestone_id: MilestoneId,
        amount_paid: Money,
        amount_due: Money,
        timestamp: DateTime<Utc>,
    },
    MilestoneStatusChanged {
        booking_id: BookingId,
        milestone_id: MilestoneId,
        old_status: MilestoneStatus,
        new_status: MilestoneStatus,
        timestamp: DateTime<Utc>,
    },
    OverpaymentReported {
        booking_id: BookingId,
        milestone_id: MilestoneId,
        excess: Money,
        timestamp: DateTime<Utc>,
    },
    LatePaymentIgnored {
        booking_id: BookingId,
        milestone_id: MilestoneId,
        status: MilestoneStatus,
        provided: Money,
        timestamp: DateTime<Utc>,
    },

    // batch events
    MilestonesMarkedOverdue {
        milestone_ids: Vec<MilestoneId>,
        as_of: NaiveDate,
    },
    ScheduleCancelled {
        booking_id: BookingId,
        milestone_ids: Vec<MilestoneId>,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
